pub mod console;
pub mod sink;

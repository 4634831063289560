pub mod bootstrap;
pub mod instance;

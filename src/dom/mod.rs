pub mod selector;
pub mod snapshot;
pub mod text;
pub mod tree;

pub mod cli;
pub mod discovery;
pub mod dom;
pub mod error;
pub mod identity;
pub mod navigate;
pub mod render;
pub mod shell;
pub mod startup;
pub mod sync;
pub mod trace;

pub use startup::bootstrap::{start, StartupOutcome};

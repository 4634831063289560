pub mod panel;
pub mod shortcut;

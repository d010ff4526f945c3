//! Widgets and view state for the app shell.

pub mod forms;
pub mod list;

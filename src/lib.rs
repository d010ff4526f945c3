#![forbid(unsafe_code)]

pub mod app;
pub mod model;
pub mod reorder;
pub mod storage;
pub mod store;
pub mod ui;

pub use app::QuickdoApp;
pub use reorder::{ListDrag, ReorderCommit};
pub use storage::{Database, StorageError, StorageHandle};
pub use store::TodoStore;

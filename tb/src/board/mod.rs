//! Read-modify-write operations over stored collections

mod collection;
mod grades;
mod lists;
mod tasks;

pub use collection::Collection;
pub use grades::Gradebook;
pub use lists::ListBoard;
pub use tasks::{TaskBin, TaskBoard};

//! SQLite-backed persistence for principals and tasks.

pub mod principals;
pub mod tasks;

pub use principals::PrincipalStore;
pub use tasks::{SchemaCapabilities, TaskStore};

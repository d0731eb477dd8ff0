pub mod insert;
pub mod migrations;
pub mod queries;
pub mod setup;

pub use setup::{init_db, init_memory_db};

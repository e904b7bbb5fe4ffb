//! Repository layer for database operations.

pub mod file_record;

pub use file_record::{FileRecordRepository, NewFileRecord};

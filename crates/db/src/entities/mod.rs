//! Database entities.

pub mod file_record;

pub use file_record::{Entity as FileRecord, FileState, StorageDriver};

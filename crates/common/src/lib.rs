//! Common utilities and shared types for filemeta.
//!
//! This crate provides foundational components used across all filemeta crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: Snowflake record IDs and UUID file identifiers via [`IdGenerator`]
//! - **Hashing**: SHA-256 dedup keys via [`DedupKey`]
//!
//! # Example
//!
//! ```no_run
//! use filemeta_common::{AppResult, Config, DedupKey, IdGenerator};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new(config.node.worker_id)?;
//!     let key = DedupKey::from_bytes(b"hello");
//!     println!("{} -> {}:{}", id_gen.generate(), key.hash, key.size);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod hash;
pub mod id;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use hash::{DedupKey, file_extension, is_sha256_hex};
pub use id::IdGenerator;

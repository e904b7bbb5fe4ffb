//! Core business logic for filemeta.

pub mod services;

pub use services::*;

//! Business logic services.

pub mod upload;

pub use upload::{BeginUploadInput, UploadService, UploadTicket};

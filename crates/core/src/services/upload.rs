//! Upload service: the metadata side of an upload session.
//!
//! Byte transfer and storage drivers live outside this crate. This service
//! only decides whether an upload is needed at all (dedup), registers the
//! record, and drives it through its lifecycle.

use std::time::Duration;

use chrono::{TimeDelta, Utc};
use filemeta_common::{AppError, AppResult, DedupKey, IdGenerator, file_extension};
use filemeta_db::{
    entities::{StorageDriver, file_record},
    repositories::{FileRecordRepository, NewFileRecord},
};

/// Input for starting an upload.
#[derive(Debug, Clone)]
pub struct BeginUploadInput {
    /// File name as supplied by the client.
    pub original_name: String,
    /// Client-computed SHA-256 of the whole file.
    pub file_hash: String,
    /// File size in bytes.
    pub file_size: i64,
    /// Extension override; derived from `original_name` when absent.
    pub file_extension: Option<String>,
    /// Backend the body will be written to.
    pub storage_driver: StorageDriver,
    /// Directory the driver stages partial uploads in.
    pub staging_dir: String,
    /// Uploading user, if any.
    pub user_id: Option<i64>,
    /// Conversation the file is attached to, if any.
    pub conversation_id: Option<i64>,
}

/// Outcome of [`UploadService::begin_upload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadTicket {
    /// Identical content is already stored; nothing needs uploading.
    Instant(file_record::Model),
    /// A new initializing record was registered.
    Started(file_record::Model),
}

impl UploadTicket {
    /// The record the caller should refer to.
    #[must_use]
    pub const fn record(&self) -> &file_record::Model {
        match self {
            Self::Instant(record) | Self::Started(record) => record,
        }
    }

    /// Whether the upload was satisfied by existing content.
    #[must_use]
    pub const fn is_instant(&self) -> bool {
        matches!(self, Self::Instant(_))
    }
}

/// Upload service for file record lifecycle management.
#[derive(Clone)]
pub struct UploadService {
    file_repo: FileRecordRepository,
    id_gen: IdGenerator,
}

impl UploadService {
    /// Create a new upload service.
    #[must_use]
    pub const fn new(file_repo: FileRecordRepository, id_gen: IdGenerator) -> Self {
        Self { file_repo, id_gen }
    }

    /// Look up fully stored content with the given dedup key.
    pub async fn find_duplicate(&self, key: &DedupKey) -> AppResult<Option<file_record::Model>> {
        self.file_repo
            .find_complete_by_hash(&key.hash, key.size)
            .await
    }

    /// Start an upload, or short-circuit if the content already exists.
    pub async fn begin_upload(&self, input: BeginUploadInput) -> AppResult<UploadTicket> {
        let key = DedupKey::new(&input.file_hash, input.file_size)?;

        if let Some(existing) = self.find_duplicate(&key).await? {
            tracing::info!(
                id = existing.id,
                hash = %key.hash,
                size = key.size,
                "Instant upload, content already stored"
            );
            return Ok(UploadTicket::Instant(existing));
        }

        let file_uuid = self.id_gen.generate_file_uuid();
        let storage_path = format!("{}/{file_uuid}", input.staging_dir.trim_end_matches('/'));
        let storage_name = format!("{file_uuid}_{}", input.original_name);
        let extension = input
            .file_extension
            .or_else(|| file_extension(&input.original_name));

        let record = self
            .file_repo
            .create(NewFileRecord {
                file_uuid,
                storage_driver: input.storage_driver,
                storage_path,
                original_name: input.original_name,
                storage_name,
                file_hash: key.hash,
                file_size: key.size,
                file_extension: extension,
                user_id: input.user_id,
                conversation_id: input.conversation_id,
            })
            .await?;

        Ok(UploadTicket::Started(record))
    }

    /// Finish an upload once the body is fully stored.
    ///
    /// `final_path` replaces the staging path when the driver moved the body.
    pub async fn finish_upload(
        &self,
        file_uuid: &str,
        final_path: Option<&str>,
    ) -> AppResult<file_record::Model> {
        let record = self.get_live_by_uuid(file_uuid).await?;

        match final_path {
            Some(path) => self.file_repo.complete_at_path(record.id, path).await?,
            None => self.file_repo.mark_complete(record.id).await?,
        }

        self.file_repo.get_by_id(record.id).await
    }

    /// Cancel an upload by soft-deleting its record.
    pub async fn cancel_upload(&self, file_uuid: &str) -> AppResult<()> {
        let record = self.get_live_by_uuid(file_uuid).await?;
        self.file_repo.soft_delete(record.id).await?;

        tracing::info!(id = record.id, file_uuid, "Upload cancelled");
        Ok(())
    }

    /// Soft-delete uploads that have been initializing for longer than `max_age`.
    ///
    /// Returns the number of records swept. Records that complete or get
    /// deleted while the sweep runs are left alone.
    pub async fn sweep_stale_uploads(&self, max_age: Duration, batch: u64) -> AppResult<usize> {
        let max_age = TimeDelta::from_std(max_age)
            .map_err(|e| AppError::Validation(format!("max_age out of range: {e}")))?;
        let cutoff = Utc::now()
            .checked_sub_signed(max_age)
            .ok_or_else(|| {
                AppError::Validation(format!("max_age of {max_age} is out of range"))
            })?;

        let stale = self
            .file_repo
            .find_stale_initializing(cutoff, batch)
            .await?;

        let mut swept = 0;
        for record in stale {
            if self.file_repo.soft_delete_initializing(record.id).await? {
                swept += 1;
            } else {
                tracing::debug!(id = record.id, "Stale upload changed during sweep, skipped");
            }
        }

        if swept > 0 {
            tracing::info!(swept, %cutoff, "Swept stale uploads");
        }
        Ok(swept)
    }

    async fn get_live_by_uuid(&self, file_uuid: &str) -> AppResult<file_record::Model> {
        self.file_repo
            .find_by_uuid(file_uuid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Upload: {file_uuid}")))
    }
}

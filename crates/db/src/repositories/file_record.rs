//! File record repository.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use filemeta_common::{AppError, AppResult, IdGenerator, is_sha256_hex};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, sea_query::Expr,
};
use validator::{Validate, ValidationError};

use crate::entities::{FileRecord, FileState, StorageDriver, file_record};

/// Input for registering a new file record.
#[derive(Debug, Clone, Validate)]
pub struct NewFileRecord {
    /// Public file identifier (UUID with hyphens).
    #[validate(length(equal = 36))]
    pub file_uuid: String,
    /// Backend that will hold the body.
    pub storage_driver: StorageDriver,
    /// Location of the body within the backend.
    #[validate(length(min = 1, max = 255))]
    pub storage_path: String,
    /// File name as uploaded.
    #[validate(length(min = 1, max = 255))]
    pub original_name: String,
    /// File name within the backend.
    #[validate(length(min = 1, max = 255))]
    pub storage_name: String,
    /// SHA-256 of the content, hex (any case).
    #[validate(custom(function = "validate_file_hash"))]
    pub file_hash: String,
    /// Size in bytes.
    #[validate(range(min = 0))]
    pub file_size: i64,
    /// Extension without the dot.
    #[validate(length(max = 20))]
    pub file_extension: Option<String>,
    /// Owner user ID.
    pub user_id: Option<i64>,
    /// Conversation the file is attached to.
    pub conversation_id: Option<i64>,
}

fn validate_file_hash(value: &str) -> Result<(), ValidationError> {
    if is_sha256_hex(value) {
        Ok(())
    } else {
        Err(ValidationError::new("sha256_hex"))
    }
}

/// Map a database error, turning unique violations into `DuplicateKey`.
fn map_db_err(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => AppError::DuplicateKey(detail),
        _ => AppError::Database(err.to_string()),
    }
}

/// File record repository for database operations.
///
/// Records with a `deleted_at` are invisible to every query here except the
/// `*_with_deleted` lookups.
#[derive(Clone)]
pub struct FileRecordRepository {
    db: Arc<DatabaseConnection>,
    id_gen: IdGenerator,
}

impl FileRecordRepository {
    /// Create a new file record repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>, id_gen: IdGenerator) -> Self {
        Self { db, id_gen }
    }

    /// Find a live record by ID.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<file_record::Model>> {
        FileRecord::find()
            .filter(file_record::Column::Id.eq(id))
            .filter(file_record::Column::DeletedAt.is_null())
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a record by ID, including soft-deleted ones.
    pub async fn find_by_id_with_deleted(&self, id: i64) -> AppResult<Option<file_record::Model>> {
        FileRecord::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a live record by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: i64) -> AppResult<file_record::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("FileRecord: {id}")))
    }

    /// Find a live record by its file UUID.
    pub async fn find_by_uuid(&self, file_uuid: &str) -> AppResult<Option<file_record::Model>> {
        FileRecord::find()
            .filter(file_record::Column::FileUuid.eq(file_uuid))
            .filter(file_record::Column::DeletedAt.is_null())
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a record by its file UUID, including soft-deleted ones.
    pub async fn find_by_uuid_with_deleted(
        &self,
        file_uuid: &str,
    ) -> AppResult<Option<file_record::Model>> {
        FileRecord::find()
            .filter(file_record::Column::FileUuid.eq(file_uuid))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a live record with the given content (dedup check).
    ///
    /// Complete records are preferred over initializing ones, then the oldest.
    pub async fn find_by_hash(
        &self,
        file_hash: &str,
        file_size: i64,
    ) -> AppResult<Option<file_record::Model>> {
        FileRecord::find()
            .filter(file_record::Column::FileHash.eq(file_hash.to_ascii_lowercase()))
            .filter(file_record::Column::FileSize.eq(file_size))
            .filter(file_record::Column::DeletedAt.is_null())
            .order_by_desc(file_record::Column::State)
            .order_by_asc(file_record::Column::CreatedAt)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a live, fully stored record with the given content.
    pub async fn find_complete_by_hash(
        &self,
        file_hash: &str,
        file_size: i64,
    ) -> AppResult<Option<file_record::Model>> {
        FileRecord::find()
            .filter(file_record::Column::FileHash.eq(file_hash.to_ascii_lowercase()))
            .filter(file_record::Column::FileSize.eq(file_size))
            .filter(file_record::Column::State.eq(FileState::Complete))
            .filter(file_record::Column::DeletedAt.is_null())
            .order_by_asc(file_record::Column::CreatedAt)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a new record in the initializing state.
    ///
    /// Fails with `DuplicateKey` if the file UUID is taken, even by a
    /// soft-deleted record.
    pub async fn create(&self, new: NewFileRecord) -> AppResult<file_record::Model> {
        new.validate()?;

        if self
            .find_by_uuid_with_deleted(&new.file_uuid)
            .await?
            .is_some()
        {
            return Err(AppError::DuplicateKey(format!(
                "FileRecord file_uuid: {}",
                new.file_uuid
            )));
        }

        let model = file_record::ActiveModel {
            id: Set(self.id_gen.generate()),
            file_uuid: Set(new.file_uuid),
            storage_driver: Set(new.storage_driver),
            storage_path: Set(new.storage_path),
            original_name: Set(new.original_name),
            storage_name: Set(new.storage_name),
            file_hash: Set(new.file_hash.to_ascii_lowercase()),
            file_size: Set(new.file_size),
            file_extension: Set(new.file_extension),
            user_id: Set(new.user_id),
            conversation_id: Set(new.conversation_id),
            state: Set(FileState::Initializing),
            created_at: Set(Utc::now().into()),
            deleted_at: Set(None),
        };

        let record = model.insert(self.db.as_ref()).await.map_err(map_db_err)?;

        tracing::info!(
            id = record.id,
            file_uuid = %record.file_uuid,
            size = record.file_size,
            hash = %record.file_hash,
            "File record created"
        );

        Ok(record)
    }

    /// Move a record from initializing to complete.
    ///
    /// Fails with `NotFound` if the record is absent or soft-deleted and with
    /// `InvalidTransition` if it is already complete.
    pub async fn mark_complete(&self, id: i64) -> AppResult<()> {
        let result = FileRecord::update_many()
            .col_expr(
                file_record::Column::State,
                Expr::value(FileState::Complete.to_value()),
            )
            .filter(file_record::Column::Id.eq(id))
            .filter(file_record::Column::State.eq(FileState::Initializing))
            .filter(file_record::Column::DeletedAt.is_null())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(self.explain_rejected_completion(id).await);
        }

        tracing::info!(id, "File record marked complete");
        Ok(())
    }

    /// Move a record to complete and point it at its final storage location
    /// in one update.
    ///
    /// Errors as [`Self::mark_complete`] does; the path is only changed if
    /// the transition happens.
    pub async fn complete_at_path(&self, id: i64, storage_path: &str) -> AppResult<()> {
        let len = storage_path.chars().count();
        if len == 0 || len > 255 {
            return Err(AppError::Validation(format!(
                "storage_path must be 1..=255 characters, got {len}"
            )));
        }

        let result = FileRecord::update_many()
            .col_expr(
                file_record::Column::State,
                Expr::value(FileState::Complete.to_value()),
            )
            .col_expr(file_record::Column::StoragePath, Expr::value(storage_path))
            .filter(file_record::Column::Id.eq(id))
            .filter(file_record::Column::State.eq(FileState::Initializing))
            .filter(file_record::Column::DeletedAt.is_null())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(self.explain_rejected_completion(id).await);
        }

        tracing::info!(id, storage_path, "File record marked complete");
        Ok(())
    }

    /// Soft-delete a record.
    ///
    /// Fails with `NotFound` if the record is absent or already deleted.
    pub async fn soft_delete(&self, id: i64) -> AppResult<()> {
        let result = FileRecord::update_many()
            .col_expr(
                file_record::Column::DeletedAt,
                Expr::value(DateTime::<chrono::FixedOffset>::from(Utc::now())),
            )
            .filter(file_record::Column::Id.eq(id))
            .filter(file_record::Column::DeletedAt.is_null())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("FileRecord: {id}")));
        }

        tracing::info!(id, "File record soft-deleted");
        Ok(())
    }

    /// Soft-delete a record only while it is still initializing.
    ///
    /// Returns `false` when the record completed or disappeared in the meantime.
    pub async fn soft_delete_initializing(&self, id: i64) -> AppResult<bool> {
        let result = FileRecord::update_many()
            .col_expr(
                file_record::Column::DeletedAt,
                Expr::value(DateTime::<chrono::FixedOffset>::from(Utc::now())),
            )
            .filter(file_record::Column::Id.eq(id))
            .filter(file_record::Column::State.eq(FileState::Initializing))
            .filter(file_record::Column::DeletedAt.is_null())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Get live files for a user (paginated, newest first).
    pub async fn list_by_user(
        &self,
        user_id: i64,
        limit: u64,
        until_id: Option<i64>,
    ) -> AppResult<Vec<file_record::Model>> {
        let mut query = FileRecord::find()
            .filter(file_record::Column::UserId.eq(user_id))
            .filter(file_record::Column::DeletedAt.is_null())
            .order_by_desc(file_record::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(file_record::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get live files attached to a conversation (paginated, newest first).
    pub async fn list_by_conversation(
        &self,
        conversation_id: i64,
        limit: u64,
        until_id: Option<i64>,
    ) -> AppResult<Vec<file_record::Model>> {
        let mut query = FileRecord::find()
            .filter(file_record::Column::ConversationId.eq(conversation_id))
            .filter(file_record::Column::DeletedAt.is_null())
            .order_by_desc(file_record::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(file_record::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count live files owned by a user.
    pub async fn count_by_user(&self, user_id: i64) -> AppResult<u64> {
        FileRecord::find()
            .filter(file_record::Column::UserId.eq(user_id))
            .filter(file_record::Column::DeletedAt.is_null())
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find live uploads still initializing that were created before `before`.
    pub async fn find_stale_initializing(
        &self,
        before: DateTime<Utc>,
        limit: u64,
    ) -> AppResult<Vec<file_record::Model>> {
        FileRecord::find()
            .filter(file_record::Column::State.eq(FileState::Initializing))
            .filter(file_record::Column::CreatedAt.lt(before))
            .filter(file_record::Column::DeletedAt.is_null())
            .order_by_asc(file_record::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Work out why a guarded completion touched no rows.
    async fn explain_rejected_completion(&self, id: i64) -> AppError {
        match self.find_by_id(id).await {
            Ok(None) => AppError::NotFound(format!("FileRecord: {id}")),
            Ok(Some(record)) if !record.state.can_transition_to(FileState::Complete) => {
                AppError::InvalidTransition(format!(
                    "cannot complete FileRecord {id} in state {:?}",
                    record.state
                ))
            }
            // Still initializing: the row changed between the update and the re-read.
            Ok(Some(_)) => AppError::Database(format!(
                "FileRecord {id} changed concurrently, completion not applied"
            )),
            Err(e) => e,
        }
    }
}

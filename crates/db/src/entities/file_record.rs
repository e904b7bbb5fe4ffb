//! File record entity (metadata of an uploaded file).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Backend that holds the file body.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum StorageDriver {
    /// Local filesystem.
    #[default]
    #[sea_orm(string_value = "local")]
    Local,
    /// S3-compatible object storage.
    #[sea_orm(string_value = "s3")]
    S3,
}

/// Upload lifecycle state of a file record.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
#[serde(rename_all = "lowercase")]
pub enum FileState {
    /// Upload started, body not fully stored yet.
    #[default]
    #[sea_orm(num_value = 0)]
    Initializing,
    /// Body fully stored.
    #[sea_orm(num_value = 1)]
    Complete,
}

impl FileState {
    /// Check whether a record may move from `self` to `next`.
    ///
    /// The only legal transition is initializing to complete.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!((self, next), (Self::Initializing, Self::Complete))
    }
}

/// A file metadata record.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "files")]
pub struct Model {
    /// Snowflake ID.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,

    /// Public file identifier (UUID, 36 chars)
    #[sea_orm(unique)]
    pub file_uuid: String,

    /// Storage backend
    pub storage_driver: StorageDriver,

    /// Location of the body within the storage backend
    pub storage_path: String,

    /// File name as uploaded
    pub original_name: String,

    /// File name within the storage backend
    pub storage_name: String,

    /// SHA-256 of the content, lowercase hex
    #[sea_orm(indexed)]
    pub file_hash: String,

    /// File size in bytes
    pub file_size: i64,

    /// File extension without the dot (e.g. "pdf")
    #[sea_orm(nullable)]
    pub file_extension: Option<String>,

    /// Owner user ID
    #[sea_orm(nullable)]
    pub user_id: Option<i64>,

    /// Conversation the file was attached to
    #[sea_orm(nullable)]
    pub conversation_id: Option<i64>,

    pub state: FileState,

    pub created_at: DateTimeWithTimeZone,

    /// Soft-delete marker
    #[sea_orm(nullable)]
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

//! Create `files` table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Files::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Files::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Files::FileUuid).string_len(36).not_null())
                    .col(
                        ColumnDef::new(Files::StorageDriver)
                            .string_len(20)
                            .not_null()
                            .default("local"),
                    )
                    .col(
                        ColumnDef::new(Files::StoragePath)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Files::OriginalName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Files::StorageName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Files::FileHash).string_len(64).not_null())
                    .col(ColumnDef::new(Files::FileSize).big_integer().not_null())
                    .col(ColumnDef::new(Files::FileExtension).string_len(20))
                    .col(ColumnDef::new(Files::UserId).big_integer())
                    .col(ColumnDef::new(Files::ConversationId).big_integer())
                    .col(
                        ColumnDef::new(Files::State)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Files::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Files::DeletedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Unique: file_uuid (also covers soft-deleted rows)
        manager
            .create_index(
                Index::create()
                    .name("idx_files_file_uuid")
                    .table(Files::Table)
                    .col(Files::FileUuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (file_hash, file_size) for dedup checks
        manager
            .create_index(
                Index::create()
                    .name("idx_files_dedup")
                    .table(Files::Table)
                    .col(Files::FileHash)
                    .col(Files::FileSize)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_files_user_id")
                    .table(Files::Table)
                    .col(Files::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_files_conversation_id")
                    .table(Files::Table)
                    .col(Files::ConversationId)
                    .to_owned(),
            )
            .await?;

        // Index: (state, created_at) for the stale upload sweep
        manager
            .create_index(
                Index::create()
                    .name("idx_files_state_created_at")
                    .table(Files::Table)
                    .col(Files::State)
                    .col(Files::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Files::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Files {
    Table,
    Id,
    FileUuid,
    StorageDriver,
    StoragePath,
    OriginalName,
    StorageName,
    FileHash,
    FileSize,
    FileExtension,
    UserId,
    ConversationId,
    State,
    CreatedAt,
    DeletedAt,
}

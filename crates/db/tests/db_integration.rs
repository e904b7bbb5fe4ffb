//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `filemeta_test`)
//!   `TEST_DB_PASSWORD` (default: `filemeta_test`)
//!   `TEST_DB_NAME` (default: `filemeta_test`)

#![allow(clippy::unwrap_used)]

use filemeta_common::{AppError, DedupKey, IdGenerator};
use filemeta_db::entities::{FileState, StorageDriver};
use filemeta_db::repositories::{FileRecordRepository, NewFileRecord};
use filemeta_db::test_utils::{TestDatabase, TestDbConfig};

async fn setup() -> (TestDatabase, FileRecordRepository) {
    let db = TestDatabase::create_unique()
        .await
        .expect("Failed to create test database");
    let repo = FileRecordRepository::new(db.connection(), IdGenerator::default());
    (db, repo)
}

fn new_record(file_uuid: &str, content: &[u8]) -> NewFileRecord {
    let key = DedupKey::from_bytes(content);
    NewFileRecord {
        file_uuid: file_uuid.to_string(),
        storage_driver: StorageDriver::Local,
        storage_path: format!("/data/temp/{file_uuid}"),
        original_name: "notes.md".to_string(),
        storage_name: format!("{file_uuid}_notes.md"),
        file_hash: key.hash,
        file_size: key.size,
        file_extension: Some("md".to_string()),
        user_id: Some(1),
        conversation_id: Some(10),
    }
}

fn uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_create_then_find_by_id() {
    let (db, repo) = setup().await;
    let file_uuid = uuid();

    let created = repo.create(new_record(&file_uuid, b"abc")).await.unwrap();
    let found = repo.find_by_id(created.id).await.unwrap().unwrap();

    assert_eq!(found.file_uuid, file_uuid);
    assert_eq!(found.state, FileState::Initializing);
    assert_eq!(found.storage_driver, StorageDriver::Local);
    assert_eq!(found.file_size, 3);
    assert_eq!(found.conversation_id, Some(10));
    assert!(found.deleted_at.is_none());

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_duplicate_uuid_rejected() {
    let (db, repo) = setup().await;
    let file_uuid = uuid();

    repo.create(new_record(&file_uuid, b"one")).await.unwrap();
    let second = repo.create(new_record(&file_uuid, b"two")).await;

    assert!(matches!(second, Err(AppError::DuplicateKey(_))));

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_mark_complete_exactly_once() {
    let (db, repo) = setup().await;
    let created = repo.create(new_record(&uuid(), b"abc")).await.unwrap();

    repo.mark_complete(created.id).await.unwrap();
    let found = repo.get_by_id(created.id).await.unwrap();
    assert_eq!(found.state, FileState::Complete);

    let again = repo.mark_complete(created.id).await;
    assert!(matches!(again, Err(AppError::InvalidTransition(_))));

    let missing = repo.mark_complete(created.id + 1).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_soft_delete_hides_but_retains_row() {
    let (db, repo) = setup().await;
    let created = repo.create(new_record(&uuid(), b"abc")).await.unwrap();

    repo.soft_delete(created.id).await.unwrap();

    assert!(repo.find_by_id(created.id).await.unwrap().is_none());
    let retained = repo
        .find_by_id_with_deleted(created.id)
        .await
        .unwrap()
        .unwrap();
    assert!(retained.deleted_at.is_some());

    let again = repo.soft_delete(created.id).await;
    assert!(matches!(again, Err(AppError::NotFound(_))));

    let complete = repo.mark_complete(created.id).await;
    assert!(matches!(complete, Err(AppError::NotFound(_))));

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_find_by_hash_dedup() {
    let (db, repo) = setup().await;
    let created = repo.create(new_record(&uuid(), b"same")).await.unwrap();
    let key = DedupKey::from_bytes(b"same");

    let found = repo.find_by_hash(&key.hash, key.size).await.unwrap().unwrap();
    assert_eq!(found.id, created.id);

    // Same hash with a different size is different content
    assert!(repo.find_by_hash(&key.hash, key.size + 1).await.unwrap().is_none());

    // Not complete yet
    assert!(repo
        .find_complete_by_hash(&key.hash, key.size)
        .await
        .unwrap()
        .is_none());

    repo.mark_complete(created.id).await.unwrap();
    let complete = repo
        .find_complete_by_hash(&key.hash.to_uppercase(), key.size)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(complete.id, created.id);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_list_by_user_pagination() {
    let (db, repo) = setup().await;
    let mut ids = Vec::new();
    for i in 0..3u8 {
        let created = repo.create(new_record(&uuid(), &[i])).await.unwrap();
        ids.push(created.id);
    }

    let first_page = repo.list_by_user(1, 2, None).await.unwrap();
    assert_eq!(first_page.len(), 2);
    assert_eq!(first_page[0].id, ids[2]);

    let second_page = repo
        .list_by_user(1, 2, Some(first_page[1].id))
        .await
        .unwrap();
    assert_eq!(second_page.len(), 1);
    assert_eq!(second_page[0].id, ids[0]);

    assert_eq!(repo.count_by_user(1).await.unwrap(), 3);

    db.drop_database().await.unwrap();
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.username.is_empty());
    assert!(!config.database.is_empty());
}

#[test]
fn test_postgres_url_format() {
    let config = TestDbConfig::default();
    let url = config.postgres_url();
    assert!(url.starts_with("postgres://"));
    assert!(url.ends_with("/postgres"));
}

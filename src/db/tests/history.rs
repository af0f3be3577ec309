use crate::db::*;
use crate::types::MediaMetadata;
use tempfile::NamedTempFile;

fn entry(content_id: &str, title: &str, downloaded_at: i64) -> NewHistoryEntry {
    NewHistoryEntry {
        content_id: content_id.to_string(),
        title: title.to_string(),
        url: format!("https://www.youtube.com/watch?v={content_id}"),
        uploader: Some("Uploader".to_string()),
        duration_secs: Some(212.5),
        format: Some("137+140".to_string()),
        resolution: Some("1920x1080".to_string()),
        file_path: Some(format!("/downloads/{title} [{content_id}].mp4")),
        file_size: Some(50 * 1024 * 1024),
        downloaded_at,
        status: STATUS_COMPLETED.to_string(),
    }
}

#[tokio::test]
async fn test_upsert_and_get_history_entry() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let now = chrono::Utc::now().timestamp();
    db.upsert_history(&entry("abc123", "First Talk", now))
        .await
        .unwrap();

    let retrieved = db.get_history_entry("abc123").await.unwrap().unwrap();
    assert_eq!(retrieved.content_id, "abc123");
    assert_eq!(retrieved.title, "First Talk");
    assert_eq!(retrieved.uploader.as_deref(), Some("Uploader"));
    assert_eq!(retrieved.duration_secs, Some(212.5));
    assert_eq!(retrieved.resolution.as_deref(), Some("1920x1080"));
    assert_eq!(retrieved.file_size, Some(50 * 1024 * 1024));
    assert_eq!(retrieved.downloaded_at.timestamp(), now);
    assert_eq!(retrieved.status, STATUS_COMPLETED);

    assert!(db.get_history_entry("missing").await.unwrap().is_none());

    db.close().await;
}

#[tokio::test]
async fn test_rerecording_same_content_updates_in_place() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    db.upsert_history(&entry("abc123", "Old Title", 1_000))
        .await
        .unwrap();
    db.upsert_history(&entry("other", "Other", 1_500))
        .await
        .unwrap();
    assert_eq!(db.count_history().await.unwrap(), 2);

    let mut replacement = entry("abc123", "New Title", 2_000);
    replacement.file_size = None;
    db.record(&replacement).await.unwrap();

    assert_eq!(db.count_history().await.unwrap(), 2);
    let updated = db.get_history_entry("abc123").await.unwrap().unwrap();
    assert_eq!(updated.title, "New Title");
    assert_eq!(updated.file_size, None);
    assert_eq!(updated.downloaded_at.timestamp(), 2_000);

    db.close().await;
}

#[tokio::test]
async fn test_query_history_pagination_most_recent_first() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    for i in 0..5 {
        db.upsert_history(&entry(&format!("id{i}"), &format!("Video {i}"), 1_000 + i))
            .await
            .unwrap();
    }

    let first_page = db.query_history(2, 0).await.unwrap();
    assert_eq!(
        first_page.iter().map(|e| e.content_id.as_str()).collect::<Vec<_>>(),
        vec!["id4", "id3"]
    );

    let last_page = db.query_history(2, 4).await.unwrap();
    assert_eq!(last_page.len(), 1);
    assert_eq!(last_page[0].content_id, "id0");

    assert!(db.query_history(10, 5).await.unwrap().is_empty());

    db.close().await;
}

#[tokio::test]
async fn test_delete_and_clear_history() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    for id in ["a", "b", "c"] {
        db.upsert_history(&entry(id, id, 1)).await.unwrap();
    }

    assert!(db.delete_history_entry("b").await.unwrap());
    assert!(!db.delete_history_entry("b").await.unwrap());
    assert_eq!(db.count_history().await.unwrap(), 2);

    assert_eq!(db.clear_history().await.unwrap(), 2);
    assert_eq!(db.count_history().await.unwrap(), 0);

    db.close().await;
}

#[test]
fn test_entry_from_metadata_falls_back_to_item_fields() {
    let metadata = MediaMetadata {
        filesize_approx: Some(1234),
        ..Default::default()
    };
    let url = "https://example.com/watch?v=zzz";
    let entry = NewHistoryEntry::from_metadata(&metadata, "Queued Title", url, 42);

    assert_eq!(entry.content_id, crate::utils::content_id_for_url(url));
    assert_eq!(entry.title, "Queued Title");
    assert_eq!(entry.url, url);
    assert_eq!(entry.file_size, Some(1234));
    assert_eq!(entry.downloaded_at, 42);
    assert_eq!(entry.status, STATUS_COMPLETED);
}

#[test]
fn test_entry_from_metadata_prefers_engine_fields() {
    let metadata = MediaMetadata {
        id: Some("dQw4w9WgXcQ".to_string()),
        title: Some("Engine Title".to_string()),
        webpage_url: Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string()),
        filesize: Some(10),
        filesize_approx: Some(99),
        ..Default::default()
    };
    let entry = NewHistoryEntry::from_metadata(&metadata, "Queued", "https://youtu.be/dQw4w9WgXcQ", 0);

    assert_eq!(entry.content_id, "dQw4w9WgXcQ");
    assert_eq!(entry.title, "Engine Title");
    assert_eq!(entry.url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    assert_eq!(entry.file_size, Some(10));
}

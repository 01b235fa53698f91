//! Durability and ordering tests for the story log.
//!
//! Run with: `cargo test -p story-core --test store_persistence`

use std::sync::Arc;
use story_core::testing::{RecordingPublisher, TestHarness};
use story_core::{BotConfig, PublishMode, RecordStore, StoryDesk, StoryId, StoryService};
use tempfile::TempDir;

#[tokio::test]
async fn test_ids_survive_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stories.jsonl");

    {
        let store = RecordStore::open(&path).await.unwrap();
        store.append(1, Some("alice".into()), "A").await.unwrap();
        store.append(2, None, "B").await.unwrap();
    }

    let reopened = RecordStore::open(&path).await.unwrap();
    let next = reopened.append(3, None, "C").await.unwrap();

    assert_eq!(next.id, StoryId(3));
    let texts: Vec<_> = reopened
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.text)
        .collect();
    assert_eq!(texts, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn test_two_stores_on_one_file_see_each_other() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stories.jsonl");

    let first = RecordStore::open(&path).await.unwrap();
    let second = RecordStore::open(&path).await.unwrap();

    assert_eq!(first.append(1, None, "one").await.unwrap().id, StoryId(1));
    assert_eq!(second.append(2, None, "two").await.unwrap().id, StoryId(2));
    assert_eq!(first.lookup(StoryId(2)).await.unwrap().unwrap().text, "two");
}

#[tokio::test]
async fn test_concurrent_appends_get_distinct_sequential_ids() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(RecordStore::open(dir.path().join("stories.jsonl")).await.unwrap());

    let mut handles = Vec::new();
    for author in 0..25 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .append(author, None, format!("story from {author}"))
                .await
                .unwrap()
                .id
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.sort();

    let expected: Vec<_> = (1..=25).map(StoryId).collect();
    assert_eq!(ids, expected);

    // Log order matches identifier order.
    let logged: Vec<_> = store.list_all().await.unwrap().into_iter().map(|r| r.id).collect();
    assert_eq!(logged, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_through_service() {
    let dir = TempDir::new().unwrap();
    let config = BotConfig::new("@test_channel")
        .with_mode(PublishMode::Manual)
        .with_stories_path(dir.path().join("stories.jsonl"));
    let service = Arc::new(
        StoryService::new(config, Arc::new(RecordingPublisher::new()))
            .await
            .unwrap(),
    );

    let mut handles = Vec::new();
    for author in 0..10 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.submit(author, None, "concurrent").await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().story_id().unwrap());
    }
    ids.sort();
    ids.dedup();

    assert_eq!(ids.len(), 10);
    assert_eq!(ids.last(), Some(&StoryId(10)));
}

#[tokio::test]
async fn test_list_all_matches_successful_appends() {
    let dir = TempDir::new().unwrap();
    let h = TestHarness::new(dir.path(), PublishMode::Manual).await.unwrap();

    for text in ["one", "  ", "two", "", "three"] {
        h.submit(1, None, text).await;
    }

    let all = h.service.store().list_all().await.unwrap();
    let texts: Vec<_> = all.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["one", "two", "three"]);
}

#[tokio::test]
async fn test_reads_log_written_by_previous_bot_version() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stories.jsonl");
    std::fs::write(
        &path,
        concat!(
            r#"{"id": 1, "ts": "2024-03-02T18:25:43.511234", "user_id": 55, "username": "olga", "text": "Старая история"}"#,
            "\n",
            r#"{"id": 2, "ts": "2024-03-02T18:30:00.000001", "user_id": 56, "username": null, "text": "Ещё одна"}"#,
            "\n",
        ),
    )
    .unwrap();

    let store = RecordStore::open(&path).await.unwrap();
    let first = store.lookup(StoryId(1)).await.unwrap().unwrap();

    assert_eq!(first.author_id, 55);
    assert_eq!(first.author_handle.as_deref(), Some("olga"));
    assert_eq!(first.text, "Старая история");
    assert_eq!(store.append(57, None, "Новая").await.unwrap().id, StoryId(3));
}

//! Tests for the persistent access history.

use feedgate::AccessHistory;
use feedgate::history::HistoryEntry;
use std::sync::Arc;

#[tokio::test]
async fn put_is_visible_to_following_list() {
    let dir = tempfile::tempdir().unwrap();
    let store = AccessHistory::open(&dir.path().join("history.db")).await.unwrap();

    store.put("alice", "sessionid_ss=a1").await.unwrap();
    let entries = store.list().await;
    assert_eq!(
        entries,
        vec![HistoryEntry {
            username: "alice".to_string(),
            cookie: "sessionid_ss=a1".to_string(),
        }]
    );
}

#[tokio::test]
async fn put_replaces_instead_of_duplicating() {
    let dir = tempfile::tempdir().unwrap();
    let store = AccessHistory::open(&dir.path().join("history.db")).await.unwrap();

    store.put("alice", "old").await.unwrap();
    store.put("alice", "new").await.unwrap();

    let entries = store.list().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].cookie, "new");
}

#[tokio::test]
async fn entries_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.db");

    {
        let store = AccessHistory::open(&path).await.unwrap();
        store.put("alice", "c1").await.unwrap();
        store.put("bob", "c2").await.unwrap();
    }

    let store = AccessHistory::open(&path).await.unwrap();
    let mut names: Vec<String> = store.list().await.into_iter().map(|e| e.username).collect();
    names.sort();
    assert_eq!(names, vec!["alice".to_string(), "bob".to_string()]);
}

#[tokio::test]
async fn concurrent_puts_all_land() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        AccessHistory::open(&dir.path().join("history.db")).await.unwrap(),
    );

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.put(&format!("user{i}"), "cookie").await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.list().await.len(), 8);
}

#[tokio::test]
async fn missing_parent_directories_are_created() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("a").join("b").join("history.db");
    let store = AccessHistory::open(&nested).await.unwrap();
    store.put("alice", "c").await.unwrap();
    assert!(nested.exists());
}

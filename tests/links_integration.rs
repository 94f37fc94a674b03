//! Integration tests for quick links

use std::sync::Arc;

use clipdeck::collection::{StoreError, StoreEvent};
use clipdeck::config::LinksConfig;
use clipdeck::links::{LinkCategory, LinkPatch, LinkStore, NewLink, LINKS_KEY};
use clipdeck::storage::{JsonFileStore, KeyValueStore, MemoryStore};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;
use tempfile::TempDir;

async fn fresh_store() -> LinkStore {
    let mut store = LinkStore::new(Arc::new(MemoryStore::new()), &LinksConfig::default());
    store.initialize().await;
    store
}

fn new_link(name: &str, url: &str) -> NewLink {
    NewLink {
        name: name.to_string(),
        url: url.to_string(),
        ..NewLink::default()
    }
}

#[tokio::test]
async fn test_first_launch_seeds_defaults() {
    let store = fresh_store().await;

    assert_eq!(store.len(), 8);
    assert!(store.links().iter().all(|link| link.is_default));
    assert_eq!(store.stats().custom, 0);
    assert!(store.get("github").is_some());
}

#[tokio::test]
async fn test_defaults_cannot_be_deleted() {
    let mut store = fresh_store().await;

    let result = store.delete("github").await;

    assert!(matches!(result, Err(StoreError::ProtectedItem(_))));
    assert_eq!(store.len(), 8);
}

#[tokio::test]
async fn test_add_then_delete_custom_link() {
    let mut store = fresh_store().await;
    let mut events = store.subscribe();

    let link = store.add(new_link("Docs", "docs.rs")).await.unwrap();
    assert_eq!(store.len(), 9);
    assert_eq!(store.links()[0].id, link.id);
    assert_eq!(link.url, "https://docs.rs");
    assert_eq!(link.category, LinkCategory::Custom);

    store.delete(&link.id).await.unwrap();
    assert_eq!(store.len(), 8);

    assert_eq!(events.recv().await.unwrap(), StoreEvent::Added(link.id.clone()));
    assert_eq!(events.recv().await.unwrap(), StoreEvent::Removed(link.id));
}

#[rstest]
#[case("", "https://example.com")]
#[case("Example", "   ")]
#[tokio::test]
async fn test_add_requires_name_and_url(#[case] name: &str, #[case] url: &str) {
    let mut store = fresh_store().await;

    let result = store.add(new_link(name, url)).await;

    assert!(matches!(result, Err(StoreError::InvalidInput(_))));
    assert_eq!(store.len(), 8);
}

#[tokio::test]
async fn test_open_ranks_search_results() {
    let mut store = fresh_store().await;

    store.open("youtube").await.unwrap();
    store.open("youtube").await.unwrap();
    store.open("slack").await.unwrap();

    let results = store.search("", None);
    assert_eq!(results[0].id, "youtube");
    assert_eq!(results[0].usage_count, 2);
    assert!(results[0].last_used_at.is_some());
    assert_eq!(results[1].id, "slack");
    assert_eq!(store.total_opens(), 3);
}

#[rstest]
#[case("git", None, vec!["github"])]
#[case("", Some(LinkCategory::Communication), vec!["gmail", "slack"])]
#[case("DEVELOPMENT", None, vec!["github", "stackoverflow"])]
#[case("figma.com", Some(LinkCategory::Design), vec!["figma"])]
#[case("nothing-matches", None, vec![])]
#[tokio::test]
async fn test_search(
    #[case] query: &str,
    #[case] category: Option<LinkCategory>,
    #[case] expected: Vec<&str>,
) {
    let store = fresh_store().await;

    let ids: Vec<&str> = store
        .search(query, category)
        .into_iter()
        .map(|link| link.id.as_str())
        .collect();

    assert_eq!(ids, expected);
}

#[tokio::test]
async fn test_update_custom_and_protect_defaults() {
    let mut store = fresh_store().await;
    let link = store.add(new_link("Docs", "https://docs.rs")).await.unwrap();

    let patch = LinkPatch {
        name: Some("Rust Docs".to_string()),
        category: Some(LinkCategory::Development),
        ..LinkPatch::default()
    };
    let updated = store.update(&link.id, patch.clone()).await.unwrap();
    assert_eq!(updated.name, "Rust Docs");
    assert_eq!(updated.category, LinkCategory::Development);
    assert_eq!(updated.url, "https://docs.rs");

    let result = store.update("github", patch).await;
    assert!(matches!(result, Err(StoreError::ProtectedItem(_))));
    assert_eq!(store.get("github").unwrap().name, "GitHub");

    let usage = LinkPatch {
        usage_count: Some(5),
        ..LinkPatch::default()
    };
    assert_eq!(store.update("github", usage).await.unwrap().usage_count, 5);

    let result = store.update("missing", LinkPatch::default()).await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn test_clear_keeps_defaults() {
    let mut store = fresh_store().await;
    store.add(new_link("A", "a.example")).await.unwrap();
    store.add(new_link("B", "b.example")).await.unwrap();

    assert_eq!(store.clear().await.unwrap(), 2);
    assert_eq!(store.len(), 8);
}

#[tokio::test]
async fn test_reset_to_defaults() {
    let mut store = fresh_store().await;
    store.add(new_link("A", "a.example")).await.unwrap();
    store.open("github").await.unwrap();

    store.reset_to_defaults().await.unwrap();

    assert_eq!(store.len(), 8);
    assert_eq!(store.total_opens(), 0);
}

#[tokio::test]
async fn test_categories_in_use() {
    let mut store = fresh_store().await;
    assert!(!store.categories().contains(&LinkCategory::Custom));

    store.add(new_link("A", "a.example")).await.unwrap();

    let categories = store.categories();
    assert!(categories.contains(&LinkCategory::Custom));
    assert_eq!(categories.len(), 7);
}

#[tokio::test]
async fn test_export_import_roundtrip_through_files() {
    let temp_dir = TempDir::new().unwrap();
    let backend: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::open(temp_dir.path()).await.unwrap());

    let mut source = fresh_store().await;
    let custom = source.add(new_link("Docs", "docs.rs")).await.unwrap();
    let exported = source.export_snapshot().unwrap();

    // Target already holds the defaults, so only the custom link is new
    let mut target = LinkStore::new(Arc::clone(&backend), &LinksConfig::default());
    target.initialize().await;
    assert_eq!(target.import_snapshot(&exported).await.unwrap(), 1);
    assert_eq!(target.len(), 9);
    assert_eq!(target.links()[8].id, custom.id);

    let mut reloaded = LinkStore::new(backend, &LinksConfig::default());
    reloaded.initialize().await;
    assert_eq!(reloaded.links(), target.links());
}

#[tokio::test]
async fn test_import_cannot_forge_defaults() {
    let mut store = fresh_store().await;
    let backup = json!({
        "links": [
            {"id": "evil", "name": "Evil", "url": "https://evil.example", "isDefault": true, "clickCount": 3}
        ]
    });

    assert_eq!(store.import_snapshot(&backup.to_string()).await.unwrap(), 1);

    let imported = store.get("evil").unwrap();
    assert!(!imported.is_default);
    assert_eq!(imported.usage_count, 3);
    store.delete("evil").await.unwrap();
}

#[tokio::test]
async fn test_import_rejects_blank_fields() {
    let mut store = fresh_store().await;
    let backup = json!({"items": [{"id": "x", "name": " ", "url": "https://x.example"}]});

    let result = store.import_snapshot(&backup.to_string()).await;

    assert!(matches!(result, Err(StoreError::MalformedImport(_))));
    assert_eq!(store.len(), 8);
}

#[tokio::test]
async fn test_unreadable_storage_falls_back_to_defaults() {
    let backend = Arc::new(MemoryStore::with_entries([(LINKS_KEY, json!({"not": "a list"}))]));
    let mut store = LinkStore::new(backend, &LinksConfig::default());

    store.initialize().await;

    assert_eq!(store.len(), 8);
}

#[tokio::test]
async fn test_full_store_keeps_newest_custom_links() {
    let config = LinksConfig { max_items: 10 };
    let mut store = LinkStore::new(Arc::new(MemoryStore::new()), &config);
    store.initialize().await;

    let first = store.add(new_link("First", "first.example")).await.unwrap();
    let second = store.add(new_link("Second", "second.example")).await.unwrap();
    assert_eq!(store.len(), 10);

    // Adding at capacity drops the oldest custom link
    let third = store.add(new_link("Third", "third.example")).await.unwrap();
    assert!(store.get(&first.id).is_none());

    let backup = json!({
        "items": [{"id": "restored", "name": "Restored", "url": "restored.example"}]
    });
    let count = store.import_snapshot(&backup.to_string()).await.unwrap();

    assert_eq!(count, 1);
    assert_eq!(store.len(), 10);
    assert!(store.get("restored").is_some());
    assert!(store.get(&third.id).is_some());
    assert!(store.get(&second.id).is_none());
    assert_eq!(store.stats().custom, 2);
}

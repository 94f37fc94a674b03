//! Integration tests for JSON message routing

use std::sync::Arc;

use async_trait::async_trait;
use clipdeck::clipboard::{ClipboardError, ClipboardSource};
use clipdeck::config::ClipsConfig;
use clipdeck::history::ClipHistory;
use clipdeck::router::{MessageRouter, Request, Response};
use clipdeck::storage::MemoryStore;
use serde_json::{json, Value};
use tokio::sync::Mutex;

/// Clipboard holding fixed text
struct FakeClipboard {
    text: std::sync::Mutex<String>,
}

impl FakeClipboard {
    fn new(text: &str) -> Self {
        Self {
            text: std::sync::Mutex::new(text.to_string()),
        }
    }
}

#[async_trait]
impl ClipboardSource for FakeClipboard {
    async fn read_text(&self) -> Result<String, ClipboardError> {
        Ok(self.text.lock().unwrap().clone())
    }

    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        *self.text.lock().unwrap() = text.to_string();
        Ok(())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

async fn router() -> (MessageRouter, Arc<Mutex<ClipHistory>>) {
    let mut history = ClipHistory::new(Arc::new(MemoryStore::new()), &ClipsConfig::default());
    history.initialize().await;
    let history = Arc::new(Mutex::new(history));
    (MessageRouter::new(Arc::clone(&history)), history)
}

async fn send(router: &MessageRouter, message: Value) -> Value {
    let raw = router.handle_json(&message.to_string()).await;
    serde_json::from_str(&raw).unwrap()
}

#[tokio::test]
async fn test_add_list_clear() {
    let (router, history) = router().await;

    let added = send(&router, json!({"action": "addItem", "value": "https://example.com"})).await;
    assert_eq!(added["success"], json!(true));
    assert_eq!(added["item"]["type"], json!("url"));
    assert_eq!(added["count"], json!(1));

    send(&router, json!({"action": "newClip", "content": "second"})).await;

    let listed = send(&router, json!({"action": "listItems"})).await;
    assert_eq!(listed["count"], json!(2));
    assert_eq!(listed["items"][0]["content"], json!("second"));

    let cleared = send(&router, json!({"action": "clearAll"})).await;
    assert_eq!(cleared, json!({"success": true, "count": 2}));
    assert!(history.lock().await.is_empty());
}

#[tokio::test]
async fn test_failures_are_reported_not_raised() {
    let (router, _) = router().await;

    let empty = send(&router, json!({"action": "addItem", "value": "   "})).await;
    assert_eq!(empty["success"], json!(false));
    assert!(empty["error"].as_str().unwrap().contains("empty"));

    let unknown = send(&router, json!({"action": "launchRockets"})).await;
    assert_eq!(unknown["success"], json!(false));

    let garbage = router.handle_json("{not json").await;
    let garbage: Value = serde_json::from_str(&garbage).unwrap();
    assert_eq!(garbage["success"], json!(false));
}

#[tokio::test]
async fn test_read_clipboard() {
    let (router, history) = router().await;

    let unconfigured = router.handle(Request::ReadClipboard).await;
    assert!(!unconfigured.success);

    let router = router.with_clipboard(Arc::new(FakeClipboard::new("captured text")));
    let response: Response = router.handle(Request::ReadClipboard).await;
    assert!(response.success);
    assert_eq!(response.item.unwrap().content, "captured text");
    assert_eq!(history.lock().await.len(), 1);

    let empty = router.with_clipboard(Arc::new(FakeClipboard::new("")));
    let response = empty.handle(Request::ReadClipboard).await;
    assert!(response.success);
    assert!(response.item.is_none());
    assert_eq!(response.count, Some(1));
}

//! Clipboard history management and persistence
//!
//! Clips are kept in most-recently-used order: adding text that is already
//! in history moves the existing clip to the front instead of duplicating
//! it. Clips unused for longer than the retention window are purged when
//! the history is initialized.

pub mod detection;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clipboard::ClipboardSource;
use crate::collection::{
    contains_ignore_case, now_millis, snapshot, Collection, Entry, StoreError, StoreEvent,
};
use crate::config::ClipsConfig;
use crate::storage::{KeyValueStore, StorageError};

pub use detection::{classify, ClipKind};

/// Storage key of the clip list
pub const CLIPS_KEY: &str = "clips";

/// Storage key of the clip settings
pub const SETTINGS_KEY: &str = "settings";

/// Previews longer than this many characters are truncated
pub const PREVIEW_LEN: usize = 100;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// A captured piece of clipboard text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    pub id: String,
    /// Trimmed clipboard text
    pub content: String,
    #[serde(rename = "type")]
    pub kind: ClipKind,
    #[serde(default)]
    pub preview: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(alias = "timestamp")]
    pub last_used_at: i64,
    #[serde(default, alias = "usage_count")]
    pub usage_count: u64,
}

impl Clip {
    /// Build a new clip from already-trimmed text
    pub fn new(content: String, kind: ClipKind, now: i64) -> Self {
        Self {
            id: format!("clip-{}", Uuid::new_v4().simple()),
            preview: preview_of(&content),
            content,
            kind,
            created_at: now,
            last_used_at: now,
            usage_count: 0,
        }
    }

    /// Fill in fields missing from older backups
    fn normalize(&mut self) {
        let trimmed = self.content.trim();
        if trimmed.len() != self.content.len() {
            self.content = trimmed.to_string();
        }
        if self.preview.is_empty() {
            self.preview = preview_of(&self.content);
        }
        if self.created_at == 0 {
            self.created_at = self.last_used_at;
        }
    }
}

impl Entry for Clip {
    fn id(&self) -> &str {
        &self.id
    }

    fn usage_count(&self) -> u64 {
        self.usage_count
    }

    fn record_use(&mut self, now: i64) {
        self.usage_count += 1;
        self.last_used_at = now;
    }
}

/// Display preview: the first [`PREVIEW_LEN`] characters, `...` when cut
pub fn preview_of(content: &str) -> String {
    if content.chars().count() > PREVIEW_LEN {
        let head: String = content.chars().take(PREVIEW_LEN).collect();
        format!("{}...", head)
    } else {
        content.to_string()
    }
}

/// Settings persisted alongside the clips
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipSettings {
    pub max_items: usize,
    pub auto_delete_after_days: u32,
    pub enable_notifications: bool,
}

impl From<&ClipsConfig> for ClipSettings {
    fn from(config: &ClipsConfig) -> Self {
        Self {
            max_items: config.max_items,
            auto_delete_after_days: config.auto_delete_after_days,
            enable_notifications: config.enable_notifications,
        }
    }
}

impl ClipSettings {
    /// Overlay the keys of `overrides` on these settings
    pub fn merged(&self, overrides: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        let mut base = serde_json::to_value(self)?;
        if let Value::Object(fields) = &mut base {
            for (key, value) in overrides {
                fields.insert(key.clone(), value.clone());
            }
        }
        let mut merged: ClipSettings = serde_json::from_value(base)?;
        merged.max_items = merged.max_items.max(1);
        Ok(merged)
    }

    fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// Clip counts for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipStats {
    pub total: usize,
    /// Clips used since local midnight
    pub today: usize,
}

/// Main interface for clipboard history management
pub struct ClipHistory {
    clips: Collection<Clip>,
    settings: ClipSettings,
}

impl ClipHistory {
    /// Create an empty history; call [`ClipHistory::initialize`] to load it
    pub fn new(backend: Arc<dyn KeyValueStore>, config: &ClipsConfig) -> Self {
        let settings = ClipSettings::from(config);
        Self {
            clips: Collection::new(CLIPS_KEY, backend, settings.max_items),
            settings,
        }
    }

    /// Load persisted clips and settings, then purge expired clips.
    ///
    /// Never fails: unreadable state is logged and replaced by an empty
    /// history with the configured settings.
    pub async fn initialize(&mut self) {
        match self.load_settings().await {
            Ok(Some(settings)) => self.settings = settings,
            Ok(None) => {}
            Err(e) => warn!("Failed to load clip settings, using defaults: {}", e),
        }
        self.clips.set_max_items(self.settings.max_items);

        let mut collapsed = 0;
        match self.clips.load().await {
            Ok(Some(mut clips)) => {
                clips.iter_mut().for_each(Clip::normalize);
                collapsed = collapse_duplicates(&mut clips);
                self.clips.replace_all(clips);
            }
            Ok(None) => self.clips.replace_all(Vec::new()),
            Err(e) => {
                warn!("Failed to load clipboard history, starting empty: {}", e);
                self.clips.replace_all(Vec::new());
            }
        }

        let evicted = self.clips.evict_overflow().len();
        let purged = self.purge_expired(now_millis());
        if collapsed + evicted + purged > 0 {
            if let Err(e) = self.clips.persist().await {
                warn!("Failed to save history after cleanup: {}", e);
            }
        }

        info!(
            "Clipboard history initialized with {} clips ({} duplicate, {} expired, {} over capacity)",
            self.clips.len(),
            collapsed,
            purged,
            evicted
        );
    }

    async fn load_settings(&self) -> Result<Option<ClipSettings>, StoreError> {
        let Some(value) = self.clips.backend().get(SETTINGS_KEY).await? else {
            return Ok(None);
        };
        let settings = serde_json::from_value::<Map<String, Value>>(value)
            .and_then(|stored| self.settings.merged(&stored))
            .map_err(|source| StorageError::Json {
                key: SETTINGS_KEY.to_string(),
                source,
            })?;
        Ok(Some(settings))
    }

    async fn save_settings(&self) -> Result<(), StoreError> {
        let value = serde_json::to_value(&self.settings).map_err(StoreError::Serialization)?;
        self.clips.backend().set(SETTINGS_KEY, value).await?;
        Ok(())
    }

    /// Remove clips last used before the retention window. Returns the
    /// number removed.
    pub fn purge_expired(&mut self, now: i64) -> usize {
        let days = self.settings.auto_delete_after_days;
        if days == 0 {
            return 0;
        }
        let cutoff = now - i64::from(days) * DAY_MS;
        self.clips.retain(|clip| clip.last_used_at > cutoff)
    }

    /// Clips, most recently used first
    pub fn clips(&self) -> &[Clip] {
        self.clips.items()
    }

    pub fn get(&self, id: &str) -> Option<&Clip> {
        self.clips.get(id)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn settings(&self) -> &ClipSettings {
        &self.settings
    }

    /// Add text to history.
    ///
    /// Text already present is moved to the front with its usage bumped;
    /// otherwise a new clip is created, classified unless `kind` is given.
    pub async fn add(&mut self, content: &str, kind: Option<ClipKind>) -> Result<Clip, StoreError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(StoreError::InvalidInput("clip content is empty".to_string()));
        }

        let now = now_millis();
        let (clip, event) = match self.clips.find(|clip| clip.content == content) {
            Some(index) => {
                self.clips.promote(index);
                let id = self.clips.items()[0].id.clone();
                let clip = self.clips.record_use(&id, now)?.clone();
                debug!("Clip {} re-added, usage now {}", clip.id, clip.usage_count);
                (clip, StoreEvent::Updated(id))
            }
            None => {
                let kind = kind.unwrap_or_else(|| classify(content));
                let clip = Clip::new(content.to_string(), kind, now);
                debug!("New {} clip {}", clip.kind, clip.id);
                self.clips.push_front(clip.clone());
                self.clips.evict_overflow();
                let event = StoreEvent::Added(clip.id.clone());
                (clip, event)
            }
        };

        self.clips.persist().await?;
        self.clips.notify(event);
        Ok(clip)
    }

    /// Read the clipboard and add its text, `None` when it holds no text
    pub async fn capture(&mut self, source: &dyn ClipboardSource) -> crate::Result<Option<Clip>> {
        let text = source.read_text().await?;
        if text.trim().is_empty() {
            debug!("Clipboard from {} is empty, nothing captured", source.name());
            return Ok(None);
        }
        Ok(Some(self.add(&text, None).await?))
    }

    /// Record a copy of `id`; the caller writes the content to the clipboard
    pub async fn copy(&mut self, id: &str) -> Result<Clip, StoreError> {
        let clip = self.clips.record_use(id, now_millis())?.clone();
        self.clips.persist().await?;
        self.clips.notify(StoreEvent::Updated(clip.id.clone()));
        Ok(clip)
    }

    pub async fn delete(&mut self, id: &str) -> Result<Clip, StoreError> {
        let clip = self.clips.remove(id)?;
        self.clips.persist().await?;
        self.clips.notify(StoreEvent::Removed(clip.id.clone()));
        Ok(clip)
    }

    /// Remove every clip, returning how many were removed
    pub async fn clear(&mut self) -> Result<usize, StoreError> {
        let removed = self.clips.retain(|_| false);
        self.clips.persist().await?;
        self.clips.notify(StoreEvent::Cleared);
        info!("Cleared {} clips", removed);
        Ok(removed)
    }

    /// Filter clips by text and type, keeping most-recently-used order.
    ///
    /// An empty query matches everything; otherwise the query must appear
    /// (case-insensitively) in the content or the type name.
    pub fn search(&self, query: &str, kind: Option<ClipKind>) -> Vec<&Clip> {
        let needle = query.trim().to_lowercase();
        self.clips
            .items()
            .iter()
            .filter(|clip| kind.map_or(true, |k| clip.kind == k))
            .filter(|clip| {
                needle.is_empty()
                    || contains_ignore_case(&clip.content, &needle)
                    || clip.kind.as_str().contains(needle.as_str())
            })
            .collect()
    }

    pub fn stats(&self) -> ClipStats {
        self.stats_at(Local::now())
    }

    pub fn stats_at(&self, now: DateTime<Local>) -> ClipStats {
        let midnight = start_of_day(now);
        ClipStats {
            total: self.clips.len(),
            today: self
                .clips
                .items()
                .iter()
                .filter(|clip| clip.last_used_at >= midnight)
                .count(),
        }
    }

    /// Replace the settings, applying a lower capacity immediately
    pub async fn update_settings(&mut self, settings: ClipSettings) -> Result<(), StoreError> {
        self.settings = ClipSettings {
            max_items: settings.max_items.max(1),
            ..settings
        };
        self.clips.set_max_items(self.settings.max_items);
        let evicted = self.clips.evict_overflow().len();

        self.save_settings().await?;
        if evicted > 0 {
            self.clips.persist().await?;
        }
        Ok(())
    }

    /// Export clips and settings as JSON text
    pub fn export_snapshot(&self) -> Result<String, StoreError> {
        snapshot::encode(self.clips.items(), &self.settings.to_map())
    }

    /// Import clips ahead of the current history.
    ///
    /// Imported ids are kept. Clips whose id or content is already present
    /// are skipped. Settings in the snapshot are merged over the current
    /// ones. Returns the number of clips imported; on malformed input the
    /// history is left untouched.
    pub async fn import_snapshot(&mut self, text: &str) -> Result<usize, StoreError> {
        let snapshot = snapshot::decode::<Clip>(text)?;

        let settings = match &snapshot.settings {
            Some(overrides) => self
                .settings
                .merged(overrides)
                .map_err(|e| StoreError::MalformedImport(format!("invalid settings: {}", e)))?,
            None => self.settings.clone(),
        };

        let mut imported: Vec<Clip> = Vec::new();
        for mut clip in snapshot.items {
            clip.normalize();
            let duplicate = clip.content.is_empty()
                || self.clips.contains_id(&clip.id)
                || self.clips.find(|c| c.content == clip.content).is_some()
                || imported
                    .iter()
                    .any(|c| c.id == clip.id || c.content == clip.content);
            if duplicate {
                debug!("Skipping duplicate clip {} on import", clip.id);
                continue;
            }
            imported.push(clip);
        }

        let imported_ids: HashSet<String> = imported.iter().map(|c| c.id.clone()).collect();
        let settings_changed = settings != self.settings;
        self.settings = settings;
        self.clips.set_max_items(self.settings.max_items);
        self.clips.prepend(imported);
        let evicted = self.clips.evict_overflow();
        let count = imported_ids.len() - evicted.iter().filter(|c| imported_ids.contains(&c.id)).count();

        self.clips.persist().await?;
        if settings_changed {
            self.save_settings().await?;
        }
        self.clips.notify(StoreEvent::Imported(count));
        info!("Imported {} clips", count);
        Ok(count)
    }

    /// Receive change events
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.clips.subscribe()
    }
}

/// Drop blank clips and later repeats of an id or content, keeping the
/// first (most recently used) occurrence. Returns the number dropped.
fn collapse_duplicates(clips: &mut Vec<Clip>) -> usize {
    let before = clips.len();
    let mut ids = HashSet::new();
    let mut contents = HashSet::new();
    clips.retain(|clip| {
        !clip.content.is_empty()
            && !ids.contains(&clip.id)
            && !contents.contains(&clip.content)
            && ids.insert(clip.id.clone())
            && contents.insert(clip.content.clone())
    });
    before - clips.len()
}

/// Local midnight of `now`, in epoch milliseconds
fn start_of_day(now: DateTime<Local>) -> i64 {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
        .map(|midnight| midnight.timestamp_millis())
        .unwrap_or_else(|| now.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, MockKeyValueStore};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn history_with(max_items: usize) -> (ClipHistory, Arc<MemoryStore>) {
        let backend = Arc::new(MemoryStore::new());
        let config = ClipsConfig {
            max_items,
            ..ClipsConfig::default()
        };
        let mut history = ClipHistory::new(backend.clone(), &config);
        history.initialize().await;
        (history, backend)
    }

    #[test]
    fn test_preview_truncates_long_content() {
        let long = "é".repeat(150);
        let preview = preview_of(&long);
        assert_eq!(preview.chars().count(), PREVIEW_LEN + 3);
        assert!(preview.ends_with("..."));

        assert_eq!(preview_of("short"), "short");
        assert_eq!(preview_of(&"x".repeat(100)), "x".repeat(100));
    }

    #[tokio::test]
    async fn test_add_trims_and_classifies() {
        let (mut history, backend) = history_with(10).await;

        let clip = history.add("  https://example.com \n", None).await.unwrap();
        assert_eq!(clip.content, "https://example.com");
        assert_eq!(clip.kind, ClipKind::Url);
        assert_eq!(clip.usage_count, 0);
        assert!(clip.id.starts_with("clip-"));

        let stored = backend.get(CLIPS_KEY).await.unwrap().unwrap();
        assert_eq!(stored[0]["content"], json!("https://example.com"));
        assert_eq!(stored[0]["type"], json!("url"));
    }

    #[tokio::test]
    async fn test_add_explicit_kind_skips_classification() {
        let (mut history, _) = history_with(10).await;
        let clip = history.add("a@b.com", Some(ClipKind::Text)).await.unwrap();
        assert_eq!(clip.kind, ClipKind::Text);
    }

    #[tokio::test]
    async fn test_add_rejects_blank() {
        let (mut history, backend) = history_with(10).await;

        let result = history.add(" \t\n", None).await;
        assert!(matches!(result, Err(StoreError::InvalidInput(_))));
        assert!(history.is_empty());
        assert_eq!(backend.get(CLIPS_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_readd_promotes_existing_clip() {
        let (mut history, _) = history_with(10).await;

        let first = history.add("alpha", None).await.unwrap();
        history.add("beta", None).await.unwrap();
        let again = history.add("alpha", None).await.unwrap();

        assert_eq!(again.id, first.id);
        assert_eq!(again.usage_count, 1);
        assert_eq!(history.len(), 2);
        assert_eq!(history.clips()[0].id, first.id);
        assert_eq!(history.clips()[0].usage_count, 1);
    }

    #[tokio::test]
    async fn test_dedup_is_case_sensitive() {
        let (mut history, _) = history_with(10).await;
        history.add("Alpha", None).await.unwrap();
        history.add("alpha", None).await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let (mut history, _) = history_with(3).await;
        for i in 0..5 {
            history.add(&format!("clip {}", i), None).await.unwrap();
        }

        let contents: Vec<&str> = history.clips().iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["clip 4", "clip 3", "clip 2"]);
    }

    #[tokio::test]
    async fn test_copy_counts_without_reordering() {
        let (mut history, _) = history_with(10).await;
        let older = history.add("older", None).await.unwrap();
        history.add("newer", None).await.unwrap();

        let copied = history.copy(&older.id).await.unwrap();
        assert_eq!(copied.usage_count, 1);
        assert!(copied.last_used_at >= older.last_used_at);
        assert_eq!(history.clips()[1].id, older.id);

        assert!(matches!(
            history.copy("clip-missing").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let (mut history, _) = history_with(10).await;
        let a = history.add("a", None).await.unwrap();
        history.add("b", None).await.unwrap();
        history.add("c", None).await.unwrap();

        history.delete(&a.id).await.unwrap();
        assert!(history.get(&a.id).is_none());
        assert!(matches!(history.delete(&a.id).await, Err(StoreError::NotFound(_))));

        assert_eq!(history.clear().await.unwrap(), 2);
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_search_filters_and_keeps_order() {
        let (mut history, _) = history_with(10).await;
        history.add("https://rust-lang.org", None).await.unwrap();
        history.add("const rust = 1;", None).await.unwrap();
        history.add("plain words", None).await.unwrap();

        let all = history.search("", None);
        assert_eq!(all.len(), 3);

        let rust: Vec<&str> = history
            .search("RUST", None)
            .iter()
            .map(|c| c.content.as_str())
            .collect();
        assert_eq!(rust, vec!["const rust = 1;", "https://rust-lang.org"]);

        let urls = history.search("rust", Some(ClipKind::Url));
        assert_eq!(urls.len(), 1);

        // Query matches the type name too
        assert_eq!(history.search("code", None).len(), 1);
    }

    #[tokio::test]
    async fn test_initialize_purges_expired_clips() {
        let now = now_millis();
        let backend = Arc::new(MemoryStore::with_entries([(
            CLIPS_KEY,
            json!([
                {"id": "fresh", "content": "fresh", "type": "text", "lastUsedAt": now - DAY_MS},
                {"id": "stale", "content": "stale", "type": "text", "lastUsedAt": now - 8 * DAY_MS},
            ]),
        )]));

        let mut history = ClipHistory::new(backend.clone(), &ClipsConfig::default());
        history.initialize().await;

        assert_eq!(history.len(), 1);
        assert_eq!(history.clips()[0].id, "fresh");
        let stored = backend.get(CLIPS_KEY).await.unwrap().unwrap();
        assert_eq!(stored.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_initialize_collapses_duplicate_clips() {
        let now = now_millis();
        let backend = Arc::new(MemoryStore::with_entries([(
            CLIPS_KEY,
            json!([
                {"id": "a", "content": "same", "type": "text", "lastUsedAt": now},
                {"id": "b", "content": " same ", "type": "text", "lastUsedAt": now - 1},
                {"id": "a", "content": "other", "type": "text", "lastUsedAt": now - 2},
                {"id": "c", "content": "   ", "type": "text", "lastUsedAt": now - 3},
                {"id": "d", "content": "kept", "type": "text", "lastUsedAt": now - 4},
            ]),
        )]));

        let mut history = ClipHistory::new(backend.clone(), &ClipsConfig::default());
        history.initialize().await;

        let ids: Vec<&str> = history.clips().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "d"]);
        let stored = backend.get(CLIPS_KEY).await.unwrap().unwrap();
        assert_eq!(stored.as_array().unwrap().len(), 2);

        let again = history.add("same", None).await.unwrap();
        assert_eq!(again.id, "a");
        assert_eq!(again.usage_count, 1);
        assert_eq!(history.search("same", None).len(), 1);
    }

    #[tokio::test]
    async fn test_import_beyond_capacity_reports_only_kept_clips() {
        let (mut history, _) = history_with(2).await;

        let text = json!({
            "items": [
                {"id": "one", "content": "one", "type": "text", "lastUsedAt": 3},
                {"id": "two", "content": "two", "type": "text", "lastUsedAt": 2},
                {"id": "three", "content": "three", "type": "text", "lastUsedAt": 1},
            ]
        })
        .to_string();

        assert_eq!(history.import_snapshot(&text).await.unwrap(), 2);
        let ids: Vec<&str> = history.clips().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_retention_zero_keeps_everything() {
        let backend = Arc::new(MemoryStore::with_entries([
            (
                CLIPS_KEY,
                json!([{"id": "old", "content": "old", "type": "text", "timestamp": 1}]),
            ),
            (SETTINGS_KEY, json!({"autoDeleteAfterDays": 0})),
        ]));

        let mut history = ClipHistory::new(backend, &ClipsConfig::default());
        history.initialize().await;

        assert_eq!(history.len(), 1);
        assert_eq!(history.settings().auto_delete_after_days, 0);
        assert_eq!(history.settings().max_items, 100);
    }

    #[tokio::test]
    async fn test_initialize_recovers_from_load_failure() {
        let mut backend = MockKeyValueStore::new();
        backend
            .expect_get()
            .returning(|_| Err(StorageError::Unavailable("storage offline".to_string())));

        let mut history = ClipHistory::new(Arc::new(backend), &ClipsConfig::default());
        history.initialize().await;

        assert!(history.is_empty());
        assert_eq!(history.settings(), &ClipSettings::from(&ClipsConfig::default()));
    }

    #[tokio::test]
    async fn test_save_failure_keeps_memory_state() {
        let mut backend = MockKeyValueStore::new();
        backend.expect_get().returning(|_| Ok(None));
        backend
            .expect_set()
            .returning(|_, _| Err(StorageError::Unavailable("quota exceeded".to_string())));

        let mut history = ClipHistory::new(Arc::new(backend), &ClipsConfig::default());
        history.initialize().await;

        let result = history.add("kept in memory", None).await;
        assert!(matches!(result, Err(StoreError::Persistence(_))));
        assert_eq!(history.len(), 1);
        assert_eq!(history.clips()[0].content, "kept in memory");
    }

    #[tokio::test]
    async fn test_update_settings_shrinks_history() {
        let (mut history, backend) = history_with(10).await;
        for i in 0..4 {
            history.add(&format!("clip {}", i), None).await.unwrap();
        }

        let settings = ClipSettings {
            max_items: 2,
            ..history.settings().clone()
        };
        history.update_settings(settings).await.unwrap();

        assert_eq!(history.len(), 2);
        let stored = backend.get(SETTINGS_KEY).await.unwrap().unwrap();
        assert_eq!(stored["maxItems"], json!(2));
    }

    #[tokio::test]
    async fn test_import_skips_known_content_and_merges_settings() {
        let (mut history, _) = history_with(10).await;
        history.add("existing", None).await.unwrap();

        let text = json!({
            "clips": [
                {"id": "clip-old-1", "content": "existing", "type": "text", "timestamp": 10, "usage_count": 3},
                {"id": "clip-old-2", "content": " imported ", "type": "text", "timestamp": 20, "usage_count": 2},
            ],
            "settings": {"enableNotifications": false},
            "exportDate": "2024-05-01T10:00:00.000Z",
            "version": "1.0",
        })
        .to_string();

        assert_eq!(history.import_snapshot(&text).await.unwrap(), 1);
        assert_eq!(history.len(), 2);

        let imported = &history.clips()[0];
        assert_eq!(imported.id, "clip-old-2");
        assert_eq!(imported.content, "imported");
        assert_eq!(imported.preview, "imported");
        assert_eq!(imported.usage_count, 2);
        assert_eq!(imported.created_at, 20);
        assert!(!history.settings().enable_notifications);
    }

    #[tokio::test]
    async fn test_malformed_import_leaves_history_unchanged() {
        let (mut history, _) = history_with(10).await;
        history.add("keep me", None).await.unwrap();
        let before = history.clips().to_vec();

        for text in [
            "{",
            r#"{"settings": {}}"#,
            r#"{"items": "nope"}"#,
            r#"{"items": [{"id": "x"}]}"#,
            r#"{"items": [], "settings": {"maxItems": "many"}}"#,
        ] {
            let result = history.import_snapshot(text).await;
            assert!(matches!(result, Err(StoreError::MalformedImport(_))), "{}", text);
        }
        assert_eq!(history.clips(), before.as_slice());
    }

    #[tokio::test]
    async fn test_stats_counts_today() {
        let (mut history, _) = history_with(10).await;
        history.add("today", None).await.unwrap();

        let stats = history.stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.today, 1);

        let tomorrow = Local::now() + chrono::Duration::days(1);
        assert_eq!(history.stats_at(tomorrow).today, 0);
    }
}

//! Generic persisted collection shared by the clip and link stores
//!
//! A [`Collection`] owns an ordered list of entries and mirrors it to a
//! single key of the [`KeyValueStore`]. Every mutating path of the stores
//! built on top of it ends in [`Collection::persist`], so memory and storage
//! never disagree for longer than one write.

use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

use crate::storage::{KeyValueStore, StorageError};

pub mod snapshot;

pub use snapshot::{Snapshot, FORMAT_VERSION};

/// Capacity of the change-event channel
const EVENT_CHANNEL_SIZE: usize = 64;

/// Store operation errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Empty or otherwise unusable input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No entry with this id
    #[error("No item with id '{0}'")]
    NotFound(String),

    /// Entry is a default and cannot be changed this way
    #[error("Item '{0}' is a default item and cannot be modified")]
    ProtectedItem(String),

    /// The persistence backend rejected a read or write
    #[error("Persistence failure: {0}")]
    Persistence(#[from] StorageError),

    /// Import payload failed structural validation
    #[error("Malformed import: {0}")]
    MalformedImport(String),

    /// Entries could not be encoded
    #[error("Serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),
}

/// Change notification, delivered best-effort to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Added(String),
    Updated(String),
    Removed(String),
    Cleared,
    Imported(usize),
    Reset,
}

/// An item that can live in a [`Collection`]
pub trait Entry: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Unique identifier within the collection
    fn id(&self) -> &str;

    /// Number of recorded uses
    fn usage_count(&self) -> u64;

    /// Record one use at `now` (epoch milliseconds)
    fn record_use(&mut self, now: i64);

    /// Protected entries cannot be deleted or evicted
    fn is_protected(&self) -> bool {
        false
    }
}

/// Current time in epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Parse a category filter where `"all"` (or empty) means no filtering
pub fn parse_category<K: FromStr>(value: &str) -> Result<Option<K>, K::Err> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("all") {
        Ok(None)
    } else {
        value.parse().map(Some)
    }
}

/// Case-insensitive substring test; `needle` must already be lowercase
pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Ordered, capped, persisted list of entries
pub struct Collection<E: Entry> {
    key: &'static str,
    backend: Arc<dyn KeyValueStore>,
    items: Vec<E>,
    max_items: usize,
    events: broadcast::Sender<StoreEvent>,
}

impl<E: Entry> Collection<E> {
    /// Create an empty collection mirrored under `key`
    pub fn new(key: &'static str, backend: Arc<dyn KeyValueStore>, max_items: usize) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            key,
            backend,
            items: Vec::new(),
            max_items: max_items.max(1),
            events,
        }
    }

    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.backend
    }

    /// Read the persisted list, `None` when nothing was stored yet
    pub async fn load(&self) -> Result<Option<Vec<E>>, StoreError> {
        let Some(value) = self.backend.get(self.key).await? else {
            return Ok(None);
        };

        let items = serde_json::from_value(value).map_err(|source| StorageError::Json {
            key: self.key.to_string(),
            source,
        })?;
        Ok(Some(items))
    }

    /// Write the whole list under the collection key
    pub async fn persist(&self) -> Result<(), StoreError> {
        let value = serde_json::to_value(&self.items).map_err(StoreError::Serialization)?;
        self.backend.set(self.key, value).await?;
        debug!("Persisted {} items under '{}'", self.items.len(), self.key);
        Ok(())
    }

    pub fn items(&self) -> &[E] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn set_max_items(&mut self, max_items: usize) {
        self.max_items = max_items.max(1);
    }

    pub fn get(&self, id: &str) -> Option<&E> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut E> {
        self.items.iter_mut().find(|item| item.id() == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    pub fn find<P>(&self, predicate: P) -> Option<usize>
    where
        P: Fn(&E) -> bool,
    {
        self.items.iter().position(predicate)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Replace the in-memory list without persisting
    pub fn replace_all(&mut self, items: Vec<E>) {
        self.items = items;
    }

    pub fn push_front(&mut self, item: E) {
        self.items.insert(0, item);
    }

    /// Insert `items` ahead of the current entries, keeping their order
    pub fn prepend(&mut self, items: Vec<E>) {
        self.items.splice(0..0, items);
    }

    pub fn extend(&mut self, items: Vec<E>) {
        self.items.extend(items);
    }

    /// Move the entry at `index` to the front
    pub fn promote(&mut self, index: usize) {
        if index > 0 && index < self.items.len() {
            let item = self.items.remove(index);
            self.items.insert(0, item);
        }
    }

    /// Increment the usage of `id`, returning the updated entry
    pub fn record_use(&mut self, id: &str, now: i64) -> Result<&E, StoreError> {
        let item = self
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        item.record_use(now);
        Ok(&*item)
    }

    /// Remove `id` unless it is protected
    pub fn remove(&mut self, id: &str) -> Result<E, StoreError> {
        let index = self
            .position(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if self.items[index].is_protected() {
            return Err(StoreError::ProtectedItem(id.to_string()));
        }
        Ok(self.items.remove(index))
    }

    /// Keep only entries matching `keep`; protected entries always stay.
    /// Returns the number removed.
    pub fn retain<P>(&mut self, keep: P) -> usize
    where
        P: Fn(&E) -> bool,
    {
        let before = self.items.len();
        self.items.retain(|item| item.is_protected() || keep(item));
        before - self.items.len()
    }

    /// Drop unprotected entries from the tail until the cap holds
    pub fn evict_overflow(&mut self) -> Vec<E> {
        let evicted = self.evict_from_tail(|_| true);
        if !evicted.is_empty() {
            debug!("Evicted {} items from '{}'", evicted.len(), self.key);
        }
        evicted
    }

    /// Like [`Collection::evict_overflow`], but entries matching `spare`
    /// are only evicted once nothing else is left to drop
    pub fn evict_overflow_sparing<P>(&mut self, spare: P) -> Vec<E>
    where
        P: Fn(&E) -> bool,
    {
        let mut evicted = self.evict_from_tail(|item| !spare(item));
        evicted.extend(self.evict_from_tail(|_| true));
        if !evicted.is_empty() {
            debug!("Evicted {} items from '{}'", evicted.len(), self.key);
        }
        evicted
    }

    fn evict_from_tail<P>(&mut self, candidate: P) -> Vec<E>
    where
        P: Fn(&E) -> bool,
    {
        let mut evicted = Vec::new();
        while self.items.len() > self.max_items {
            let Some(index) = self
                .items
                .iter()
                .rposition(|item| !item.is_protected() && candidate(item))
            else {
                break;
            };
            evicted.push(self.items.remove(index));
        }
        evicted
    }

    /// Receive change events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Publish an event; dropped silently when nobody listens
    pub fn notify(&self, event: StoreEvent) {
        let _ = self.events.send(event);
    }
}

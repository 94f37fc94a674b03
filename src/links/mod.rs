//! Quick links: bookmarked URLs ranked by how often they are opened
//!
//! A fresh store is seeded with a fixed set of default links. Defaults can
//! be opened (which counts) but never edited or deleted.

pub mod defaults;

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Map;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::collection::{
    contains_ignore_case, now_millis, snapshot, Collection, Entry, StoreError, StoreEvent,
};
use crate::config::LinksConfig;
use crate::storage::KeyValueStore;

pub use defaults::default_links;

/// Storage key of the link list
pub const LINKS_KEY: &str = "quickLinks";

/// Icon of links added without one
pub const DEFAULT_ICON: &str = "🔗";

/// Category of a link
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LinkCategory {
    Education,
    Development,
    Communication,
    Design,
    Productivity,
    Entertainment,
    #[default]
    Custom,
}

impl LinkCategory {
    pub const ALL: [LinkCategory; 7] = [
        LinkCategory::Education,
        LinkCategory::Development,
        LinkCategory::Communication,
        LinkCategory::Design,
        LinkCategory::Productivity,
        LinkCategory::Entertainment,
        LinkCategory::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkCategory::Education => "education",
            LinkCategory::Development => "development",
            LinkCategory::Communication => "communication",
            LinkCategory::Design => "design",
            LinkCategory::Productivity => "productivity",
            LinkCategory::Entertainment => "entertainment",
            LinkCategory::Custom => "custom",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            LinkCategory::Education => "🎓",
            LinkCategory::Development => "💻",
            LinkCategory::Communication => "💬",
            LinkCategory::Design => "🎨",
            LinkCategory::Productivity => "📝",
            LinkCategory::Entertainment => "📺",
            LinkCategory::Custom => "🔗",
        }
    }
}

impl fmt::Display for LinkCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LinkCategory::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown link category '{}'", s))
    }
}

fn default_icon() -> String {
    DEFAULT_ICON.to_string()
}

/// A bookmarked URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default)]
    pub category: LinkCategory,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<i64>,
    #[serde(default, alias = "clickCount")]
    pub usage_count: u64,
}

impl Entry for Link {
    fn id(&self) -> &str {
        &self.id
    }

    fn usage_count(&self) -> u64 {
        self.usage_count
    }

    fn record_use(&mut self, now: i64) {
        self.usage_count += 1;
        self.last_used_at = Some(now);
    }

    fn is_protected(&self) -> bool {
        self.is_default
    }
}

/// Input for [`LinkStore::add`]
#[derive(Debug, Clone, Default)]
pub struct NewLink {
    pub name: String,
    pub url: String,
    pub icon: Option<String>,
    pub category: Option<LinkCategory>,
}

/// Partial update for [`LinkStore::update`]; `None` leaves a field as is
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkPatch {
    pub name: Option<String>,
    pub url: Option<String>,
    pub icon: Option<String>,
    pub category: Option<LinkCategory>,
    pub usage_count: Option<u64>,
    pub last_used_at: Option<i64>,
}

impl LinkPatch {
    /// Whether the patch changes anything besides usage metadata
    pub fn touches_content(&self) -> bool {
        self.name.is_some() || self.url.is_some() || self.icon.is_some() || self.category.is_some()
    }
}

/// Link counts for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkStats {
    pub total: usize,
    /// Links that are not defaults
    pub custom: usize,
}

/// Prefix `https://` unless the URL already has an http(s) scheme
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

fn required(field: &str, value: &str) -> Result<String, StoreError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(StoreError::InvalidInput(format!("link {} is empty", field)));
    }
    Ok(value.to_string())
}

/// Ranking used by search: most used first, then by name
fn by_usage_then_name(a: &Link, b: &Link) -> Ordering {
    b.usage_count
        .cmp(&a.usage_count)
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
}

/// Quick links store
pub struct LinkStore {
    links: Collection<Link>,
}

impl LinkStore {
    /// Create an empty store; call [`LinkStore::initialize`] to load it
    pub fn new(backend: Arc<dyn KeyValueStore>, config: &LinksConfig) -> Self {
        Self {
            links: Collection::new(LINKS_KEY, backend, config.max_items),
        }
    }

    /// Load persisted links, seeding the defaults on first launch.
    ///
    /// Never fails: unreadable state is logged and replaced by the defaults.
    pub async fn initialize(&mut self) {
        match self.links.load().await {
            Ok(Some(links)) if !links.is_empty() => {
                self.links.replace_all(links);
                if !self.links.evict_overflow().is_empty() {
                    if let Err(e) = self.links.persist().await {
                        warn!("Failed to save links after trimming: {}", e);
                    }
                }
            }
            Ok(_) => {
                self.links.replace_all(default_links());
                if let Err(e) = self.links.persist().await {
                    warn!("Failed to save default links: {}", e);
                }
            }
            Err(e) => {
                warn!("Failed to load links, using defaults: {}", e);
                self.links.replace_all(default_links());
            }
        }
        info!("Quick links initialized with {} links", self.links.len());
    }

    /// Links in storage order
    pub fn links(&self) -> &[Link] {
        self.links.items()
    }

    pub fn get(&self, id: &str) -> Option<&Link> {
        self.links.get(id)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Add a custom link at the front
    pub async fn add(&mut self, new_link: NewLink) -> Result<Link, StoreError> {
        let name = required("name", &new_link.name)?;
        let url = normalize_url(&required("url", &new_link.url)?);

        let link = Link {
            id: format!("link-{}", Uuid::new_v4().simple()),
            name,
            url,
            icon: new_link
                .icon
                .filter(|icon| !icon.trim().is_empty())
                .unwrap_or_else(default_icon),
            category: new_link.category.unwrap_or_default(),
            is_default: false,
            created_at: Some(now_millis()),
            last_used_at: None,
            usage_count: 0,
        };
        debug!("New link {} -> {}", link.id, link.url);

        self.links.push_front(link.clone());
        self.links.evict_overflow();
        self.links.persist().await?;
        self.links.notify(StoreEvent::Added(link.id.clone()));
        Ok(link)
    }

    /// Count an open of `id` and return the link to navigate to
    pub async fn open(&mut self, id: &str) -> Result<Link, StoreError> {
        let link = self.links.record_use(id, now_millis())?.clone();
        self.links.persist().await?;
        self.links.notify(StoreEvent::Updated(link.id.clone()));
        Ok(link)
    }

    /// Apply `patch` to `id`. Default links only accept usage metadata.
    pub async fn update(&mut self, id: &str, patch: LinkPatch) -> Result<Link, StoreError> {
        let link = self
            .links
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if link.is_default && patch.touches_content() {
            warn!("Refusing to modify default link {}", id);
            return Err(StoreError::ProtectedItem(id.to_string()));
        }
        if patch.usage_count.is_some_and(|count| count < link.usage_count) {
            return Err(StoreError::InvalidInput(
                "usage count cannot decrease".to_string(),
            ));
        }

        let mut updated = link.clone();
        if let Some(name) = &patch.name {
            updated.name = required("name", name)?;
        }
        if let Some(url) = &patch.url {
            updated.url = normalize_url(&required("url", url)?);
        }
        if let Some(icon) = patch.icon {
            updated.icon = icon;
        }
        if let Some(category) = patch.category {
            updated.category = category;
        }
        if let Some(count) = patch.usage_count {
            updated.usage_count = count;
        }
        if let Some(at) = patch.last_used_at {
            updated.last_used_at = Some(at);
        }

        if let Some(slot) = self.links.get_mut(id) {
            *slot = updated.clone();
        }
        self.links.persist().await?;
        self.links.notify(StoreEvent::Updated(updated.id.clone()));
        Ok(updated)
    }

    /// Delete a custom link
    pub async fn delete(&mut self, id: &str) -> Result<Link, StoreError> {
        let link = self.links.remove(id).inspect_err(|e| {
            if matches!(e, StoreError::ProtectedItem(_)) {
                warn!("Refusing to delete default link {}", id);
            }
        })?;
        self.links.persist().await?;
        self.links.notify(StoreEvent::Removed(link.id.clone()));
        Ok(link)
    }

    /// Delete every custom link, returning how many were removed
    pub async fn clear(&mut self) -> Result<usize, StoreError> {
        let removed = self.links.retain(|_| false);
        self.links.persist().await?;
        self.links.notify(StoreEvent::Cleared);
        info!("Cleared {} custom links", removed);
        Ok(removed)
    }

    /// Filter by text and category, most used first.
    ///
    /// An empty query matches everything; otherwise the query must appear
    /// (case-insensitively) in the name, the URL or the category name.
    pub fn search(&self, query: &str, category: Option<LinkCategory>) -> Vec<&Link> {
        let needle = query.trim().to_lowercase();
        let mut results: Vec<&Link> = self
            .links
            .items()
            .iter()
            .filter(|link| category.map_or(true, |c| link.category == c))
            .filter(|link| {
                needle.is_empty()
                    || contains_ignore_case(&link.name, &needle)
                    || contains_ignore_case(&link.url, &needle)
                    || link.category.as_str().contains(needle.as_str())
            })
            .collect();
        results.sort_by(|a, b| by_usage_then_name(a, b));
        results
    }

    /// Categories in use, sorted by name
    pub fn categories(&self) -> Vec<LinkCategory> {
        let names: BTreeSet<&'static str> = self
            .links
            .items()
            .iter()
            .map(|link| link.category.as_str())
            .collect();
        names
            .into_iter()
            .filter_map(|name| name.parse().ok())
            .collect()
    }

    pub fn stats(&self) -> LinkStats {
        let total = self.links.len();
        let defaults = self.links.items().iter().filter(|l| l.is_default).count();
        LinkStats {
            total,
            custom: total - defaults,
        }
    }

    /// Total opens across all links
    pub fn total_opens(&self) -> u64 {
        self.links.items().iter().map(Entry::usage_count).sum()
    }

    /// Discard every link and reseed the defaults
    pub async fn reset_to_defaults(&mut self) -> Result<(), StoreError> {
        self.links.replace_all(default_links());
        self.links.persist().await?;
        self.links.notify(StoreEvent::Reset);
        info!("Quick links reset to defaults");
        Ok(())
    }

    /// Export links as JSON text
    pub fn export_snapshot(&self) -> Result<String, StoreError> {
        snapshot::encode(self.links.items(), &Map::new())
    }

    /// Append imported links after the current ones.
    ///
    /// Imported ids are kept; links whose id is already present are
    /// skipped. Only the built-in ids may be marked as defaults. At capacity
    /// the oldest existing custom links make room before imported ones.
    /// Returns the number of links kept; on malformed input the store is
    /// untouched.
    pub async fn import_snapshot(&mut self, text: &str) -> Result<usize, StoreError> {
        let snapshot = snapshot::decode::<Link>(text)?;

        let mut imported: Vec<Link> = Vec::new();
        for mut link in snapshot.items {
            if link.name.trim().is_empty() || link.url.trim().is_empty() {
                return Err(StoreError::MalformedImport(format!(
                    "link '{}' has an empty name or url",
                    link.id
                )));
            }
            if self.links.contains_id(&link.id) || imported.iter().any(|l| l.id == link.id) {
                debug!("Skipping duplicate link {} on import", link.id);
                continue;
            }
            link.url = normalize_url(&link.url);
            link.is_default = link.is_default && defaults::is_default_id(&link.id);
            imported.push(link);
        }

        let imported_ids: HashSet<String> = imported.iter().map(|l| l.id.clone()).collect();
        self.links.extend(imported);
        let evicted = self
            .links
            .evict_overflow_sparing(|link| imported_ids.contains(&link.id));
        let count = imported_ids.len() - evicted.iter().filter(|l| imported_ids.contains(&l.id)).count();

        self.links.persist().await?;
        self.links.notify(StoreEvent::Imported(count));
        info!("Imported {} links ({} evicted for capacity)", count, evicted.len());
        Ok(count)
    }

    /// Receive change events
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.links.subscribe()
    }
}

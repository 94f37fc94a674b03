//! Render-agnostic view models for clips and links
//!
//! Front ends render these instead of formatting store items themselves.

use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;

use crate::history::{Clip, ClipKind};
use crate::links::Link;

/// What activating a clip should do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipAction {
    /// Open the URL
    Open,
    /// Start an email to the address
    Email,
    /// Copy the content
    Copy,
}

impl ClipAction {
    pub fn for_kind(kind: ClipKind) -> Self {
        match kind {
            ClipKind::Url => ClipAction::Open,
            ClipKind::Email => ClipAction::Email,
            _ => ClipAction::Copy,
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            ClipAction::Open => "open link",
            ClipAction::Email => "send email",
            ClipAction::Copy => "copy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipView {
    pub id: String,
    pub preview: String,
    pub kind: ClipKind,
    pub icon: &'static str,
    pub age: String,
    pub usage_count: u64,
    pub action: ClipAction,
}

impl ClipView {
    pub fn new(clip: &Clip, now: DateTime<Local>) -> Self {
        Self {
            id: clip.id.clone(),
            preview: clip.preview.clone(),
            kind: clip.kind,
            icon: clip.kind.icon(),
            age: format_age(clip.last_used_at, now),
            usage_count: clip.usage_count,
            action: ClipAction::for_kind(clip.kind),
        }
    }

    /// Target of the clip's action: the URL, a `mailto:` link or the text
    pub fn action_target(clip: &Clip) -> String {
        match ClipAction::for_kind(clip.kind) {
            ClipAction::Email => format!("mailto:{}", clip.content),
            _ => clip.content.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkView {
    pub id: String,
    pub name: String,
    pub url: String,
    pub icon: String,
    pub category_icon: &'static str,
    pub usage_count: u64,
    pub is_default: bool,
}

impl From<&Link> for LinkView {
    fn from(link: &Link) -> Self {
        Self {
            id: link.id.clone(),
            name: link.name.clone(),
            url: link.url.clone(),
            icon: link.icon.clone(),
            category_icon: link.category.icon(),
            usage_count: link.usage_count,
            is_default: link.is_default,
        }
    }
}

/// Short relative age: `just now`, `5m`, `3h`, or the date
pub fn format_age(timestamp_ms: i64, now: DateTime<Local>) -> String {
    let diff = now.timestamp_millis() - timestamp_ms;
    if diff < 60_000 {
        "just now".to_string()
    } else if diff < 3_600_000 {
        format!("{}m", diff / 60_000)
    } else if diff < 86_400_000 {
        format!("{}h", diff / 3_600_000)
    } else {
        match Local.timestamp_millis_opt(timestamp_ms).single() {
            Some(date) => date.format("%Y-%m-%d").to_string(),
            None => "unknown".to_string(),
        }
    }
}

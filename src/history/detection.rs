//! Content type detection for clipboard text
//!
//! Checks run in a fixed order and the first match wins, so a URL that is
//! also valid JSON (`"https://..."` with quotes is JSON, without is a URL)
//! always resolves the same way.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static URL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^https?://.+").unwrap());

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

static HTML_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Source-code heuristics: function/class declarations, imports, variable
/// declarations and conditional blocks
static CODE_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"function\s+\w+\s*\(",
        r"class\s+\w+",
        r"import\s+.+from",
        r"const\s+\w+\s*=",
        r"if\s*\(.+\)\s*\{",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Category of a clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipKind {
    Text,
    Url,
    Email,
    Json,
    Html,
    Code,
}

impl ClipKind {
    pub const ALL: [ClipKind; 6] = [
        ClipKind::Text,
        ClipKind::Url,
        ClipKind::Email,
        ClipKind::Json,
        ClipKind::Html,
        ClipKind::Code,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClipKind::Text => "text",
            ClipKind::Url => "url",
            ClipKind::Email => "email",
            ClipKind::Json => "json",
            ClipKind::Html => "html",
            ClipKind::Code => "code",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            ClipKind::Text => "📝",
            ClipKind::Url => "🔗",
            ClipKind::Email => "📧",
            ClipKind::Json => "🔧",
            ClipKind::Html => "🌐",
            ClipKind::Code => "💻",
        }
    }
}

impl fmt::Display for ClipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClipKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClipKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown clip type '{}'", s))
    }
}

fn is_json(text: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(text).is_ok()
}

fn is_code(text: &str) -> bool {
    CODE_REGEXES.iter().any(|re| re.is_match(text))
}

/// Classify clipboard text
pub fn classify(text: &str) -> ClipKind {
    if URL_REGEX.is_match(text) {
        ClipKind::Url
    } else if EMAIL_REGEX.is_match(text) {
        ClipKind::Email
    } else if is_json(text) {
        ClipKind::Json
    } else if HTML_REGEX.is_match(text) {
        ClipKind::Html
    } else if is_code(text) {
        ClipKind::Code
    } else {
        ClipKind::Text
    }
}

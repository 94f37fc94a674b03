//! System clipboard access
//!
//! Stores never touch the clipboard themselves. Front ends hand a
//! [`ClipboardSource`] to [`ClipHistory::capture`](crate::history::ClipHistory::capture)
//! to record what is currently copied, and write a clip back after
//! [`ClipHistory::copy`](crate::history::ClipHistory::copy).

use async_trait::async_trait;
use thiserror::Error;

/// Maximum clipboard text accepted (5MB)
pub const MAX_CLIPBOARD_SIZE: usize = 5 * 1024 * 1024;

/// Clipboard operation errors
#[derive(Debug, Error)]
pub enum ClipboardError {
    /// Clipboard could not be opened on this system
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),

    /// Reading or writing failed
    #[error("Clipboard access failed: {0}")]
    Access(String),

    /// Content exceeds [`MAX_CLIPBOARD_SIZE`]
    #[error("Clipboard content too large: {0} bytes")]
    TooLarge(usize),

    /// Blocking clipboard task panicked or was cancelled
    #[error("Clipboard task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Text clipboard capability
#[async_trait]
pub trait ClipboardSource: Send + Sync {
    /// Current clipboard text, empty when it holds no text
    async fn read_text(&self) -> Result<String, ClipboardError>;

    /// Replace the clipboard text
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;

    /// Provider name, for logs
    fn name(&self) -> &str;
}

/// The desktop clipboard, through `arboard`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl SystemClipboard {
    pub fn new() -> Self {
        Self
    }

    fn open() -> Result<arboard::Clipboard, ClipboardError> {
        arboard::Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl ClipboardSource for SystemClipboard {
    async fn read_text(&self) -> Result<String, ClipboardError> {
        let text = tokio::task::spawn_blocking(|| {
            let mut clipboard = Self::open()?;
            match clipboard.get_text() {
                Ok(text) => Ok(text),
                Err(arboard::Error::ContentNotAvailable) => Ok(String::new()),
                Err(e) => Err(ClipboardError::Access(e.to_string())),
            }
        })
        .await??;

        if text.len() > MAX_CLIPBOARD_SIZE {
            return Err(ClipboardError::TooLarge(text.len()));
        }
        Ok(text)
    }

    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        if text.len() > MAX_CLIPBOARD_SIZE {
            return Err(ClipboardError::TooLarge(text.len()));
        }

        let text = text.to_string();
        tokio::task::spawn_blocking(move || {
            let mut clipboard = Self::open()?;
            clipboard
                .set_text(text)
                .map_err(|e| ClipboardError::Access(e.to_string()))
        })
        .await?
    }

    fn name(&self) -> &str {
        "system"
    }
}

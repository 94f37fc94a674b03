//! # ClipDeck
//!
//! Clipboard history and quick links for a productivity dashboard.
//!
//! Both stores are built on one generic [`collection::Collection`]: an
//! ordered, capped list of items persisted as JSON through a pluggable
//! [`storage::KeyValueStore`]. Front ends (the CLI, a browser extension
//! talking through [`router::MessageRouter`]) render [`view`] models.

pub mod cli;
pub mod clipboard;
pub mod collection;
pub mod config;
pub mod history;
pub mod links;
pub mod router;
pub mod storage;
pub mod view;

pub use config::Config;

/// Result type alias for ClipDeck operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for ClipDeck operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Persistence backend error
    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    /// Store operation error
    #[error(transparent)]
    Store(#[from] collection::StoreError),

    /// Clipboard operation error
    #[error("Clipboard error: {0}")]
    Clipboard(#[from] clipboard::ClipboardError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

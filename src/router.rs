//! JSON message routing into the clip store
//!
//! Other processes (a browser extension's background script, a hotkey
//! daemon) talk to the clip history with small JSON messages:
//!
//! ```json
//! {"action": "addItem", "value": "text to remember"}
//! {"action": "listItems"}
//! {"action": "clearAll"}
//! {"action": "readClipboard"}
//! ```
//!
//! Every request gets a [`Response`]; failures are reported in the
//! response, never raised.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::clipboard::ClipboardSource;
use crate::history::{Clip, ClipHistory};

/// Incoming request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    /// Add text to history
    #[serde(alias = "newClip")]
    AddItem {
        #[serde(alias = "content")]
        value: String,
    },

    /// Return the current history
    #[serde(alias = "getClips")]
    ListItems,

    /// Remove every removable item
    #[serde(alias = "clearClips")]
    ClearAll,

    /// Capture the system clipboard now
    ReadClipboard,
}

/// Outgoing response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Clip>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Clip>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    fn failure(error: impl ToString) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Self::default()
        }
    }
}

/// Dispatches requests to a shared [`ClipHistory`]
#[derive(Clone)]
pub struct MessageRouter {
    history: Arc<Mutex<ClipHistory>>,
    clipboard: Option<Arc<dyn ClipboardSource>>,
}

impl MessageRouter {
    pub fn new(history: Arc<Mutex<ClipHistory>>) -> Self {
        Self {
            history,
            clipboard: None,
        }
    }

    /// Enable `readClipboard` requests
    pub fn with_clipboard(mut self, clipboard: Arc<dyn ClipboardSource>) -> Self {
        self.clipboard = Some(clipboard);
        self
    }

    pub async fn handle(&self, request: Request) -> Response {
        debug!("Routing {:?}", request);
        let mut history = self.history.lock().await;

        match request {
            Request::AddItem { value } => match history.add(&value, None).await {
                Ok(clip) => Response {
                    item: Some(clip),
                    count: Some(history.len()),
                    ..Response::ok()
                },
                Err(e) => Response::failure(e),
            },
            Request::ListItems => Response {
                count: Some(history.len()),
                items: Some(history.clips().to_vec()),
                ..Response::ok()
            },
            Request::ClearAll => match history.clear().await {
                Ok(removed) => Response {
                    count: Some(removed),
                    ..Response::ok()
                },
                Err(e) => Response::failure(e),
            },
            Request::ReadClipboard => {
                let Some(clipboard) = &self.clipboard else {
                    return Response::failure("no clipboard source configured");
                };
                match history.capture(clipboard.as_ref()).await {
                    Ok(item) => Response {
                        item,
                        count: Some(history.len()),
                        ..Response::ok()
                    },
                    Err(e) => Response::failure(e),
                }
            }
        }
    }

    /// Decode a JSON request, handle it and encode the response
    pub async fn handle_json(&self, raw: &str) -> String {
        let response = match serde_json::from_str::<Request>(raw) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                warn!("Rejected malformed message: {}", e);
                Response::failure(format!("invalid request: {}", e))
            }
        };

        serde_json::to_string(&response)
            .unwrap_or_else(|e| format!(r#"{{"success":false,"error":"{}"}}"#, e))
    }
}

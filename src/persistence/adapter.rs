//! Whole-list persistence of conversations in a single slot.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::chat::errors::{ChatError, ChatResult};
use crate::chat::types::Conversation;

use super::slot_store::SlotStore;

/// Slot key holding the conversation list.
pub const CONVERSATIONS_KEY: &str = "conversations";

/// Reads and writes the full conversation list as one JSON blob.
#[derive(Clone)]
pub struct PersistenceAdapter {
    slots: Arc<dyn SlotStore>,
    key: String,
}

impl PersistenceAdapter {
    /// Persist under the default key.
    #[must_use]
    pub fn new(slots: Arc<dyn SlotStore>) -> Self {
        Self {
            slots,
            key: CONVERSATIONS_KEY.to_string(),
        }
    }

    /// Load the stored list.
    ///
    /// Absent, empty, or unreadable-shape data yields an empty list. Loaded
    /// conversations are stripped of session-only state.
    ///
    /// # Errors
    /// Returns `StorageUnavailable` if the slot cannot be read.
    pub async fn load(&self) -> ChatResult<Vec<Conversation>> {
        let Some(raw) = self.slots.read(&self.key).await? else {
            debug!("No stored conversations");
            return Ok(Vec::new());
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Vec<Conversation>>(&raw) {
            Ok(mut conversations) => {
                conversations.iter_mut().for_each(Conversation::normalize_loaded);
                debug!("Loaded {} conversations", conversations.len());
                Ok(conversations)
            }
            Err(err) => {
                warn!("Stored conversations are unreadable, starting fresh: {err}");
                Ok(Vec::new())
            }
        }
    }

    /// Overwrite the stored list.
    ///
    /// # Errors
    /// Returns `StorageUnavailable` if the slot cannot be written.
    pub async fn save(&self, conversations: &[Conversation]) -> ChatResult<()> {
        let blob = serde_json::to_string(conversations)?;
        self.slots
            .write(&self.key, blob)
            .await
            .map_err(|err| match err {
                ChatError::StorageUnavailable(_) => err,
                other => ChatError::StorageUnavailable(other.to_string()),
            })
    }
}

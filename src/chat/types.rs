//! Conversation and message types.

use serde::{Deserialize, Serialize};

use super::ids::{ConversationId, RequestId};

/// Title given to every new conversation.
pub const DEFAULT_TITLE: &str = "New Chat";

/// Number of characters kept when deriving a title from the first prompt.
pub const TITLE_MAX_CHARS: usize = 25;

/// Marker appended to a truncated derived title.
pub const TITLE_ELLIPSIS: &str = "…";

/// Display text of a placeholder awaiting its reply.
pub const PENDING_CONTENT: &str = "…";

/// Author of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed by the user.
    User,
    /// Produced by the model or the fallback responder.
    Ai,
}

impl Role {
    /// Stable lowercase name, also used as the CSS class.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Ai => "ai",
        }
    }
}

/// One entry of a conversation log.
///
/// A placeholder can never be mistaken for real content: it carries only
/// its typing id until it is replaced by a [`Message::Settled`] entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredMessage", into = "StoredMessage")]
pub enum Message {
    /// A prompt sent by the user.
    Sent {
        /// Prompt text.
        content: String,
    },
    /// A reply that has not arrived yet.
    Pending {
        /// Identifier of the request this placeholder waits for.
        typing_id: RequestId,
    },
    /// A reply from the model or the fallback responder.
    Settled {
        /// Reply text.
        content: String,
    },
}

impl Message {
    /// Role shown for this entry.
    #[must_use]
    pub const fn role(&self) -> Role {
        match self {
            Self::Sent { .. } => Role::User,
            Self::Pending { .. } | Self::Settled { .. } => Role::Ai,
        }
    }

    /// Display text.
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::Sent { content } | Self::Settled { content } => content,
            Self::Pending { .. } => PENDING_CONTENT,
        }
    }

    /// Typing id when this is a placeholder.
    #[must_use]
    pub const fn typing_id(&self) -> Option<RequestId> {
        match self {
            Self::Pending { typing_id } => Some(*typing_id),
            _ => None,
        }
    }
}

/// Persisted message record: `{role, content, typingId?}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredMessage {
    role: Role,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typing_id: Option<RequestId>,
}

impl From<StoredMessage> for Message {
    fn from(stored: StoredMessage) -> Self {
        match (stored.role, stored.typing_id) {
            (Role::User, _) => Self::Sent {
                content: stored.content,
            },
            (Role::Ai, Some(typing_id)) => Self::Pending { typing_id },
            (Role::Ai, None) => Self::Settled {
                content: stored.content,
            },
        }
    }
}

impl From<Message> for StoredMessage {
    fn from(message: Message) -> Self {
        Self {
            role: message.role(),
            content: message.content().to_string(),
            typing_id: message.typing_id(),
        }
    }
}

/// A titled, ordered log of messages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Stable identifier.
    pub id: ConversationId,
    /// Display title.
    pub title: String,
    /// Message log in display order.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Set while the title is being renamed inline.
    #[serde(default, skip_serializing_if = "is_false")]
    pub editing: bool,
    /// Creation timestamp in milliseconds since Unix epoch.
    #[serde(default)]
    pub created_at: i64,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

impl Conversation {
    /// Create an empty conversation with the default title.
    #[must_use]
    pub fn new(created_at: i64) -> Self {
        Self {
            id: ConversationId::new(),
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            editing: false,
            created_at,
        }
    }

    /// Create an empty conversation stamped with the current time.
    #[must_use]
    pub fn fresh() -> Self {
        Self::new(chrono::Utc::now().timestamp_millis())
    }

    /// Whether the title is still the default one.
    #[must_use]
    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_TITLE
    }

    /// Typing id of the unresolved placeholder, if any.
    #[must_use]
    pub fn pending_request(&self) -> Option<RequestId> {
        self.messages.iter().find_map(Message::typing_id)
    }

    /// Whether a reply is still awaited.
    #[must_use]
    pub fn is_awaiting_reply(&self) -> bool {
        self.pending_request().is_some()
    }

    /// Append a user prompt, deriving the title if this is the first message.
    pub fn push_prompt(&mut self, text: &str) {
        self.messages.push(Message::Sent {
            content: text.to_string(),
        });
        if self.has_default_title() && self.messages.len() == 1 {
            self.title = derive_title(text);
        }
    }

    /// Append a placeholder and return its typing id.
    pub fn push_placeholder(&mut self) -> RequestId {
        let typing_id = RequestId::new();
        self.messages.push(Message::Pending { typing_id });
        typing_id
    }

    /// Replace the placeholder with `typing_id` by the settled reply.
    ///
    /// Returns `false` when no such placeholder exists.
    pub fn settle(&mut self, typing_id: RequestId, reply: String) -> bool {
        let slot = self
            .messages
            .iter_mut()
            .find(|m| m.typing_id() == Some(typing_id));

        match slot {
            Some(message) => {
                *message = Message::Settled { content: reply };
                true
            }
            None => false,
        }
    }

    /// Drop session-only state after loading from storage.
    ///
    /// No request survives a restart, so leftover placeholders are removed
    /// and inline editing is closed.
    pub fn normalize_loaded(&mut self) {
        self.messages
            .retain(|m| !matches!(m, Message::Pending { .. }));
        self.editing = false;
    }
}

/// Title derived from a first prompt.
#[must_use]
pub fn derive_title(text: &str) -> String {
    if text.chars().count() > TITLE_MAX_CHARS {
        let head: String = text.chars().take(TITLE_MAX_CHARS).collect();
        format!("{head}{TITLE_ELLIPSIS}")
    } else {
        text.to_string()
    }
}

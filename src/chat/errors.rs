//! Error types for the chat client.

use thiserror::Error;

use super::ids::ConversationId;

/// Chat client error type.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The inference endpoint answered with a non-2xx status.
    #[error("remote error {status}: {body}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },
    /// The inference endpoint answered 2xx with an error payload.
    #[error("remote reported an error: {0}")]
    RemoteReported(String),
    /// Transport-level HTTP failure.
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
    /// The remote call did not settle in time.
    #[error("remote request timed out")]
    Timeout,
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Local storage could not be read or written.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    /// No conversation with this id.
    #[error("conversation not found: {0}")]
    ConversationNotFound(ConversationId),
    /// The conversation already awaits a reply.
    #[error("conversation {0} is still waiting for a reply")]
    ReplyPending(ConversationId),
    /// A delete was attempted without the confirmation step.
    #[error("delete of conversation {0} was not confirmed")]
    DeleteNotConfirmed(ConversationId),
    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Invalid responder pattern.
    #[error("pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

impl From<tokio_rusqlite::Error> for ChatError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        Self::StorageUnavailable(err.to_string())
    }
}

impl ChatError {
    /// Whether this error came from the completion path.
    ///
    /// These are the errors the composer turns into a fallback reply.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Remote { .. }
                | Self::RemoteReported(_)
                | Self::Http(_)
                | Self::Timeout
                | Self::Serialization(_)
        )
    }
}

/// Convenience result alias for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;

//! Conversation state, transitions and reply orchestration.
//!
//! This module provides:
//! - Conversation and message types
//! - The in-memory conversation store
//! - The event-driven session state machine
//! - The composer (remote reply with rule-based fallback)
//! - Configuration and errors

pub mod composer;
pub mod config;
pub mod errors;
pub mod fallback;
pub mod ids;
pub mod session;
pub mod store;
pub mod types;

pub use composer::Composer;
pub use config::ChatConfig;
pub use errors::{ChatError, ChatResult};
pub use fallback::FallbackResponder;
pub use ids::{ConversationId, RequestId};
pub use session::{EditKey, Event, Session, Transition, ViewState};
pub use store::{ConversationStore, PendingReply};
pub use types::{Conversation, Message, Role};

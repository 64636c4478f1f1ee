//! Session state and the event-driven transition function.
//!
//! Every user interaction becomes an [`Event`] applied to a [`Session`].
//! `apply` only touches memory; the returned [`Transition`] tells the caller
//! whether to persist and whether a reply must be fetched.

use tracing::debug;

use super::errors::{ChatError, ChatResult};
use super::ids::{ConversationId, RequestId};
use super::store::{ConversationStore, PendingReply};
use super::types::Conversation;

/// Viewport width at or below which the sidebar starts collapsed.
pub const COLLAPSE_BREAKPOINT_PX: u32 = 600;

/// Presentation state that is never persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewState {
    /// Whether the sidebar is collapsed.
    pub sidebar_collapsed: bool,
    /// Whether the initial viewport width has been applied.
    pub viewport_measured: bool,
    /// Conversation awaiting delete confirmation.
    pub pending_delete: Option<ConversationId>,
    /// Non-fatal problem to show the user (e.g. storage failure).
    pub notice: Option<String>,
}

/// Key pressed inside the inline title editor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditKey {
    /// Confirms the rename.
    Enter,
    /// Cancels the rename.
    Escape,
    /// Any other key; no transition.
    Other,
}

impl EditKey {
    /// Map a DOM `KeyboardEvent.key` value.
    #[must_use]
    pub fn parse(key: &str) -> Self {
        match key {
            "Enter" => Self::Enter,
            "Escape" | "Esc" => Self::Escape,
            _ => Self::Other,
        }
    }
}

/// A user interaction or a settled reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Global new-conversation action.
    NewConversation,
    /// Row click.
    Select(ConversationId),
    /// Delete action; asks for confirmation.
    RequestDelete(ConversationId),
    /// Confirmation of a requested delete.
    ConfirmDelete(ConversationId),
    /// Confirmation dialog dismissed.
    DismissDelete,
    /// Rename action.
    StartEdit(ConversationId),
    /// Cancel button of the inline editor.
    CancelEdit(ConversationId),
    /// Confirm button of the inline editor.
    ConfirmEdit {
        /// Conversation being renamed.
        id: ConversationId,
        /// Raw field value.
        title: String,
    },
    /// Key pressed in the inline editor.
    EditKey {
        /// Conversation being renamed.
        id: ConversationId,
        /// Key pressed.
        key: EditKey,
        /// Raw field value at the time of the key press.
        title: String,
    },
    /// Composer submit into the current conversation.
    Submit(String),
    /// A reply (remote or fallback) is ready.
    Settle {
        /// Conversation captured at submit time.
        conversation_id: ConversationId,
        /// Placeholder to replace.
        typing_id: RequestId,
        /// Reply text.
        reply: String,
    },
    /// First measurement of the viewport width, in pixels.
    ViewportMeasured(u32),
    /// Manual sidebar toggle.
    ToggleSidebar,
}

/// Side effects requested by a transition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transition {
    /// The conversation list changed and must be written to storage.
    pub persist: bool,
    /// A reply must be fetched for this placeholder.
    pub dispatch: Option<PendingReply>,
}

impl Transition {
    const fn none() -> Self {
        Self {
            persist: false,
            dispatch: None,
        }
    }

    const fn persist() -> Self {
        Self {
            persist: true,
            dispatch: None,
        }
    }
}

/// Conversation store plus view state.
#[derive(Clone, Debug, Default)]
pub struct Session {
    store: ConversationStore,
    view: ViewState,
}

impl Session {
    /// Wrap a loaded store.
    #[must_use]
    pub fn new(store: ConversationStore) -> Self {
        Self {
            store,
            view: ViewState::default(),
        }
    }

    /// Read access to the conversations.
    #[must_use]
    pub const fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Read access to the view state.
    #[must_use]
    pub const fn view(&self) -> &ViewState {
        &self.view
    }

    /// Record a non-fatal problem for display.
    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.view.notice = Some(notice.into());
    }

    /// Clear the displayed problem.
    pub fn clear_notice(&mut self) {
        self.view.notice = None;
    }

    /// Fold conversations read late from storage into the store.
    pub fn merge_loaded(&mut self, loaded: Vec<Conversation>) {
        self.store.merge_loaded(loaded);
    }

    /// Apply one event.
    ///
    /// # Errors
    /// Returns `ConversationNotFound` for unknown ids, `ReplyPending` for a
    /// submit while a reply is awaited, and `DeleteNotConfirmed` for a
    /// confirmation that was never requested. State is unchanged on error.
    pub fn apply(&mut self, event: Event) -> ChatResult<Transition> {
        debug!(?event, "Applying event");
        match event {
            Event::NewConversation => {
                self.store.create();
                Ok(Transition::persist())
            }
            Event::Select(id) => {
                self.store.select(id)?;
                Ok(Transition::none())
            }
            Event::RequestDelete(id) => {
                if !self.store.contains(id) {
                    return Err(ChatError::ConversationNotFound(id));
                }
                self.view.pending_delete = Some(id);
                Ok(Transition::none())
            }
            Event::ConfirmDelete(id) => {
                if self.view.pending_delete != Some(id) {
                    return Err(ChatError::DeleteNotConfirmed(id));
                }
                self.view.pending_delete = None;
                self.store.delete(id)?;
                Ok(Transition::persist())
            }
            Event::DismissDelete => {
                self.view.pending_delete = None;
                Ok(Transition::none())
            }
            Event::StartEdit(id) => {
                self.store.start_edit(id)?;
                Ok(Transition::none())
            }
            Event::CancelEdit(id) => {
                self.store.cancel_edit(id)?;
                Ok(Transition::none())
            }
            Event::ConfirmEdit { id, title } => {
                self.store.rename(id, &title)?;
                Ok(Transition::persist())
            }
            Event::EditKey { id, key, title } => match key {
                EditKey::Enter => self.apply(Event::ConfirmEdit { id, title }),
                EditKey::Escape => self.apply(Event::CancelEdit(id)),
                EditKey::Other => Ok(Transition::none()),
            },
            Event::Submit(text) => {
                let current = self.store.current_id();
                match self.store.begin_submit(current, &text)? {
                    Some(pending) => Ok(Transition {
                        persist: true,
                        dispatch: Some(pending),
                    }),
                    None => Ok(Transition::none()),
                }
            }
            Event::Settle {
                conversation_id,
                typing_id,
                reply,
            } => {
                if self.store.settle(conversation_id, typing_id, reply) {
                    Ok(Transition::persist())
                } else {
                    debug!("Reply {typing_id} has no placeholder left in {conversation_id}");
                    Ok(Transition::none())
                }
            }
            Event::ViewportMeasured(width) => {
                if !self.view.viewport_measured {
                    self.view.viewport_measured = true;
                    self.view.sidebar_collapsed = width <= COLLAPSE_BREAKPOINT_PX;
                }
                Ok(Transition::none())
            }
            Event::ToggleSidebar => {
                self.view.sidebar_collapsed = !self.view.sidebar_collapsed;
                Ok(Transition::none())
            }
        }
    }
}

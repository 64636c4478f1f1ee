//! In-memory conversation store.
//!
//! Holds the ordered conversation list and the current id. The list is
//! never empty and the current id always names a conversation in it.

use tracing::debug;

use super::errors::{ChatError, ChatResult};
use super::ids::{ConversationId, RequestId};
use super::types::Conversation;

/// A reply the composer still has to fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingReply {
    /// Conversation captured at submit time.
    pub conversation_id: ConversationId,
    /// Typing id of the placeholder to replace.
    pub typing_id: RequestId,
    /// Trimmed prompt text.
    pub prompt: String,
}

/// Ordered conversations plus the current selection.
#[derive(Clone, Debug)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    current: ConversationId,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    /// Create a store holding one fresh conversation.
    #[must_use]
    pub fn new() -> Self {
        let first = Conversation::fresh();
        let current = first.id;
        Self {
            conversations: vec![first],
            current,
        }
    }

    /// Build a store from loaded conversations.
    ///
    /// The first conversation becomes current; an empty list yields a fresh one.
    #[must_use]
    pub fn from_conversations(conversations: Vec<Conversation>) -> Self {
        match conversations.first().map(|c| c.id) {
            Some(current) => Self {
                conversations,
                current,
            },
            None => Self::new(),
        }
    }

    /// All conversations in display order.
    #[must_use]
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Identifier of the current conversation.
    #[must_use]
    pub const fn current_id(&self) -> ConversationId {
        self.current
    }

    /// The current conversation.
    #[must_use]
    pub fn current(&self) -> &Conversation {
        // The invariant guarantees a hit; index 0 is the unreachable fallback.
        self.get(self.current)
            .unwrap_or_else(|| &self.conversations[0])
    }

    /// Look up a conversation.
    #[must_use]
    pub fn get(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    /// Whether a conversation exists.
    #[must_use]
    pub fn contains(&self, id: ConversationId) -> bool {
        self.get(id).is_some()
    }

    fn get_mut(&mut self, id: ConversationId) -> ChatResult<&mut Conversation> {
        self.conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(ChatError::ConversationNotFound(id))
    }

    /// Insert a fresh conversation at the front and make it current.
    pub fn create(&mut self) -> ConversationId {
        let conversation = Conversation::fresh();
        let id = conversation.id;
        self.conversations.insert(0, conversation);
        self.current = id;
        debug!("Created conversation {id}");
        id
    }

    /// Fold conversations read late from storage into the list.
    ///
    /// Blank conversations other than the current one are dropped; the
    /// loaded conversations follow those created in this session.
    pub fn merge_loaded(&mut self, loaded: Vec<Conversation>) {
        let current = self.current;
        self.conversations
            .retain(|c| c.id == current || !c.messages.is_empty() || !c.has_default_title());
        for conversation in loaded {
            if !self.contains(conversation.id) {
                self.conversations.push(conversation);
            }
        }
        debug!("Merged stored conversations, now {}", self.conversations.len());
    }

    /// Make `id` the current conversation.
    ///
    /// # Errors
    /// Returns `ConversationNotFound` and leaves the selection unchanged if
    /// `id` does not exist.
    pub fn select(&mut self, id: ConversationId) -> ChatResult<()> {
        if !self.contains(id) {
            return Err(ChatError::ConversationNotFound(id));
        }
        self.current = id;
        debug!("Selected conversation {id}");
        Ok(())
    }

    /// Remove a conversation.
    ///
    /// If it was current, the new first conversation becomes current; if the
    /// list becomes empty a fresh conversation is created.
    ///
    /// # Errors
    /// Returns `ConversationNotFound` if `id` does not exist.
    pub fn delete(&mut self, id: ConversationId) -> ChatResult<()> {
        let idx = self
            .conversations
            .iter()
            .position(|c| c.id == id)
            .ok_or(ChatError::ConversationNotFound(id))?;

        self.conversations.remove(idx);
        debug!("Deleted conversation {id}");

        if self.conversations.is_empty() {
            self.create();
        } else if self.current == id {
            self.current = self.conversations[0].id;
        }
        Ok(())
    }

    /// Open inline renaming.
    ///
    /// # Errors
    /// Returns `ConversationNotFound` if `id` does not exist.
    pub fn start_edit(&mut self, id: ConversationId) -> ChatResult<()> {
        self.get_mut(id)?.editing = true;
        Ok(())
    }

    /// Close inline renaming without changing the title.
    ///
    /// # Errors
    /// Returns `ConversationNotFound` if `id` does not exist.
    pub fn cancel_edit(&mut self, id: ConversationId) -> ChatResult<()> {
        self.get_mut(id)?.editing = false;
        Ok(())
    }

    /// Rename a conversation and close inline renaming.
    ///
    /// The title is trimmed; blank input keeps the previous title.
    ///
    /// # Errors
    /// Returns `ConversationNotFound` if `id` does not exist.
    pub fn rename(&mut self, id: ConversationId, title: &str) -> ChatResult<()> {
        let conversation = self.get_mut(id)?;
        let trimmed = title.trim();
        if !trimmed.is_empty() {
            conversation.title = trimmed.to_string();
        }
        conversation.editing = false;
        Ok(())
    }

    /// Append a prompt and its placeholder.
    ///
    /// Returns `None` for blank input.
    ///
    /// # Errors
    /// Returns `ConversationNotFound` if `id` does not exist, or
    /// `ReplyPending` if the conversation still awaits a reply.
    pub fn begin_submit(
        &mut self,
        id: ConversationId,
        text: &str,
    ) -> ChatResult<Option<PendingReply>> {
        let prompt = text.trim();
        if prompt.is_empty() {
            return Ok(None);
        }

        let conversation = self.get_mut(id)?;
        if conversation.is_awaiting_reply() {
            return Err(ChatError::ReplyPending(id));
        }

        conversation.push_prompt(prompt);
        let typing_id = conversation.push_placeholder();

        Ok(Some(PendingReply {
            conversation_id: id,
            typing_id,
            prompt: prompt.to_string(),
        }))
    }

    /// Replace a placeholder in the captured conversation.
    ///
    /// Returns `false` if the conversation was deleted meanwhile or the
    /// placeholder was already settled.
    pub fn settle(
        &mut self,
        conversation_id: ConversationId,
        typing_id: RequestId,
        reply: String,
    ) -> bool {
        match self.get_mut(conversation_id) {
            Ok(conversation) => conversation.settle(typing_id, reply),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::types::{DEFAULT_TITLE, Role};

    fn assert_invariants(store: &ConversationStore) {
        assert!(!store.conversations().is_empty());
        assert!(store.contains(store.current_id()));
    }

    #[test]
    fn test_merge_loaded_keeps_session_work_and_drops_blank_start() {
        let stored: Vec<Conversation> = (1..=3).map(Conversation::new).collect();
        let stored_ids: Vec<_> = stored.iter().map(|c| c.id).collect();

        let mut store = ConversationStore::new();
        let blank = store.current_id();
        let created = store.create();
        store.merge_loaded(stored.clone());

        assert!(!store.contains(blank));
        assert_eq!(store.current_id(), created);
        assert_eq!(store.conversations().len(), 4);
        assert_eq!(store.conversations()[0].id, created);
        for id in stored_ids {
            assert!(store.contains(id));
        }

        store.merge_loaded(stored);
        assert_eq!(store.conversations().len(), 4);
        assert_invariants(&store);
    }

    #[test]
    fn test_new_store_has_one_current_conversation() {
        let store = ConversationStore::new();
        assert_eq!(store.conversations().len(), 1);
        assert_eq!(store.current().title, DEFAULT_TITLE);
        assert_invariants(&store);
    }

    #[test]
    fn test_create_inserts_at_front_and_selects() {
        let mut store = ConversationStore::new();
        let first = store.current_id();
        let second = store.create();

        assert_eq!(store.conversations()[0].id, second);
        assert_eq!(store.conversations()[1].id, first);
        assert_eq!(store.current_id(), second);
    }

    #[test]
    fn test_select_unknown_id_keeps_selection() {
        let mut store = ConversationStore::new();
        let current = store.current_id();
        let missing = ConversationId::new();

        assert!(matches!(
            store.select(missing),
            Err(ChatError::ConversationNotFound(id)) if id == missing
        ));
        assert_eq!(store.current_id(), current);
    }

    #[test]
    fn test_delete_current_selects_new_first() {
        let mut store = ConversationStore::new();
        let older = store.current_id();
        let newer = store.create();
        let newest = store.create();

        assert!(store.delete(newest).is_ok());
        assert_eq!(store.current_id(), newer);
        assert!(store.contains(older));
        assert_invariants(&store);
    }

    #[test]
    fn test_delete_other_keeps_current() {
        let mut store = ConversationStore::new();
        let older = store.current_id();
        let newer = store.create();

        assert!(store.delete(older).is_ok());
        assert_eq!(store.current_id(), newer);
        assert_invariants(&store);
    }

    #[test]
    fn test_delete_last_creates_fresh_conversation() {
        let mut store = ConversationStore::new();
        let only = store.current_id();

        assert!(store.delete(only).is_ok());
        assert_eq!(store.conversations().len(), 1);
        assert_ne!(store.current_id(), only);
        assert_invariants(&store);
    }

    #[test]
    fn test_list_never_empty_across_create_delete_sequences() {
        let mut store = ConversationStore::new();
        for round in 0..20 {
            if round % 3 == 0 {
                store.create();
            } else {
                let victim = store.conversations()[round % store.conversations().len()].id;
                assert!(store.delete(victim).is_ok());
            }
            assert_invariants(&store);
        }
    }

    #[test]
    fn test_rename_trims_title() {
        let mut store = ConversationStore::new();
        let id = store.current_id();
        assert!(store.start_edit(id).is_ok());

        assert!(store.rename(id, "  Trip Plans  ").is_ok());
        assert_eq!(store.current().title, "Trip Plans");
        assert!(!store.current().editing);
    }

    #[test]
    fn test_rename_blank_keeps_title() {
        let mut store = ConversationStore::new();
        let id = store.current_id();
        assert!(store.rename(id, "Trip Plans").is_ok());
        assert!(store.start_edit(id).is_ok());

        assert!(store.rename(id, "   ").is_ok());
        assert_eq!(store.current().title, "Trip Plans");
        assert!(!store.current().editing);

        assert!(store.rename(id, "").is_ok());
        assert_eq!(store.current().title, "Trip Plans");
    }

    #[test]
    fn test_cancel_edit_keeps_title() {
        let mut store = ConversationStore::new();
        let id = store.current_id();
        assert!(store.start_edit(id).is_ok());
        assert!(store.current().editing);

        assert!(store.cancel_edit(id).is_ok());
        assert!(!store.current().editing);
        assert_eq!(store.current().title, DEFAULT_TITLE);
    }

    #[test]
    fn test_begin_submit_blank_is_noop() {
        let mut store = ConversationStore::new();
        let id = store.current_id();
        let pending = store.begin_submit(id, "   ");
        assert!(matches!(pending, Ok(None)));
        assert!(store.current().messages.is_empty());
    }

    #[test]
    fn test_begin_submit_appends_prompt_and_placeholder() {
        let mut store = ConversationStore::new();
        let id = store.current_id();
        let pending = store.begin_submit(id, "  Hello  ").ok().flatten();

        let Some(pending) = pending else {
            panic!("expected a pending reply");
        };
        assert_eq!(pending.prompt, "Hello");
        assert_eq!(pending.conversation_id, id);

        let conv = store.current();
        assert_eq!(conv.title, "Hello");
        assert_eq!(conv.messages.len(), 2);
        assert_eq!(conv.messages[0].role(), Role::User);
        assert_eq!(conv.pending_request(), Some(pending.typing_id));
    }

    #[test]
    fn test_second_submit_while_pending_is_rejected() {
        let mut store = ConversationStore::new();
        let id = store.current_id();
        assert!(store.begin_submit(id, "Hello").is_ok());

        assert!(matches!(
            store.begin_submit(id, "Again"),
            Err(ChatError::ReplyPending(_))
        ));
        assert_eq!(store.current().messages.len(), 2);
    }

    #[test]
    fn test_settle_targets_captured_conversation() {
        let mut store = ConversationStore::new();
        let asked = store.current_id();
        let pending = store.begin_submit(asked, "Hello").ok().flatten();
        let Some(pending) = pending else {
            panic!("expected a pending reply");
        };

        let other = store.create();
        assert!(store.settle(pending.conversation_id, pending.typing_id, "Hi".to_string()));

        assert_eq!(store.current_id(), other);
        assert!(store.current().messages.is_empty());
        let asked_conv = store.get(asked).map(|c| c.messages.len());
        assert_eq!(asked_conv, Some(2));
    }

    #[test]
    fn test_settle_after_delete_is_noop() {
        let mut store = ConversationStore::new();
        let id = store.current_id();
        let pending = store.begin_submit(id, "Hello").ok().flatten();
        let Some(pending) = pending else {
            panic!("expected a pending reply");
        };

        assert!(store.delete(id).is_ok());
        assert!(!store.settle(pending.conversation_id, pending.typing_id, "Hi".to_string()));
    }
}

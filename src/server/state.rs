//! Application state shared across all request handlers.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

use crate::chat::composer::{CANCELLED_REPLY, Composer};
use crate::chat::config::ChatConfig;
use crate::chat::errors::{ChatError, ChatResult};
use crate::chat::ids::{ConversationId, RequestId};
use crate::chat::session::{Event, Session};
use crate::chat::store::{ConversationStore, PendingReply};
use crate::chat::types::Conversation;
use crate::persistence::{MemorySlotStore, PersistenceAdapter, SlotStore, SqliteSlotStore};
use crate::remote::InferenceClient;
use crate::render::render_document;

/// JSON view of the session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    /// Current conversation.
    pub current_id: ConversationId,
    /// All conversations in display order.
    pub conversations: Vec<Conversation>,
    /// Whether the sidebar is collapsed.
    pub sidebar_collapsed: bool,
    /// Pending notice, if any.
    pub notice: Option<String>,
}

/// Shared application state.
pub struct AppState {
    session: Mutex<Session>,
    persistence: PersistenceAdapter,
    composer: Composer,
    in_flight: Mutex<HashMap<RequestId, AbortHandle>>,
    /// Set while stored conversations have not been read successfully.
    load_failed: AtomicBool,
}

impl AppState {
    /// Load stored conversations and build the state.
    ///
    /// A storage read failure is logged and shown as a notice; the session
    /// then starts with a fresh conversation and nothing is written until a
    /// later read succeeds.
    pub async fn new(persistence: PersistenceAdapter, composer: Composer) -> Arc<Self> {
        let (conversations, notice, load_failed) = match persistence.load().await {
            Ok(conversations) => (conversations, None, false),
            Err(err) => {
                warn!("Failed to load conversations: {err}");
                (
                    Vec::new(),
                    Some(format!("Saved conversations could not be loaded: {err}")),
                    true,
                )
            }
        };
        info!("Starting with {} stored conversations", conversations.len());

        let mut session = Session::new(ConversationStore::from_conversations(conversations));
        if let Some(notice) = notice {
            session.set_notice(notice);
        }

        Arc::new(Self {
            session: Mutex::new(session),
            persistence,
            composer,
            in_flight: Mutex::new(HashMap::new()),
            load_failed: AtomicBool::new(load_failed),
        })
    }

    /// Build storage, the inference client and the composer from `config`.
    ///
    /// # Errors
    /// Returns an error if the storage file cannot be opened or the
    /// inference client cannot be built.
    pub async fn from_config(config: &ChatConfig) -> ChatResult<Arc<Self>> {
        let slots: Arc<dyn SlotStore> = if config.uses_in_memory_storage() {
            info!("Using in-memory storage; conversations will not survive a restart");
            Arc::new(MemorySlotStore::new())
        } else {
            info!("Storage path: {:?}", config.db_path);
            Arc::new(SqliteSlotStore::open(&config.db_path).await?)
        };

        let client = InferenceClient::new(&config.remote)?;
        info!("Inference endpoint: {}", client.endpoint());
        let composer = Composer::new(Arc::new(client), config.remote.request_timeout)?;

        Ok(Self::new(PersistenceAdapter::new(slots), composer).await)
    }

    /// Render the current page.
    pub async fn render(&self) -> String {
        let session = self.session.lock().await;
        render_document(&session)
    }

    /// Snapshot of the session for the JSON API.
    pub async fn snapshot(&self) -> StateSnapshot {
        let session = self.session.lock().await;
        StateSnapshot {
            current_id: session.store().current_id(),
            conversations: session.store().conversations().to_vec(),
            sidebar_collapsed: session.view().sidebar_collapsed,
            notice: session.view().notice.clone(),
        }
    }

    /// Apply an event, persist if needed and start any requested reply.
    ///
    /// Returns the handle of the spawned reply task, if one was started.
    ///
    /// # Errors
    /// Returns the transition error; state is unchanged in that case.
    pub async fn dispatch(self: &Arc<Self>, event: Event) -> ChatResult<Option<JoinHandle<()>>> {
        let mut session = self.session.lock().await;
        let transition = session.apply(event)?;
        if transition.persist {
            self.persist(&mut session).await;
        }
        drop(session);

        match transition.dispatch {
            Some(pending) => Ok(Some(self.spawn_reply(pending).await)),
            None => Ok(None),
        }
    }

    /// Abort the reply awaited by `conversation_id` and settle its placeholder.
    ///
    /// # Errors
    /// Returns `ConversationNotFound` if the conversation does not exist.
    pub async fn stop(&self, conversation_id: ConversationId) -> ChatResult<()> {
        let mut session = self.session.lock().await;
        let typing_id = session
            .store()
            .get(conversation_id)
            .ok_or(ChatError::ConversationNotFound(conversation_id))?
            .pending_request();

        let Some(typing_id) = typing_id else {
            return Ok(());
        };
        if let Some(handle) = self.in_flight.lock().await.remove(&typing_id) {
            handle.abort();
        }

        info!("Cancelled reply {typing_id} in {conversation_id}");
        let transition = session.apply(Event::Settle {
            conversation_id,
            typing_id,
            reply: CANCELLED_REPLY.to_string(),
        })?;
        if transition.persist {
            self.persist(&mut session).await;
        }
        Ok(())
    }

    async fn spawn_reply(self: &Arc<Self>, pending: PendingReply) -> JoinHandle<()> {
        // The map lock is held until the handle is registered, so the task
        // cannot deregister itself first.
        let mut in_flight = self.in_flight.lock().await;
        let state = Arc::clone(self);
        let typing_id = pending.typing_id;

        let handle = tokio::spawn(async move {
            let reply = state.composer.reply_for(&pending.prompt).await;
            state.in_flight.lock().await.remove(&pending.typing_id);
            state.settle(pending, reply).await;
        });
        in_flight.insert(typing_id, handle.abort_handle());
        handle
    }

    async fn settle(&self, pending: PendingReply, reply: String) {
        let mut session = self.session.lock().await;
        let event = Event::Settle {
            conversation_id: pending.conversation_id,
            typing_id: pending.typing_id,
            reply,
        };
        match session.apply(event) {
            Ok(transition) if transition.persist => self.persist(&mut session).await,
            Ok(_) => debug!("Reply {} arrived after its placeholder was gone", pending.typing_id),
            Err(err) => warn!("Failed to settle reply {}: {err}", pending.typing_id),
        }
    }

    async fn persist(&self, session: &mut Session) {
        // Writing before the stored list was read would overwrite it.
        if self.load_failed.load(Ordering::Acquire) {
            match self.persistence.load().await {
                Ok(stored) => {
                    info!("Recovered {} stored conversations", stored.len());
                    session.merge_loaded(stored);
                    self.load_failed.store(false, Ordering::Release);
                }
                Err(err) => {
                    warn!("Stored conversations still unreadable, not saving: {err}");
                    session.set_notice(format!(
                        "Saved conversations could not be loaded; changes are kept in memory only: {err}"
                    ));
                    return;
                }
            }
        }

        match self.persistence.save(session.store().conversations()).await {
            Ok(()) => session.clear_notice(),
            Err(err) => {
                warn!("Failed to save conversations: {err}");
                session.set_notice(format!("Changes could not be saved: {err}"));
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use super::*;
    use crate::chat::composer::tests::{FailingBackend, StalledBackend};
    use crate::chat::fallback::GREETING_REPLY;
    use crate::chat::types::{DEFAULT_TITLE, Message, Role};
    use crate::persistence::StoreFuture;
    use crate::persistence::adapter::tests::BrokenSlotStore;
    use crate::remote::CompletionBackend;

    /// Memory slots whose next `failing_reads` reads fail like a busy database.
    #[derive(Default)]
    struct FlakySlotStore {
        inner: MemorySlotStore,
        failing_reads: AtomicUsize,
        reject_writes: AtomicBool,
    }

    impl SlotStore for FlakySlotStore {
        fn read(&self, key: &str) -> StoreFuture<'_, ChatResult<Option<String>>> {
            let failing = self
                .failing_reads
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Box::pin(async {
                    Err(ChatError::StorageUnavailable("database is locked".to_string()))
                });
            }
            self.inner.read(key)
        }

        fn write(&self, key: &str, value: String) -> StoreFuture<'_, ChatResult<()>> {
            if self.reject_writes.load(Ordering::SeqCst) {
                return Box::pin(async {
                    Err(ChatError::StorageUnavailable("quota exceeded".to_string()))
                });
            }
            self.inner.write(key, value)
        }
    }

    /// Slots holding `count` stored conversations whose next `failing_reads` reads fail.
    async fn flaky_history(count: i64, failing_reads: usize) -> Arc<FlakySlotStore> {
        let slots = Arc::new(FlakySlotStore::default());
        let stored: Vec<Conversation> = (1..=count).map(Conversation::new).collect();
        assert!(PersistenceAdapter::new(slots.clone()).save(&stored).await.is_ok());
        slots.failing_reads.store(failing_reads, Ordering::SeqCst);
        slots
    }

    pub(crate) async fn state_with(
        slots: Arc<dyn SlotStore>,
        backend: Arc<dyn CompletionBackend>,
    ) -> Arc<AppState> {
        let composer = Composer::new(backend, Duration::from_secs(5))
            .unwrap_or_else(|e| panic!("composer: {e}"));
        AppState::new(PersistenceAdapter::new(slots), composer).await
    }

    #[tokio::test]
    async fn test_hello_with_failing_remote_gets_greeting() {
        let slots = Arc::new(MemorySlotStore::new());
        let state = state_with(slots.clone(), Arc::new(FailingBackend)).await;
        assert_eq!(state.snapshot().await.conversations[0].title, DEFAULT_TITLE);

        let handle = state.dispatch(Event::Submit("Hello".to_string())).await;
        let Ok(Some(handle)) = handle else {
            panic!("expected a reply task");
        };
        assert!(handle.await.is_ok());

        let snapshot = state.snapshot().await;
        let conv = &snapshot.conversations[0];
        assert_eq!(conv.title, "Hello");
        assert_eq!(conv.messages.len(), 2);
        assert_eq!(conv.messages[0].role(), Role::User);
        assert_eq!(conv.messages[0].content(), "Hello");
        assert_eq!(conv.messages[1].role(), Role::Ai);
        assert_eq!(conv.messages[1].content(), GREETING_REPLY);

        // The settled state reached storage.
        let reloaded = PersistenceAdapter::new(slots).load().await.unwrap_or_default();
        assert_eq!(reloaded[0].messages.len(), 2);
        assert_eq!(reloaded[0].title, "Hello");
    }

    #[tokio::test]
    async fn test_reply_lands_in_captured_conversation_after_switch() {
        let state = state_with(Arc::new(MemorySlotStore::new()), Arc::new(FailingBackend)).await;
        let asked = state.snapshot().await.current_id;

        let handle = state.dispatch(Event::Submit("hola".to_string())).await;
        assert!(state.dispatch(Event::NewConversation).await.is_ok());
        if let Ok(Some(handle)) = handle {
            assert!(handle.await.is_ok());
        }

        let snapshot = state.snapshot().await;
        assert_ne!(snapshot.current_id, asked);
        assert!(snapshot.conversations[0].messages.is_empty());
        let asked_conv = snapshot.conversations.iter().find(|c| c.id == asked);
        assert_eq!(asked_conv.map(|c| c.messages.len()), Some(2));
    }

    #[tokio::test]
    async fn test_stop_cancels_and_settles_placeholder() {
        let state = state_with(Arc::new(MemorySlotStore::new()), Arc::new(StalledBackend)).await;
        let id = state.snapshot().await.current_id;

        let handle = state.dispatch(Event::Submit("Hello".to_string())).await;
        let Ok(Some(handle)) = handle else {
            panic!("expected a reply task");
        };
        assert!(state.stop(id).await.is_ok());
        assert!(handle.await.is_err_and(|e| e.is_cancelled()));

        let snapshot = state.snapshot().await;
        assert_eq!(
            snapshot.conversations[0].messages[1],
            Message::Settled {
                content: CANCELLED_REPLY.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_unreadable_history_is_recovered_before_first_write() {
        let slots = flaky_history(5, 1).await;
        let state = state_with(slots.clone(), Arc::new(FailingBackend)).await;
        assert!(state.snapshot().await.notice.is_some());
        assert_eq!(state.snapshot().await.conversations.len(), 1);

        assert!(state.dispatch(Event::NewConversation).await.is_ok());

        let snapshot = state.snapshot().await;
        assert_eq!(snapshot.conversations.len(), 6);
        assert_eq!(snapshot.conversations[0].id, snapshot.current_id);
        assert!(snapshot.notice.is_none());

        let reloaded = PersistenceAdapter::new(slots).load().await.unwrap_or_default();
        assert_eq!(reloaded.len(), 6);
    }

    #[tokio::test]
    async fn test_history_is_not_overwritten_while_unreadable() {
        let slots = flaky_history(5, 2).await;
        let state = state_with(slots.clone(), Arc::new(FailingBackend)).await;

        assert!(state.dispatch(Event::NewConversation).await.is_ok());
        assert_eq!(state.snapshot().await.conversations.len(), 2);
        assert!(state
            .snapshot()
            .await
            .notice
            .is_some_and(|n| n.contains("kept in memory only")));

        let reloaded = PersistenceAdapter::new(slots).load().await.unwrap_or_default();
        assert_eq!(reloaded.len(), 5);
    }

    #[tokio::test]
    async fn test_unreadable_storage_is_a_notice_not_an_error() {
        let state = state_with(Arc::new(BrokenSlotStore), Arc::new(FailingBackend)).await;
        assert!(state.snapshot().await.notice.is_some());

        assert!(state.dispatch(Event::NewConversation).await.is_ok());
        let snapshot = state.snapshot().await;
        assert_eq!(snapshot.conversations.len(), 2);
        assert!(snapshot
            .notice
            .is_some_and(|n| n.contains("kept in memory only")));
    }

    #[tokio::test]
    async fn test_write_failure_is_a_notice_not_an_error() {
        let slots = flaky_history(1, 0).await;
        slots.reject_writes.store(true, Ordering::SeqCst);
        let state = state_with(slots, Arc::new(FailingBackend)).await;
        assert!(state.snapshot().await.notice.is_none());

        assert!(state.dispatch(Event::NewConversation).await.is_ok());
        let snapshot = state.snapshot().await;
        assert_eq!(snapshot.conversations.len(), 2);
        assert!(snapshot
            .notice
            .is_some_and(|n| n.contains("could not be saved")));
    }
}

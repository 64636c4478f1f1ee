//! Local durable storage for the conversation list.

pub mod adapter;
pub mod slot_store;

pub use adapter::{CONVERSATIONS_KEY, PersistenceAdapter};
pub use slot_store::{MemorySlotStore, SlotStore, SqliteSlotStore, StoreFuture};

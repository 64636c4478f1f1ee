//! Key-value slot storage.
//!
//! A slot is one key holding one serialized blob. Writes replace the whole
//! value; there are no partial updates.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use dashmap::DashMap;
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use crate::chat::errors::ChatResult;

/// Boxed future type for slot operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for durable key-value slots.
pub trait SlotStore: Send + Sync {
    /// Read the value under `key`, `None` if never written.
    fn read(&self, key: &str) -> StoreFuture<'_, ChatResult<Option<String>>>;

    /// Overwrite the value under `key`.
    fn write(&self, key: &str, value: String) -> StoreFuture<'_, ChatResult<()>>;
}

/// `SQLite` implementation of slot storage.
pub struct SqliteSlotStore {
    conn: Arc<Connection>,
    table: String,
}

impl SqliteSlotStore {
    /// Table name for slots.
    pub const DEFAULT_TABLE: &'static str = "slots";

    /// Initialize the store and create the table if it doesn't exist.
    ///
    /// # Errors
    /// Returns an error if database operations fail.
    pub async fn new(conn: Arc<Connection>) -> ChatResult<Self> {
        let table = Self::DEFAULT_TABLE.to_string();
        let table_name = table.clone();

        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                );"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self { conn, table })
    }

    /// Open (or create) the database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub async fn open(path: impl AsRef<std::path::Path>) -> ChatResult<Self> {
        let conn = Connection::open(path.as_ref()).await?;
        Self::new(Arc::new(conn)).await
    }
}

impl SlotStore for SqliteSlotStore {
    fn read(&self, key: &str) -> StoreFuture<'_, ChatResult<Option<String>>> {
        let key = key.to_string();
        Box::pin(async move {
            let table = self.table.clone();
            let value = self
                .conn
                .call(move |conn| {
                    let value = conn
                        .query_row(
                            &format!("SELECT value FROM {table} WHERE key = ?1"),
                            rusqlite::params![key],
                            |row| row.get::<_, String>(0),
                        )
                        .optional()?;
                    Ok(value)
                })
                .await?;
            Ok(value)
        })
    }

    fn write(&self, key: &str, value: String) -> StoreFuture<'_, ChatResult<()>> {
        let key = key.to_string();
        Box::pin(async move {
            let table = self.table.clone();
            let now_ms = chrono::Utc::now().timestamp_millis();
            self.conn
                .call(move |conn| {
                    conn.execute(
                        &format!(
                            "INSERT INTO {table} (key, value, updated_at)
                             VALUES (?1, ?2, ?3)
                             ON CONFLICT(key) DO UPDATE SET
                                value = excluded.value,
                                updated_at = excluded.updated_at"
                        ),
                        rusqlite::params![key, value, now_ms],
                    )?;
                    Ok(())
                })
                .await?;
            Ok(())
        })
    }
}

/// In-process slot storage; contents vanish with the process.
#[derive(Default)]
pub struct MemorySlotStore {
    slots: DashMap<String, String>,
}

impl MemorySlotStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SlotStore for MemorySlotStore {
    fn read(&self, key: &str) -> StoreFuture<'_, ChatResult<Option<String>>> {
        let value = self.slots.get(key).map(|entry| entry.value().clone());
        Box::pin(async move { Ok(value) })
    }

    fn write(&self, key: &str, value: String) -> StoreFuture<'_, ChatResult<()>> {
        self.slots.insert(key.to_string(), value);
        Box::pin(async { Ok(()) })
    }
}

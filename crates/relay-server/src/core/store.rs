//! Message Store
//!
//! Durable record of messages with their delivery status. Pending
//! messages come back in insertion order.

use crate::core::models::{Message, MessageStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Record a message and return its id
    async fn insert(
        &self,
        content: &str,
        sender_id: i64,
        receiver_id: i64,
        status: MessageStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<i64>;

    async fn find_pending_for(&self, receiver_id: i64) -> Result<Vec<Message>>;

    async fn update_status(
        &self,
        id: i64,
        status: MessageStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<()>;
}

type MessageRow = (i64, String, i64, i64, String, String);

fn message_from_row(row: MessageRow) -> Result<Message> {
    let (id, content, sender_id, receiver_id, status, timestamp) = row;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp)
        .with_context(|| format!("Bad timestamp on message {}", id))?
        .with_timezone(&Utc);
    Ok(Message {
        id,
        content,
        sender_id,
        receiver_id,
        status: status.parse()?,
        timestamp,
    })
}

/// SQLite-backed message store
pub struct SqliteMessageStore {
    pool: SqlitePool,
}

impl SqliteMessageStore {
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        let store = Self { pool };
        store.init_db().await?;
        info!("[MessageStore] Initialized");
        Ok(store)
    }

    async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content TEXT NOT NULL,
                sender_id INTEGER NOT NULL,
                receiver_id INTEGER NOT NULL,
                status TEXT NOT NULL,
                timestamp TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create messages table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_receiver_status ON messages (receiver_id, status)",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn insert(
        &self,
        content: &str,
        sender_id: i64,
        receiver_id: i64,
        status: MessageStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO messages (content, sender_id, receiver_id, status, timestamp) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(content)
        .bind(sender_id)
        .bind(receiver_id)
        .bind(status.as_str())
        .bind(timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!("[MessageStore] Stored message {} as {}", id, status);
        Ok(id)
    }

    async fn find_pending_for(&self, receiver_id: i64) -> Result<Vec<Message>> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT id, content, sender_id, receiver_id, status, timestamp FROM messages \
             WHERE receiver_id = ? AND status = ? ORDER BY id ASC",
        )
        .bind(receiver_id)
        .bind(MessageStatus::Pending.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(message_from_row).collect()
    }

    async fn update_status(
        &self,
        id: i64,
        status: MessageStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE messages SET status = ?, timestamp = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(timestamp.to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

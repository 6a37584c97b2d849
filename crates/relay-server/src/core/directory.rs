//! User Directory
//!
//! Resolves usernames to user records and tracks each user's coarse
//! ONLINE/OFFLINE status. Lookups return `Option`; an unknown user is a
//! normal outcome, not an error.

use crate::core::models::{NewUser, User, UserStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, info};

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn set_status(&self, username: &str, status: UserStatus) -> Result<()>;

    /// Add a user, starting OFFLINE. Returns `None` when the username is
    /// already taken.
    async fn create_user(&self, user: NewUser) -> Result<Option<User>>;

    async fn exists(&self, username: &str) -> Result<bool> {
        Ok(self.find_by_username(username).await?.is_some())
    }
}

type UserRow = (i64, String, String, String, String, String);

fn user_from_row(row: UserRow) -> Result<User> {
    let (id, first_name, last_name, email, username, status) = row;
    Ok(User {
        id,
        first_name,
        last_name,
        email,
        username,
        status: status.parse()?,
    })
}

/// SQLite-backed directory
pub struct SqliteUserDirectory {
    pool: SqlitePool,
}

impl SqliteUserDirectory {
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        let directory = Self { pool };
        directory.init_db().await?;
        info!("[Directory] Initialized");
        Ok(directory)
    }

    async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                email TEXT NOT NULL,
                username TEXT UNIQUE NOT NULL,
                status TEXT NOT NULL DEFAULT 'OFFLINE'
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create users table")?;
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for SqliteUserDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, first_name, last_name, email, username, status FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(user_from_row).transpose()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, first_name, last_name, email, username, status FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(user_from_row).transpose()
    }

    async fn set_status(&self, username: &str, status: UserStatus) -> Result<()> {
        sqlx::query("UPDATE users SET status = ? WHERE username = ?")
            .bind(status.as_str())
            .bind(username)
            .execute(&self.pool)
            .await?;
        debug!("[Directory] {} is now {}", username, status);
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> Result<Option<User>> {
        // The UNIQUE constraint settles concurrent registrations of one name
        let result = sqlx::query(
            "INSERT INTO users (first_name, last_name, email, username, status) VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(username) DO NOTHING",
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.username)
        .bind(UserStatus::Offline.as_str())
        .execute(&self.pool)
        .await
        .context("Failed to insert user")?;

        if result.rows_affected() == 0 {
            debug!("[Directory] Username already taken: {}", user.username);
            return Ok(None);
        }

        info!("[Directory] User created: {}", user.username);

        Ok(Some(User {
            id: result.last_insert_rowid(),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            username: user.username,
            status: UserStatus::Offline,
        }))
    }
}

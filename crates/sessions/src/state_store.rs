//! SQLite-backed session registry.

use std::time::{SystemTime, UNIX_EPOCH};

use {async_trait::async_trait, tracing::debug};

use crate::{PendingUpload, Result, Session, SessionRegistry};

#[derive(sqlx::FromRow)]
struct SessionRow {
    user_id: i64,
    active_channel_id: i64,
    pending_upload: Option<String>,
    updated_at: i64,
}

impl TryFrom<SessionRow> for Session {
    type Error = crate::Error;

    fn try_from(r: SessionRow) -> Result<Self> {
        Ok(Self {
            user_id: r.user_id,
            active_channel_id: r.active_channel_id,
            pending: r.pending_upload.as_deref().map(str::parse).transpose()?,
            updated_at: r.updated_at,
        })
    }
}

/// SQLite-backed session registry.
pub struct SqliteSessionStore {
    pool: sqlx::SqlitePool,
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

impl SqliteSessionStore {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the sessions table without going through migrations.
    #[doc(hidden)]
    pub async fn init(pool: &sqlx::SqlitePool) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS sessions (
                user_id            INTEGER PRIMARY KEY,
                active_channel_id  INTEGER NOT NULL,
                pending_upload     TEXT,
                updated_at         INTEGER NOT NULL
            )"#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SessionRegistry for SqliteSessionStore {
    async fn get(&self, user_id: i64) -> Result<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT user_id, active_channel_id, pending_upload, updated_at \
             FROM sessions WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn set_channel(&self, user_id: i64, channel_id: i64) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO sessions (user_id, active_channel_id, pending_upload, updated_at)
               VALUES (?, ?, NULL, ?)
               ON CONFLICT(user_id) DO UPDATE SET
                 active_channel_id = excluded.active_channel_id,
                 pending_upload = NULL,
                 updated_at = excluded.updated_at"#,
        )
        .bind(user_id)
        .bind(channel_id)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        debug!(user_id, channel_id, "session channel set");
        Ok(())
    }

    async fn set_pending(&self, user_id: i64, pending: Option<PendingUpload>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE sessions SET pending_upload = ?, updated_at = ? WHERE user_id = ?",
        )
        .bind(pending.map(PendingUpload::as_str))
        .bind(now_ms())
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn take_pending(&self, user_id: i64) -> Result<Option<(i64, PendingUpload)>> {
        let Some(Session {
            active_channel_id,
            pending: Some(pending),
            ..
        }) = self.get(user_id).await?
        else {
            return Ok(None);
        };

        // Only the caller that observed this exact state gets to consume it.
        let result = sqlx::query(
            r#"UPDATE sessions SET pending_upload = NULL, updated_at = ?
               WHERE user_id = ? AND active_channel_id = ? AND pending_upload = ?"#,
        )
        .bind(now_ms())
        .bind(user_id)
        .bind(active_channel_id)
        .bind(pending.as_str())
        .execute(&self.pool)
        .await?;

        Ok((result.rows_affected() > 0).then_some((active_channel_id, pending)))
    }

    async fn clear_channel(&self, channel_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE active_channel_id = ?")
            .bind(channel_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> sqlx::SqlitePool {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        SqliteSessionStore::init(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_set_channel_and_get() {
        let store = SqliteSessionStore::new(test_pool().await);

        store.set_channel(7, -1001).await.unwrap();
        let session = store.get(7).await.unwrap().unwrap();
        assert_eq!(session.active_channel_id, -1001);
        assert_eq!(session.pending, None);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = SqliteSessionStore::new(test_pool().await);
        assert!(store.get(7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_channel_overwrites_and_drops_pending() {
        let store = SqliteSessionStore::new(test_pool().await);

        store.set_channel(7, -1001).await.unwrap();
        store
            .set_pending(7, Some(PendingUpload::AppendOn))
            .await
            .unwrap();
        store.set_channel(7, -1002).await.unwrap();

        let session = store.get(7).await.unwrap().unwrap();
        assert_eq!(session.active_channel_id, -1002);
        assert_eq!(session.pending, None);
    }

    #[tokio::test]
    async fn test_set_pending_without_session() {
        let store = SqliteSessionStore::new(test_pool().await);
        let updated = store
            .set_pending(7, Some(PendingUpload::ReplaceOff))
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_take_pending_clears_once() {
        let store = SqliteSessionStore::new(test_pool().await);

        store.set_channel(7, -1001).await.unwrap();
        store
            .set_pending(7, Some(PendingUpload::ReplaceOff))
            .await
            .unwrap();

        let taken = store.take_pending(7).await.unwrap();
        assert_eq!(taken, Some((-1001, PendingUpload::ReplaceOff)));
        assert!(store.take_pending(7).await.unwrap().is_none());
        // The session itself survives.
        assert!(store.get(7).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_take_pending_nothing_pending() {
        let store = SqliteSessionStore::new(test_pool().await);
        store.set_channel(7, -1001).await.unwrap();
        assert!(store.take_pending(7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_channel() {
        let store = SqliteSessionStore::new(test_pool().await);

        store.set_channel(1, -1001).await.unwrap();
        store.set_channel(2, -1001).await.unwrap();
        store.set_channel(3, -1002).await.unwrap();

        assert_eq!(store.clear_channel(-1001).await.unwrap(), 2);
        assert!(store.get(1).await.unwrap().is_none());
        assert!(store.get(3).await.unwrap().is_some());
    }
}

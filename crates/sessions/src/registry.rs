use async_trait::async_trait;

use crate::{PendingUpload, Result, Session};

/// Durable mapping from user id to the channel they are administering.
///
/// Implementations must read and write full rows per call; callers never
/// hold a session across interaction turns.
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    async fn get(&self, user_id: i64) -> Result<Option<Session>>;

    /// Point the user's session at `channel_id`, dropping any pending upload.
    async fn set_channel(&self, user_id: i64, channel_id: i64) -> Result<()>;

    /// Set or clear the pending upload. Returns `false` if the user has no session.
    async fn set_pending(&self, user_id: i64, pending: Option<PendingUpload>) -> Result<bool>;

    /// Atomically clear and return the pending upload together with the
    /// session's active channel.
    async fn take_pending(&self, user_id: i64) -> Result<Option<(i64, PendingUpload)>>;

    /// Remove every session pointing at `channel_id`.
    async fn clear_channel(&self, channel_id: i64) -> Result<u64>;
}

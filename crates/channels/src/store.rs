use async_trait::async_trait;

use crate::{ChannelConfig, ChannelEdit, Result};

/// Durable mapping from channel id to [`ChannelConfig`].
///
/// Every method is a fresh full-record read or write; implementations must
/// not cache records between calls.
#[async_trait]
pub trait ChannelStore: Send + Sync {
    async fn list(&self) -> Result<Vec<ChannelConfig>>;

    async fn get(&self, channel_id: i64) -> Result<Option<ChannelConfig>>;

    /// Create the record owned by `user_id` if absent, or take ownership of an
    /// existing unclaimed one. An already-owned record is left untouched.
    ///
    /// Returns the record as stored afterwards; exactly one of several
    /// concurrent claimants observes itself as owner.
    async fn claim(&self, channel_id: i64, user_id: i64) -> Result<ChannelConfig>;

    /// Apply `edit` as one read-modify-write, re-checking that `acting_user`
    /// is authorized against the record read inside the same operation.
    ///
    /// Fails with `NotFound` for a missing record and `OwnershipConflict`
    /// when the user is not authorized; nothing is written on error.
    async fn apply(
        &self,
        channel_id: i64,
        acting_user: i64,
        edit: ChannelEdit,
    ) -> Result<ChannelConfig>;

    /// Refresh best-effort display metadata. A missing record is a no-op.
    async fn update_display(
        &self,
        channel_id: i64,
        username: Option<&str>,
        title: Option<&str>,
    ) -> Result<()>;

    /// Delete the record if `acting_user` is authorized for it.
    async fn delete(&self, channel_id: i64, acting_user: i64) -> Result<()>;
}

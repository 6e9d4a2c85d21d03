use crate::ChannelConfig;

/// Decide whether `acting_user` may act on the channel.
///
/// An unclaimed channel is open to anyone (first-claim semantics); a claimed
/// one only to its owner. Callers must pass a freshly read config.
pub fn is_authorized(config: &ChannelConfig, acting_user: i64) -> bool {
    match config.owner_id {
        None => true,
        Some(owner) => owner == acting_user,
    }
}

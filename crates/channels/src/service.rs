//! Administrative operations and post handling on top of the stores.
//!
//! Every operation re-reads the session and channel record it needs; nothing
//! is carried over between calls.

use std::sync::Arc;

use {
    beacon_sessions::{PendingUpload, SessionRegistry},
    tracing::{debug, info, warn},
};

use crate::{
    ChannelConfig, ChannelEdit, ChannelPost, ChannelStore, Error, Result, Signal, gating,
    model::validate_trigger_text,
    rewrite::{self, RewriteDirective},
};

/// Result of storing a photo for a pending upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub channel_id: i64,
    pub pending: PendingUpload,
    /// Size of the target collection after the edit.
    pub count: usize,
}

pub struct ChannelService {
    channels: Arc<dyn ChannelStore>,
    sessions: Arc<dyn SessionRegistry>,
}

impl ChannelService {
    pub fn new(channels: Arc<dyn ChannelStore>, sessions: Arc<dyn SessionRegistry>) -> Self {
        Self { channels, sessions }
    }

    /// Select `channel_id` for administration, claiming it if unclaimed.
    ///
    /// Idempotent for the current owner.
    pub async fn set_channel(&self, user_id: i64, channel_id: i64) -> Result<ChannelConfig> {
        let existing = self.channels.get(channel_id).await?;
        if let Some(ref config) = existing
            && !gating::is_authorized(config, user_id)
        {
            return Err(Error::OwnershipConflict { channel_id });
        }

        let config = match existing {
            Some(config) if config.owner_id == Some(user_id) => config,
            _ => self.channels.claim(channel_id, user_id).await?,
        };
        // Someone else may have claimed between the read and the claim.
        if config.owner_id != Some(user_id) {
            warn!(user_id, channel_id, "lost claim race");
            return Err(Error::OwnershipConflict { channel_id });
        }

        self.sessions.set_channel(user_id, channel_id).await?;
        info!(user_id, channel_id, "active channel set");
        Ok(config)
    }

    async fn active_channel(&self, user_id: i64) -> Result<i64> {
        self.sessions
            .get(user_id)
            .await?
            .map(|s| s.active_channel_id)
            .ok_or(Error::NoActiveChannel)
    }

    /// Freshly read config of the user's active channel, if they may act on it.
    async fn authorized_config(&self, user_id: i64) -> Result<ChannelConfig> {
        let channel_id = self.active_channel(user_id).await?;
        let config = self
            .channels
            .get(channel_id)
            .await?
            .ok_or(Error::NotFound { channel_id })?;
        if !gating::is_authorized(&config, user_id) {
            return Err(Error::OwnershipConflict { channel_id });
        }
        Ok(config)
    }

    async fn edit_active(&self, user_id: i64, edit: ChannelEdit) -> Result<ChannelConfig> {
        let channel_id = self.active_channel(user_id).await?;
        debug!(user_id, channel_id, ?edit, "applying channel edit");
        self.channels.apply(channel_id, user_id, edit).await
    }

    pub async fn status(&self, user_id: i64) -> Result<ChannelConfig> {
        self.authorized_config(user_id).await
    }

    pub async fn images(&self, user_id: i64, signal: Signal) -> Result<Vec<String>> {
        let config = self.authorized_config(user_id).await?;
        Ok(config.images(signal).to_vec())
    }

    /// Arm the session so the user's next photo goes into a collection.
    pub async fn begin_upload(
        &self,
        user_id: i64,
        pending: PendingUpload,
    ) -> Result<ChannelConfig> {
        let config = self.authorized_config(user_id).await?;
        if !self.sessions.set_pending(user_id, Some(pending)).await? {
            return Err(Error::NoActiveChannel);
        }
        debug!(user_id, channel_id = config.channel_id, %pending, "awaiting photo");
        Ok(config)
    }

    /// Abandon a pending upload. Returns `false` if nothing was pending.
    pub async fn cancel_upload(&self, user_id: i64) -> Result<bool> {
        let session = self
            .sessions
            .get(user_id)
            .await?
            .ok_or(Error::NoActiveChannel)?;
        if session.pending.is_none() {
            return Ok(false);
        }
        self.sessions.set_pending(user_id, None).await?;
        Ok(true)
    }

    /// Store a received photo according to the pending upload.
    ///
    /// Returns `None` when nothing was pending. The pending state is consumed
    /// even if storing fails.
    pub async fn receive_photo(&self, user_id: i64, image: String) -> Result<Option<UploadOutcome>> {
        let Some((channel_id, pending)) = self.sessions.take_pending(user_id).await? else {
            return Ok(None);
        };
        let config = self
            .channels
            .apply(channel_id, user_id, ChannelEdit::for_upload(pending, image))
            .await?;
        let count = config.images(Signal::from(pending)).len();
        info!(user_id, channel_id, %pending, count, "image stored");
        Ok(Some(UploadOutcome {
            channel_id,
            pending,
            count,
        }))
    }

    pub async fn remove_image(
        &self,
        user_id: i64,
        signal: Signal,
        index: i64,
    ) -> Result<ChannelConfig> {
        self.edit_active(user_id, ChannelEdit::RemoveImage { signal, index })
            .await
    }

    pub async fn set_text(&self, user_id: i64, signal: Signal, text: &str) -> Result<ChannelConfig> {
        let text = validate_trigger_text(text)?;
        self.edit_active(user_id, ChannelEdit::SetText { signal, text })
            .await
    }

    pub async fn reset_text(&self, user_id: i64) -> Result<ChannelConfig> {
        self.edit_active(user_id, ChannelEdit::ResetText).await
    }

    /// Hand the active channel over to `new_owner`.
    ///
    /// The new owner is not checked against any identity source.
    pub async fn transfer(&self, user_id: i64, new_owner: i64) -> Result<ChannelConfig> {
        let config = self
            .edit_active(user_id, ChannelEdit::TransferOwner { new_owner })
            .await?;
        info!(
            user_id,
            new_owner,
            channel_id = config.channel_id,
            "ownership transferred"
        );
        Ok(config)
    }

    /// Delete the active channel's record and every session pointing at it.
    pub async fn remove_channel(&self, user_id: i64) -> Result<i64> {
        let channel_id = self.active_channel(user_id).await?;
        self.channels.delete(channel_id, user_id).await?;
        let cleared = self.sessions.clear_channel(channel_id).await?;
        info!(user_id, channel_id, cleared, "channel removed");
        Ok(channel_id)
    }

    /// Evaluate a new channel post against the channel's current config.
    pub async fn handle_post(&self, post: &ChannelPost) -> Result<Option<RewriteDirective>> {
        let Some(config) = self.channels.get(post.channel_id).await? else {
            return Ok(None);
        };

        let username = post.display_username.as_deref();
        let title = post.display_title.as_deref();
        if (username.is_some() || title.is_some())
            && (config.display_username.as_deref() != username
                || config.display_title.as_deref() != title)
            && let Err(e) = self
                .channels
                .update_display(post.channel_id, username, title)
                .await
        {
            warn!(channel_id = post.channel_id, error = %e, "failed to refresh channel metadata");
        }

        let directive = rewrite::evaluate(&post.text, &config);
        if let Some(ref d) = directive {
            debug!(channel_id = post.channel_id, signal = %d.signal, "post matched trigger");
        }
        Ok(directive)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Mutex};

    use {async_trait::async_trait, beacon_sessions::Session, tokio::sync::Barrier};

    use {super::*, crate::ActionStatus};

    #[derive(Default)]
    struct MemoryChannels {
        records: Mutex<HashMap<i64, ChannelConfig>>,
    }

    #[async_trait]
    impl ChannelStore for MemoryChannels {
        async fn list(&self) -> Result<Vec<ChannelConfig>> {
            Ok(self.records.lock().unwrap().values().cloned().collect())
        }

        async fn get(&self, channel_id: i64) -> Result<Option<ChannelConfig>> {
            Ok(self.records.lock().unwrap().get(&channel_id).cloned())
        }

        async fn claim(&self, channel_id: i64, user_id: i64) -> Result<ChannelConfig> {
            let mut records = self.records.lock().unwrap();
            let config = records
                .entry(channel_id)
                .or_insert_with(|| ChannelConfig::new(channel_id));
            if config.owner_id.is_none() {
                config.owner_id = Some(user_id);
            }
            Ok(config.clone())
        }

        async fn apply(
            &self,
            channel_id: i64,
            acting_user: i64,
            edit: ChannelEdit,
        ) -> Result<ChannelConfig> {
            let mut records = self.records.lock().unwrap();
            let stored = records
                .get_mut(&channel_id)
                .ok_or(Error::NotFound { channel_id })?;
            if !gating::is_authorized(stored, acting_user) {
                return Err(Error::OwnershipConflict { channel_id });
            }
            let mut next = stored.clone();
            edit.apply(&mut next)?;
            *stored = next.clone();
            Ok(next)
        }

        async fn update_display(
            &self,
            channel_id: i64,
            username: Option<&str>,
            title: Option<&str>,
        ) -> Result<()> {
            if let Some(c) = self.records.lock().unwrap().get_mut(&channel_id) {
                c.display_username = username.map(String::from);
                c.display_title = title.map(String::from);
            }
            Ok(())
        }

        async fn delete(&self, channel_id: i64, acting_user: i64) -> Result<()> {
            let mut records = self.records.lock().unwrap();
            let stored = records
                .get(&channel_id)
                .ok_or(Error::NotFound { channel_id })?;
            if !gating::is_authorized(stored, acting_user) {
                return Err(Error::OwnershipConflict { channel_id });
            }
            records.remove(&channel_id);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemorySessions {
        sessions: Mutex<HashMap<i64, Session>>,
    }

    #[async_trait]
    impl SessionRegistry for MemorySessions {
        async fn get(&self, user_id: i64) -> beacon_sessions::Result<Option<Session>> {
            Ok(self.sessions.lock().unwrap().get(&user_id).cloned())
        }

        async fn set_channel(&self, user_id: i64, channel_id: i64) -> beacon_sessions::Result<()> {
            self.sessions.lock().unwrap().insert(user_id, Session {
                user_id,
                active_channel_id: channel_id,
                pending: None,
                updated_at: 0,
            });
            Ok(())
        }

        async fn set_pending(
            &self,
            user_id: i64,
            pending: Option<PendingUpload>,
        ) -> beacon_sessions::Result<bool> {
            Ok(match self.sessions.lock().unwrap().get_mut(&user_id) {
                Some(s) => {
                    s.pending = pending;
                    true
                },
                None => false,
            })
        }

        async fn take_pending(
            &self,
            user_id: i64,
        ) -> beacon_sessions::Result<Option<(i64, PendingUpload)>> {
            Ok(self
                .sessions
                .lock()
                .unwrap()
                .get_mut(&user_id)
                .and_then(|s| s.pending.take().map(|p| (s.active_channel_id, p))))
        }

        async fn clear_channel(&self, channel_id: i64) -> beacon_sessions::Result<u64> {
            let mut sessions = self.sessions.lock().unwrap();
            let before = sessions.len();
            sessions.retain(|_, s| s.active_channel_id != channel_id);
            Ok((before - sessions.len()) as u64)
        }
    }

    const CHANNEL: i64 = -100_123;

    fn service() -> (ChannelService, Arc<MemoryChannels>, Arc<MemorySessions>) {
        let channels = Arc::new(MemoryChannels::default());
        let sessions = Arc::new(MemorySessions::default());
        let svc = ChannelService::new(
            Arc::clone(&channels) as Arc<dyn ChannelStore>,
            Arc::clone(&sessions) as Arc<dyn SessionRegistry>,
        );
        (svc, channels, sessions)
    }

    async fn stored(channels: &MemoryChannels) -> ChannelConfig {
        channels.get(CHANNEL).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn claim_sets_owner_once() {
        let (svc, channels, _) = service();

        let config = svc.set_channel(10, CHANNEL).await.unwrap();
        assert_eq!(config.owner_id, Some(10));

        let err = svc.set_channel(20, CHANNEL).await.unwrap_err();
        assert!(matches!(err, Error::OwnershipConflict { channel_id: CHANNEL }));
        assert_eq!(err.status(), ActionStatus::OwnershipConflict);
        assert_eq!(stored(&channels).await.owner_id, Some(10));
    }

    #[tokio::test]
    async fn claim_is_idempotent_for_owner() {
        let (svc, _, sessions) = service();
        svc.set_channel(10, CHANNEL).await.unwrap();
        svc.set_channel(10, CHANNEL).await.unwrap();
        let session = sessions.get(10).await.unwrap().unwrap();
        assert_eq!(session.active_channel_id, CHANNEL);
    }

    /// Store whose reads wait until both claimants have read, so each sees
    /// the channel unclaimed before either claim lands.
    struct InterleavedReads {
        inner: MemoryChannels,
        readers: Barrier,
    }

    #[async_trait]
    impl ChannelStore for InterleavedReads {
        async fn list(&self) -> Result<Vec<ChannelConfig>> {
            self.inner.list().await
        }

        async fn get(&self, channel_id: i64) -> Result<Option<ChannelConfig>> {
            let record = self.inner.get(channel_id).await;
            self.readers.wait().await;
            record
        }

        async fn claim(&self, channel_id: i64, user_id: i64) -> Result<ChannelConfig> {
            tokio::task::yield_now().await;
            self.inner.claim(channel_id, user_id).await
        }

        async fn apply(
            &self,
            channel_id: i64,
            acting_user: i64,
            edit: ChannelEdit,
        ) -> Result<ChannelConfig> {
            self.inner.apply(channel_id, acting_user, edit).await
        }

        async fn update_display(
            &self,
            channel_id: i64,
            username: Option<&str>,
            title: Option<&str>,
        ) -> Result<()> {
            self.inner.update_display(channel_id, username, title).await
        }

        async fn delete(&self, channel_id: i64, acting_user: i64) -> Result<()> {
            self.inner.delete(channel_id, acting_user).await
        }
    }

    #[tokio::test]
    async fn claim_race_loser_gets_conflict() {
        let channels = Arc::new(InterleavedReads {
            inner: MemoryChannels::default(),
            readers: Barrier::new(2),
        });
        let sessions = Arc::new(MemorySessions::default());
        let svc = ChannelService::new(
            Arc::clone(&channels) as Arc<dyn ChannelStore>,
            Arc::clone(&sessions) as Arc<dyn SessionRegistry>,
        );

        let (a, b) = tokio::join!(svc.set_channel(10, CHANNEL), svc.set_channel(20, CHANNEL));

        let owner = stored(&channels.inner).await.owner_id.unwrap();
        let (winner, loser, loser_id) = if owner == 10 {
            (a, b, 20)
        } else {
            (b, a, 10)
        };
        assert_eq!(winner.unwrap().owner_id, Some(owner));
        assert!(matches!(
            loser,
            Err(Error::OwnershipConflict { channel_id: CHANNEL })
        ));
        assert_eq!(
            sessions.get(owner).await.unwrap().unwrap().active_channel_id,
            CHANNEL
        );
        assert!(sessions.get(loser_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn operations_require_active_channel() {
        let (svc, ..) = service();
        let err = svc.status(10).await.unwrap_err();
        assert!(matches!(err, Error::NoActiveChannel));
        assert_eq!(err.status(), ActionStatus::NotFound);
        assert!(matches!(
            svc.begin_upload(10, PendingUpload::ReplaceOn).await,
            Err(Error::NoActiveChannel)
        ));
        assert!(matches!(
            svc.transfer(10, 20).await,
            Err(Error::NoActiveChannel)
        ));
    }

    #[tokio::test]
    async fn photo_upload_flow() {
        let (svc, channels, sessions) = service();
        svc.set_channel(10, CHANNEL).await.unwrap();

        // Not armed: photo ignored.
        assert!(svc.receive_photo(10, "p0".into()).await.unwrap().is_none());

        svc.begin_upload(10, PendingUpload::AppendOff).await.unwrap();
        let outcome = svc.receive_photo(10, "p1".into()).await.unwrap().unwrap();
        assert_eq!(outcome.count, 1);
        assert_eq!(outcome.pending, PendingUpload::AppendOff);

        svc.begin_upload(10, PendingUpload::AppendOff).await.unwrap();
        svc.receive_photo(10, "p2".into()).await.unwrap();
        assert_eq!(stored(&channels).await.off_images, vec!["p1", "p2"]);

        svc.begin_upload(10, PendingUpload::ReplaceOff).await.unwrap();
        svc.receive_photo(10, "p3".into()).await.unwrap();
        assert_eq!(stored(&channels).await.off_images, vec!["p3"]);

        // Pending state is one-shot.
        assert!(sessions.get(10).await.unwrap().unwrap().pending.is_none());
        assert!(svc.receive_photo(10, "p4".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cancel_upload() {
        let (svc, ..) = service();
        svc.set_channel(10, CHANNEL).await.unwrap();
        assert!(!svc.cancel_upload(10).await.unwrap());
        svc.begin_upload(10, PendingUpload::ReplaceOn).await.unwrap();
        assert!(svc.cancel_upload(10).await.unwrap());
        assert!(svc.receive_photo(10, "p".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_image_out_of_range_keeps_collection() {
        let (svc, channels, _) = service();
        svc.set_channel(10, CHANNEL).await.unwrap();
        for image in ["A", "B"] {
            svc.begin_upload(10, PendingUpload::AppendOn).await.unwrap();
            svc.receive_photo(10, image.into()).await.unwrap();
        }

        let err = svc.remove_image(10, Signal::On, 3).await.unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 3, len: 2 }));
        assert_eq!(err.status(), ActionStatus::InvalidArgument);
        assert_eq!(stored(&channels).await.on_images, vec!["A", "B"]);

        let config = svc.remove_image(10, Signal::On, 1).await.unwrap();
        assert_eq!(config.on_images, vec!["B"]);
    }

    #[tokio::test]
    async fn texts_round_trip_and_reset() {
        let (svc, channels, _) = service();
        svc.set_channel(10, CHANNEL).await.unwrap();

        svc.set_text(10, Signal::On, "X").await.unwrap();
        assert_eq!(stored(&channels).await.trigger_text(Signal::On), "X");

        assert!(matches!(
            svc.set_text(10, Signal::Off, "   ").await,
            Err(Error::EmptyTriggerText)
        ));

        svc.reset_text(10).await.unwrap();
        let config = stored(&channels).await;
        assert_eq!(config.trigger_text(Signal::On), crate::DEFAULT_TEXT_ON);
        assert_eq!(config.trigger_text(Signal::Off), crate::DEFAULT_TEXT_OFF);
    }

    #[tokio::test]
    async fn transfer_moves_authority() {
        let (svc, channels, _) = service();
        svc.set_channel(10, CHANNEL).await.unwrap();
        svc.transfer(10, 20).await.unwrap();
        assert_eq!(stored(&channels).await.owner_id, Some(20));

        // The previous owner's session is now stale.
        assert!(matches!(
            svc.set_text(10, Signal::On, "mine").await,
            Err(Error::OwnershipConflict { .. })
        ));
        assert!(matches!(
            svc.transfer(10, 10).await,
            Err(Error::OwnershipConflict { .. })
        ));

        // The new owner can pick it up.
        svc.set_channel(20, CHANNEL).await.unwrap();
        svc.set_text(20, Signal::On, "ours").await.unwrap();
    }

    #[tokio::test]
    async fn remove_channel_clears_record_and_sessions() {
        let (svc, channels, sessions) = service();
        svc.set_channel(10, CHANNEL).await.unwrap();

        assert_eq!(svc.remove_channel(10).await.unwrap(), CHANNEL);
        assert!(channels.get(CHANNEL).await.unwrap().is_none());
        assert!(sessions.get(10).await.unwrap().is_none());

        // Unclaimed again: anyone may claim.
        assert_eq!(
            svc.set_channel(20, CHANNEL).await.unwrap().owner_id,
            Some(20)
        );
    }

    #[tokio::test]
    async fn handle_post_rewrites_matching_posts() {
        let (svc, channels, _) = service();
        svc.set_channel(10, CHANNEL).await.unwrap();
        svc.set_text(10, Signal::Off, "немає світла").await.unwrap();
        svc.begin_upload(10, PendingUpload::AppendOff).await.unwrap();
        svc.receive_photo(10, "off-photo".into()).await.unwrap();

        let post = ChannelPost {
            channel_id: CHANNEL,
            text: "🔴 немає світла".into(),
            display_username: Some("svitlo".into()),
            display_title: Some("Світло".into()),
        };
        let directive = svc.handle_post(&post).await.unwrap().unwrap();
        assert_eq!(directive.image, "off-photo");
        assert_eq!(directive.caption, "🔴 немає світла");

        let config = stored(&channels).await;
        assert_eq!(config.display_username.as_deref(), Some("svitlo"));
        assert_eq!(config.display_title.as_deref(), Some("Світло"));

        let other = ChannelPost {
            text: "🟢 світло з'явилося".into(),
            ..post
        };
        // Phrase matches but the on collection is empty.
        assert!(svc.handle_post(&other).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn handle_post_ignores_unknown_channels() {
        let (svc, ..) = service();
        let post = ChannelPost {
            channel_id: CHANNEL,
            text: "🔴 світло зникло".into(),
            display_username: None,
            display_title: None,
        };
        assert!(svc.handle_post(&post).await.unwrap().is_none());
    }
}

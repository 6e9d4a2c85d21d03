use std::{future::Future, time::Duration};

use {
    beacon_channels::{RewriteDirective, Signal},
    teloxide::{
        ApiError, RequestError,
        payloads::SendPhotoSetters,
        prelude::*,
        types::{ChatId, InputFile, InputMedia, InputMediaPhoto, MessageId},
    },
    tracing::{debug, info, warn},
};

use crate::error::{Error, Result};

/// Telegram's limit for media captions, in UTF-16 code units.
pub const TELEGRAM_MAX_CAPTION_LEN: usize = 1024;

const TELEGRAM_RETRY_AFTER_MAX_RETRIES: usize = 4;

/// How a rewrite directive ended up being applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// The post was edited in place.
    Edited,
    /// The edit was refused; the post was re-sent as a photo and the
    /// original deleted.
    Reposted,
    /// Re-sent as a photo, but the original could not be deleted.
    Duplicated,
}

pub async fn reply(bot: &Bot, chat_id: ChatId, text: &str) -> Result<()> {
    let text = text.to_string();
    with_retry(chat_id, "send message", || {
        let req = bot.send_message(chat_id, text.clone());
        async move { req.await }
    })
    .await?;
    Ok(())
}

/// Send each image back as a numbered photo. Returns how many were sent.
///
/// A reference Telegram no longer accepts is skipped with a warning so the
/// owner still sees the rest of the collection.
pub async fn send_images(
    bot: &Bot,
    chat_id: ChatId,
    signal: Signal,
    images: &[String],
) -> Result<usize> {
    let mut sent = 0;
    for (i, image) in images.iter().enumerate() {
        let caption = format!("{} {}", signal.marker(), i + 1);
        let result = with_retry(chat_id, "send photo", || {
            let req = bot
                .send_photo(chat_id, InputFile::file_id(image.clone()))
                .caption(caption.clone());
            async move { req.await }
        })
        .await;
        match result {
            Ok(_) => sent += 1,
            Err(e) => warn!(chat_id = chat_id.0, index = i + 1, error = %e, "failed to send stored image"),
        }
    }
    Ok(sent)
}

/// Attach the directive's image to a channel post, keeping its text as the
/// caption.
///
/// Telegram refuses to turn a text-only message into a media message, so a
/// failed edit falls back to posting the photo and deleting the original.
/// The original is only deleted once the replacement exists.
pub async fn apply_rewrite(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    directive: &RewriteDirective,
) -> Result<RewriteOutcome> {
    check_caption(&directive.caption)?;

    let edit = with_retry(chat_id, "edit message media", || {
        let media = InputMedia::Photo(
            InputMediaPhoto::new(InputFile::file_id(directive.image.clone()))
                .caption(directive.caption.clone()),
        );
        let req = bot.edit_message_media(chat_id, message_id, media);
        async move { req.await }
    })
    .await;

    match edit {
        Ok(_) => {
            info!(chat_id = chat_id.0, message_id = message_id.0, signal = %directive.signal, "post edited");
            return Ok(RewriteOutcome::Edited);
        },
        Err(e) if is_message_not_modified_error(&e) => {
            debug!(chat_id = chat_id.0, message_id = message_id.0, "post already carries the image");
            return Ok(RewriteOutcome::Edited);
        },
        Err(e) => {
            debug!(chat_id = chat_id.0, message_id = message_id.0, error = %e, "in-place edit refused, reposting");
        },
    }

    with_retry(chat_id, "send photo", || {
        let req = bot
            .send_photo(chat_id, InputFile::file_id(directive.image.clone()))
            .caption(directive.caption.clone());
        async move { req.await }
    })
    .await?;

    if let Err(e) = with_retry(chat_id, "delete message", || {
        let req = bot.delete_message(chat_id, message_id);
        async move { req.await }
    })
    .await
    {
        warn!(chat_id = chat_id.0, message_id = message_id.0, error = %e, "reposted photo but failed to delete original post");
        return Ok(RewriteOutcome::Duplicated);
    }

    info!(chat_id = chat_id.0, message_id = message_id.0, signal = %directive.signal, "post reposted with image");
    Ok(RewriteOutcome::Reposted)
}

fn check_caption(caption: &str) -> Result<()> {
    let len = caption.encode_utf16().count();
    if len > TELEGRAM_MAX_CAPTION_LEN {
        return Err(Error::CaptionTooLong {
            len,
            limit: TELEGRAM_MAX_CAPTION_LEN,
        });
    }
    Ok(())
}

async fn with_retry<T, F, Fut>(
    chat_id: ChatId,
    operation: &'static str,
    mut request: F,
) -> std::result::Result<T, RequestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, RequestError>>,
{
    let mut retries = 0usize;

    loop {
        match request().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let Some(wait) = retry_after_duration(&err) else {
                    return Err(err);
                };

                if retries >= TELEGRAM_RETRY_AFTER_MAX_RETRIES {
                    warn!(
                        chat_id = chat_id.0,
                        operation,
                        retries,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limit persisted after retries"
                    );
                    return Err(err);
                }

                retries += 1;
                warn!(
                    chat_id = chat_id.0,
                    operation,
                    retries,
                    retry_after_secs = wait.as_secs(),
                    "telegram rate limited, waiting before retry"
                );
                tokio::time::sleep(wait).await;
            },
        }
    }
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}

fn is_message_not_modified_error(error: &RequestError) -> bool {
    matches!(error, RequestError::Api(ApiError::MessageNotModified))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_duration_extracts_wait() {
        let err = RequestError::RetryAfter(teloxide::types::Seconds::from_seconds(42));
        assert_eq!(retry_after_duration(&err), Some(Duration::from_secs(42)));
    }

    #[test]
    fn retry_after_duration_ignores_other_errors() {
        let err = RequestError::Io(std::io::Error::other("boom"));
        assert_eq!(retry_after_duration(&err), None);
    }

    #[test]
    fn message_not_modified_is_recognised() {
        assert!(is_message_not_modified_error(&RequestError::Api(
            ApiError::MessageNotModified
        )));
        assert!(!is_message_not_modified_error(&RequestError::Io(
            std::io::Error::other("boom")
        )));
    }

    #[test]
    fn caption_limit_counts_utf16_units() {
        assert!(check_caption(&"a".repeat(TELEGRAM_MAX_CAPTION_LEN)).is_ok());
        // Each marker glyph is two UTF-16 units.
        let caption = "🔴".repeat(TELEGRAM_MAX_CAPTION_LEN / 2 + 1);
        assert!(matches!(
            check_caption(&caption),
            Err(Error::CaptionTooLong { len, .. }) if len == TELEGRAM_MAX_CAPTION_LEN + 2
        ));
    }

    #[tokio::test]
    async fn oversized_caption_is_refused_before_any_request() {
        let bot = Bot::new("0:test").set_api_url("http://127.0.0.1:9".parse().unwrap());
        let directive = RewriteDirective {
            signal: Signal::Off,
            image: "file".into(),
            caption: "x".repeat(TELEGRAM_MAX_CAPTION_LEN + 1),
        };
        let result = apply_rewrite(&bot, ChatId(-100), MessageId(1), &directive).await;
        assert!(matches!(result, Err(Error::CaptionTooLong { .. })));
    }
}

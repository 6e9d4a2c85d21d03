use std::{sync::Arc, time::Duration};

use {
    secrecy::ExposeSecret,
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, BotCommand, UpdateKind},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use {beacon_channels::ChannelService, beacon_config::TelegramConfig};

use crate::{commands::COMMAND_LIST, handlers, state::BotState};

/// Start the long-polling loop.
///
/// Spawns a background task that processes updates until the returned
/// `CancellationToken` is cancelled. The task cancels the token itself when
/// another instance takes over the same bot token.
pub async fn start_polling(
    config: &TelegramConfig,
    service: Arc<ChannelService>,
) -> anyhow::Result<CancellationToken> {
    // The HTTP client timeout must outlast the long-polling timeout so the
    // request isn't aborted before Telegram responds.
    let poll_timeout = config.poll_timeout_secs;
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(u64::from(poll_timeout) + 15))
        .build()?;
    let bot = Bot::with_client(config.token.expose_secret(), client);

    let me = bot.get_me().await?;
    let bot_username = me.username.clone();

    // Long polling does not work while a webhook is set.
    bot.delete_webhook().send().await?;

    if config.register_commands {
        let commands = COMMAND_LIST
            .iter()
            .map(|(name, description)| BotCommand::new(*name, *description))
            .collect::<Vec<_>>();
        if let Err(e) = bot.set_my_commands(commands).await {
            warn!(error = %e, "failed to register bot commands");
        }
    }

    info!(username = ?bot_username, "telegram bot connected (webhook cleared)");

    let cancel = CancellationToken::new();
    let state = BotState {
        bot: bot.clone(),
        bot_username,
        service,
    };

    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        info!("starting telegram polling loop");
        let mut offset: i32 = 0;

        loop {
            let request = bot
                .get_updates()
                .offset(offset)
                .timeout(poll_timeout)
                .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::ChannelPost])
                .send();

            let result = tokio::select! {
                () = cancel_clone.cancelled() => {
                    info!("telegram polling stopped");
                    break;
                },
                result = request => result,
            };

            match result {
                Ok(updates) => {
                    debug!(count = updates.len(), "got telegram updates");
                    for update in updates {
                        offset = update.id.as_offset();
                        dispatch(update.kind, &state).await;
                    }
                },
                Err(e) => {
                    if matches!(&e, RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) {
                        warn!(
                            "telegram polling disabled: another instance is already running with this token"
                        );
                        cancel_clone.cancel();
                        break;
                    }

                    warn!(error = %e, "telegram getUpdates failed");
                    tokio::select! {
                        () = cancel_clone.cancelled() => break,
                        () = tokio::time::sleep(Duration::from_secs(5)) => {},
                    }
                },
            }
        }
    });

    Ok(cancel)
}

async fn dispatch(kind: UpdateKind, state: &BotState) {
    match kind {
        UpdateKind::Message(msg) => {
            let chat_id = msg.chat.id.0;
            debug!(chat_id, "received telegram message");
            if let Err(e) = handlers::handle_message(msg, state).await {
                error!(chat_id, error = %e, "error handling telegram message");
            }
        },
        UpdateKind::ChannelPost(msg) => {
            let channel_id = msg.chat.id.0;
            debug!(channel_id, "received channel post");
            if let Err(e) = handlers::handle_channel_post(msg, state).await {
                error!(channel_id, error = %e, "error handling channel post");
            }
        },
        other => {
            debug!("ignoring update: {other:?}");
        },
    }
}

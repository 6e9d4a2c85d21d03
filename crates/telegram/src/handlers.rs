use {
    beacon_channels::{ActionStatus, ChannelPost, Error},
    teloxide::{prelude::*, types::MessageOrigin},
    tracing::{debug, error, info, warn},
};

use crate::{
    commands::{self, Command},
    outbound,
    replies::{self, ReplyContext},
    state::BotState,
};

/// Handle a message in a chat with the bot. Anything outside private chats
/// is ignored.
pub async fn handle_message(msg: Message, state: &BotState) -> anyhow::Result<()> {
    if !msg.chat.is_private() {
        debug!(chat_id = msg.chat.id.0, "ignoring non-private message");
        return Ok(());
    }
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };
    let chat_id = msg.chat.id;

    if let Some(file_id) = extract_photo_file_id(&msg) {
        match state.service.receive_photo(user_id, file_id).await {
            Ok(Some(outcome)) => {
                return reply(state, chat_id, &replies::photo_stored(&outcome)).await;
            },
            Ok(None) => debug!(user_id, "photo with nothing pending"),
            Err(e) => return reply_error(state, chat_id, user_id, &e, ReplyContext::Manage).await,
        }
    }

    if let Some(channel_id) = forwarded_channel_id(&msg) {
        return reply(state, chat_id, &replies::forwarded_channel(channel_id)).await;
    }

    let Some(text) = msg.text() else {
        return Ok(());
    };
    let command = match commands::parse(text, state.bot_username.as_deref()) {
        None => return Ok(()),
        Some(Ok(command)) => command,
        Some(Err(e)) => return reply_error(state, chat_id, user_id, &e, ReplyContext::Manage).await,
    };

    debug!(user_id, ?command, "running command");
    let context = match command {
        Command::SetChannel(_) => ReplyContext::Claim,
        _ => ReplyContext::Manage,
    };
    match run_command(command, user_id, chat_id, state).await {
        Ok(Some(text)) => reply(state, chat_id, &text).await,
        Ok(None) => Ok(()),
        Err(CommandFailure::Channel(e)) => reply_error(state, chat_id, user_id, &e, context).await,
        Err(CommandFailure::Transport(e)) => Err(e),
    }
}

enum CommandFailure {
    Channel(Error),
    Transport(anyhow::Error),
}

impl From<Error> for CommandFailure {
    fn from(e: Error) -> Self {
        Self::Channel(e)
    }
}

/// Run one command. Returns the reply text, or `None` when the command
/// already answered on its own.
async fn run_command(
    command: Command,
    user_id: i64,
    chat_id: ChatId,
    state: &BotState,
) -> Result<Option<String>, CommandFailure> {
    let service = &state.service;
    let text = match command {
        Command::Help => replies::HELP.to_string(),
        Command::SetChannel(channel_id) => {
            replies::channel_selected(&service.set_channel(user_id, channel_id).await?)
        },
        Command::BeginUpload(pending) => {
            replies::awaiting_photo(pending, &service.begin_upload(user_id, pending).await?)
        },
        Command::RemoveImage { signal, index } => {
            let config = service.remove_image(user_id, signal, index).await?;
            replies::image_removed(signal, index, &config)
        },
        Command::ListImages(signal) => {
            let images = service.images(user_id, signal).await?;
            if images.is_empty() {
                replies::no_images(signal)
            } else {
                outbound::send_images(&state.bot, chat_id, signal, &images)
                    .await
                    .map_err(|e| CommandFailure::Transport(e.into()))?;
                return Ok(None);
            }
        },
        Command::SetText { signal, text } => {
            replies::text_set(signal, &service.set_text(user_id, signal, &text).await?)
        },
        Command::ResetText => {
            service.reset_text(user_id).await?;
            replies::TEXT_RESET.to_string()
        },
        Command::Status => replies::status(&service.status(user_id).await?),
        Command::Transfer(new_owner) => {
            replies::transferred(&service.transfer(user_id, new_owner).await?)
        },
        Command::RemoveChannel => replies::channel_removed(service.remove_channel(user_id).await?),
        Command::Cancel => {
            if service.cancel_upload(user_id).await? {
                replies::UPLOAD_CANCELLED.to_string()
            } else {
                replies::NOTHING_PENDING.to_string()
            }
        },
        Command::Unknown(name) => {
            debug!(user_id, name = %name, "unknown command");
            replies::UNKNOWN_COMMAND.to_string()
        },
    };
    Ok(Some(text))
}

/// Handle a new post in a channel the bot administers.
pub async fn handle_channel_post(msg: Message, state: &BotState) -> anyhow::Result<()> {
    let Some(post) = channel_post(&msg) else {
        debug!(chat_id = msg.chat.id.0, "ignoring channel post without text");
        return Ok(());
    };

    let directive = match state.service.handle_post(&post).await {
        Ok(Some(directive)) => directive,
        Ok(None) => return Ok(()),
        Err(e) => {
            error!(channel_id = post.channel_id, error = %e, "failed to evaluate channel post");
            return Ok(());
        },
    };

    let outcome = outbound::apply_rewrite(&state.bot, msg.chat.id, msg.id, &directive).await?;
    info!(channel_id = post.channel_id, ?outcome, "channel post rewritten");
    Ok(())
}

async fn reply(state: &BotState, chat_id: ChatId, text: &str) -> anyhow::Result<()> {
    outbound::reply(&state.bot, chat_id, text).await?;
    Ok(())
}

async fn reply_error(
    state: &BotState,
    chat_id: ChatId,
    user_id: i64,
    err: &Error,
    context: ReplyContext,
) -> anyhow::Result<()> {
    if err.status() == ActionStatus::Failure {
        error!(user_id, error = %err, "command failed");
    } else {
        debug!(user_id, status = ?err.status(), error = %err, "command rejected");
    }
    reply(state, chat_id, &replies::error(err, context)).await
}

fn sender_id(msg: &Message) -> Option<i64> {
    let user = msg.from.as_ref()?;
    match i64::try_from(user.id.0) {
        Ok(id) => Some(id),
        Err(_) => {
            warn!(user_id = user.id.0, "user id out of range");
            None
        },
    }
}

/// File id of the largest size of a photo message.
fn extract_photo_file_id(msg: &Message) -> Option<String> {
    msg.photo()
        .and_then(|sizes| sizes.last())
        .map(|ps| ps.file.id.clone())
}

/// Id of the channel a message was forwarded from, if any.
fn forwarded_channel_id(msg: &Message) -> Option<i64> {
    match msg.forward_origin()? {
        MessageOrigin::Channel { chat, .. } => Some(chat.id.0),
        _ => None,
    }
}

fn channel_post(msg: &Message) -> Option<ChannelPost> {
    let text = msg.text()?;
    Some(ChannelPost {
        channel_id: msg.chat.id.0,
        text: text.to_string(),
        display_username: msg.chat.username().map(str::to_string),
        display_title: msg.chat.title().map(str::to_string),
    })
}

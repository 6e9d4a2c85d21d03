//! Slash-command parsing for private chats.

use {
    beacon_channels::{Error, Result, Signal},
    beacon_sessions::PendingUpload,
};

/// A recognised bot command with its parsed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    SetChannel(i64),
    BeginUpload(PendingUpload),
    RemoveImage { signal: Signal, index: i64 },
    ListImages(Signal),
    /// `text` is the raw rest of the line; validation happens downstream.
    SetText { signal: Signal, text: String },
    ResetText,
    Status,
    Transfer(i64),
    RemoveChannel,
    Cancel,
    Unknown(String),
}

/// Commands registered with Telegram for autocomplete.
pub const COMMAND_LIST: &[(&str, &str)] = &[
    ("help", "Список команд"),
    ("set_channel", "Вибрати канал для налаштування"),
    ("set_on", "Замінити зображення для 🟢"),
    ("set_off", "Замінити зображення для 🔴"),
    ("add_on", "Додати зображення для 🟢"),
    ("add_off", "Додати зображення для 🔴"),
    ("remove_on", "Видалити зображення 🟢 за номером"),
    ("remove_off", "Видалити зображення 🔴 за номером"),
    ("list_on", "Показати зображення 🟢"),
    ("list_off", "Показати зображення 🔴"),
    ("set_text_on", "Фраза для 🟢"),
    ("set_text_off", "Фраза для 🔴"),
    ("reset_text", "Стандартні фрази"),
    ("status", "Налаштування каналу"),
    ("transfer", "Передати права власності"),
    ("remove_channel", "Видалити налаштування каналу"),
    ("cancel", "Скасувати очікування фото"),
];

/// Parse a message as a command.
///
/// Returns `None` for plain text and for commands addressed to another bot
/// (`/cmd@otherbot`). Argument errors come back as
/// [`Error::InvalidArgument`] carrying the reply text.
pub fn parse(text: &str, bot_username: Option<&str>) -> Option<Result<Command>> {
    let text = text.trim_start();
    let body = text.strip_prefix('/')?;
    let (head, rest) = match body.find(char::is_whitespace) {
        Some(pos) => (&body[..pos], &body[pos..]),
        None => (body, ""),
    };
    let (name, mention) = match head.split_once('@') {
        Some((name, mention)) => (name, Some(mention)),
        None => (head, None),
    };
    if let (Some(mention), Some(me)) = (mention, bot_username)
        && !mention.eq_ignore_ascii_case(me)
    {
        return None;
    }
    if name.is_empty() {
        return None;
    }

    let mut args = rest.split_whitespace();
    let command = match name.to_ascii_lowercase().as_str() {
        "start" | "help" => Ok(Command::Help),
        "set_channel" => {
            integer_arg(args.next(), "/set_channel <channel_id>", "❌ Невірний ID каналу")
                .map(Command::SetChannel)
        },
        "set_on" => Ok(Command::BeginUpload(PendingUpload::ReplaceOn)),
        "set_off" => Ok(Command::BeginUpload(PendingUpload::ReplaceOff)),
        "add_on" => Ok(Command::BeginUpload(PendingUpload::AppendOn)),
        "add_off" => Ok(Command::BeginUpload(PendingUpload::AppendOff)),
        "remove_on" => remove(Signal::On, args.next(), "/remove_on <номер>"),
        "remove_off" => remove(Signal::Off, args.next(), "/remove_off <номер>"),
        "list_on" => Ok(Command::ListImages(Signal::On)),
        "list_off" => Ok(Command::ListImages(Signal::Off)),
        "set_text_on" => Ok(Command::SetText {
            signal: Signal::On,
            text: rest.trim().to_string(),
        }),
        "set_text_off" => Ok(Command::SetText {
            signal: Signal::Off,
            text: rest.trim().to_string(),
        }),
        "reset_text" => Ok(Command::ResetText),
        "status" => Ok(Command::Status),
        "transfer" => integer_arg(args.next(), "/transfer <user_id>", "❌ Невірний ID користувача")
            .map(Command::Transfer),
        "remove_channel" => Ok(Command::RemoveChannel),
        "cancel" => Ok(Command::Cancel),
        other => Ok(Command::Unknown(other.to_string())),
    };
    Some(command)
}

fn remove(signal: Signal, arg: Option<&str>, usage: &str) -> Result<Command> {
    integer_arg(arg, usage, "❌ Невірний номер зображення")
        .map(|index| Command::RemoveImage { signal, index })
}

fn integer_arg(arg: Option<&str>, usage: &str, malformed: &str) -> Result<i64> {
    let arg = arg.ok_or_else(|| Error::invalid_argument(format!("Використання: {usage}")))?;
    arg.parse::<i64>()
        .map_err(|_| Error::invalid_argument(malformed))
}

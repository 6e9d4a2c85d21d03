//! User-facing reply texts.

use {
    beacon_channels::{ChannelConfig, Error, Signal, UploadOutcome},
    beacon_sessions::PendingUpload,
};

pub const HELP: &str = "Команди:\n\
/set_channel <channel_id> - встановити канал для налаштування\n\
/set_on, /set_off - замінити зображення для 🟢 / 🔴\n\
/add_on, /add_off - додати зображення для 🟢 / 🔴\n\
/remove_on <n>, /remove_off <n> - видалити зображення за номером\n\
/list_on, /list_off - показати зображення\n\
/set_text_on <фраза>, /set_text_off <фраза> - змінити фразу-тригер\n\
/reset_text - повернути стандартні фрази\n\
/status - перевірити налаштування\n\
/transfer <user_id> - передати права власності\n\
/remove_channel - видалити налаштування каналу\n\
/cancel - скасувати очікування фото\n\n\
Щоб дізнатися ID каналу, перешліть будь-яке повідомлення з каналу сюди.";

pub const UNKNOWN_COMMAND: &str = "Невідома команда. Список команд: /help";

/// Where an error happened, for picking the right wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyContext {
    /// `/set_channel`: a conflict means someone else owns the channel.
    Claim,
    /// Any command acting on the active channel.
    Manage,
}

pub fn error(err: &Error, context: ReplyContext) -> String {
    match err {
        Error::OwnershipConflict { .. } => match context {
            ReplyContext::Claim => "❌ Цей канал вже налаштований іншим користувачем".into(),
            ReplyContext::Manage => "❌ Ви не є власником цього каналу".into(),
        },
        Error::NoActiveChannel => "❌ Спочатку встановіть канал: /set_channel <channel_id>".into(),
        Error::NotFound { channel_id } => format!(
            "❌ Канал {channel_id} не налаштований. Встановіть його знову: /set_channel {channel_id}"
        ),
        Error::InvalidArgument { message } => message.clone(),
        Error::IndexOutOfRange { len: 0, .. } => "❌ Немає зображень для видалення".into(),
        Error::IndexOutOfRange { index, len } => {
            format!("❌ Невірний номер {index}: доступно від 1 до {len}")
        },
        Error::EmptyTriggerText => "❌ Фраза не може бути порожньою".into(),
        Error::Session(_) | Error::External { .. } => {
            "⚠️ Сталася помилка, спробуйте пізніше".into()
        },
    }
}

pub fn channel_selected(config: &ChannelConfig) -> String {
    format!("✅ Активний канал: {}", config.display_name())
}

pub fn forwarded_channel(channel_id: i64) -> String {
    format!("ID каналу: {channel_id}\n\nВикористайте: /set_channel {channel_id}")
}

pub fn status(config: &ChannelConfig) -> String {
    let owner = config
        .owner_id
        .map_or_else(|| "не призначено".to_string(), |id| id.to_string());
    let mut lines = vec![
        format!("Канал: {} ({})", config.display_name(), config.channel_id),
        format!("Власник: {owner}"),
    ];
    for signal in [Signal::Off, Signal::On] {
        lines.push(format!(
            "{} зображень: {}",
            signal.marker(),
            config.images(signal).len()
        ));
    }
    for (signal, custom) in [
        (Signal::Off, config.text_off.is_some()),
        (Signal::On, config.text_on.is_some()),
    ] {
        let suffix = if custom { "" } else { " (стандартна)" };
        lines.push(format!(
            "{} фраза: {}{suffix}",
            signal.marker(),
            config.trigger_text(signal)
        ));
    }
    lines.join("\n")
}

pub fn awaiting_photo(pending: PendingUpload, config: &ChannelConfig) -> String {
    let signal = Signal::from(pending);
    let phrase = config.trigger_text(signal);
    if pending.replaces() {
        format!("Надішліть фото для {} ({phrase})", signal.marker())
    } else {
        format!(
            "Надішліть фото, щоб додати до {} ({phrase}); зараз: {}",
            signal.marker(),
            config.images(signal).len()
        )
    }
}

pub fn photo_stored(outcome: &UploadOutcome) -> String {
    let marker = Signal::from(outcome.pending).marker();
    if outcome.pending.replaces() {
        format!("✅ Зображення для {marker} збережено")
    } else {
        format!("✅ Зображення додано до {marker} (всього: {})", outcome.count)
    }
}

pub fn image_removed(signal: Signal, index: i64, config: &ChannelConfig) -> String {
    format!(
        "✅ Зображення {index} для {} видалено (залишилось: {})",
        signal.marker(),
        config.images(signal).len()
    )
}

pub fn no_images(signal: Signal) -> String {
    format!("Немає зображень для {}", signal.marker())
}

pub fn text_set(signal: Signal, config: &ChannelConfig) -> String {
    format!(
        "✅ Фраза для {}: {}",
        signal.marker(),
        config.trigger_text(signal)
    )
}

pub const TEXT_RESET: &str = "✅ Фрази повернуто до стандартних";

pub fn transferred(config: &ChannelConfig) -> String {
    match config.owner_id {
        Some(owner) => format!("✅ Права власності передано користувачу {owner}"),
        None => "✅ Права власності передано".into(),
    }
}

pub fn channel_removed(channel_id: i64) -> String {
    format!("✅ Налаштування каналу {channel_id} видалено")
}

pub const UPLOAD_CANCELLED: &str = "✅ Очікування фото скасовано";
pub const NOTHING_PENDING: &str = "Немає очікуваного фото";

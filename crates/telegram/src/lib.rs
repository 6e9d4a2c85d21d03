//! Telegram transport for the status broadcast bot.
//!
//! Receives administrative commands in private chats and new posts in the
//! channels the bot administers, using teloxide's long polling. Matching
//! posts are edited to carry the configured image.

pub mod bot;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod outbound;
pub mod replies;
pub mod state;

pub use {
    bot::start_polling,
    error::{Error, Result},
};

use std::sync::Arc;

use beacon_channels::ChannelService;

/// Runtime state shared by the polling loop and the update handlers.
pub struct BotState {
    pub bot: teloxide::Bot,
    pub bot_username: Option<String>,
    pub service: Arc<ChannelService>,
}

//! Per-channel status broadcast engine.
//!
//! Each monitored channel has an owner, two image collections (the "on" and
//! "off" states) and two trigger phrases. A new channel post whose text
//! matches a trigger is rewritten in place with a random image from the
//! matching collection.

pub mod error;
pub mod gating;
pub mod images;
pub mod model;
pub mod rewrite;
pub mod service;
pub mod store;

pub use {
    error::{ActionStatus, Error, Result},
    model::{ChannelConfig, ChannelEdit, ChannelPost, DEFAULT_TEXT_OFF, DEFAULT_TEXT_ON, Signal},
    rewrite::RewriteDirective,
    service::{ChannelService, UploadOutcome},
    store::ChannelStore,
};

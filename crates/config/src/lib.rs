//! Configuration loading and env substitution.
//!
//! Config files: `beacon.toml`, `beacon.yaml`, `beacon.yml` or `beacon.json`,
//! searched in `./` then `~/.config/beacon/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in the raw
//! file.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{
        apply_env_overrides, config_dir, data_dir, discover_and_load, load_config,
        set_config_dir, set_data_dir,
    },
    schema::{BeaconConfig, StorageConfig, TelegramConfig},
};

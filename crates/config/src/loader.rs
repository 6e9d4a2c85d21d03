use std::{
    io,
    path::{Path, PathBuf},
    sync::RwLock,
};

use {
    secrecy::{ExposeSecret, Secret},
    tracing::{debug, warn},
};

use crate::{Error, Result, env_subst::substitute_env, schema::BeaconConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["beacon.toml", "beacon.yaml", "beacon.yml", "beacon.json"];

/// Plain-text token file read when neither the config nor the environment
/// provides one.
const TOKEN_FILE: &str = "token.txt";

static CONFIG_DIR_OVERRIDE: RwLock<Option<PathBuf>> = RwLock::new(None);
static DATA_DIR_OVERRIDE: RwLock<Option<PathBuf>> = RwLock::new(None);

/// Override the user-global config directory.
pub fn set_config_dir(path: PathBuf) {
    *CONFIG_DIR_OVERRIDE
        .write()
        .unwrap_or_else(|e| e.into_inner()) = Some(path);
}

/// Override the data directory.
pub fn set_data_dir(path: PathBuf) {
    *DATA_DIR_OVERRIDE.write().unwrap_or_else(|e| e.into_inner()) = Some(path);
}

/// Returns the user-global config directory (`~/.config/beacon/`).
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = CONFIG_DIR_OVERRIDE
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
    {
        return Some(dir);
    }
    directories::ProjectDirs::from("", "", "beacon").map(|d| d.config_dir().to_path_buf())
}

/// Returns the data directory, falling back to `./` when no home is known.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = DATA_DIR_OVERRIDE
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
    {
        return dir;
    }
    directories::ProjectDirs::from("", "", "beacon")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<BeaconConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&substitute_env(&raw), path)
}

/// Discover, load and complete the config.
///
/// Search order:
/// 1. `./beacon.{toml,yaml,yml,json}` (project-local)
/// 2. `<config dir>/beacon.{toml,yaml,yml,json}` (user-global)
///
/// Missing files yield defaults; a file that exists but fails to parse is an
/// error. Environment overrides are applied afterwards.
pub fn discover_and_load() -> Result<BeaconConfig> {
    let config = match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path)?
        },
        None => {
            debug!("no config file found, using defaults");
            BeaconConfig::default()
        },
    };
    Ok(apply_env_overrides(config))
}

/// Fill the bot token from `BOT_TOKEN` or `token.txt` when the config has none.
pub fn apply_env_overrides(config: BeaconConfig) -> BeaconConfig {
    apply_overrides_with(
        config,
        |name| std::env::var(name).ok(),
        Path::new(TOKEN_FILE),
    )
}

fn apply_overrides_with(
    mut config: BeaconConfig,
    lookup: impl Fn(&str) -> Option<String>,
    token_file: &Path,
) -> BeaconConfig {
    if !config.telegram.token.expose_secret().trim().is_empty() {
        return config;
    }
    if let Some(token) = lookup("BOT_TOKEN").filter(|t| !t.trim().is_empty()) {
        config.telegram.token = Secret::new(token.trim().to_string());
        return config;
    }
    match read_token_file(token_file) {
        Ok(Some(token)) if !token.trim().is_empty() => {
            debug!(path = %token_file.display(), "using bot token from file");
            config.telegram.token = Secret::new(token.trim().to_string());
        },
        Ok(Some(_)) => warn!(path = %token_file.display(), "token file is empty"),
        Ok(None) => {},
        Err(e) => warn!(path = %token_file.display(), error = %e, "failed to read token file"),
    }
    config
}

/// Contents of the token file, or `None` when it does not exist.
fn read_token_file(path: &Path) -> io::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(token) => Ok(Some(token)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

fn parse_config(raw: &str, path: &Path) -> Result<BeaconConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => Err(Error::UnsupportedFormat {
            ext: ext.to_string(),
        }),
    }
}

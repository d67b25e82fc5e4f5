//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the access token is missing there, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! Every loaded configuration is validated before it is returned.
//!
//! ## Environment Variables
//! - `WHENIS_ACCESS_TOKEN` (required): bearer token for the calendar API
//! - `WHENIS_API_BASE_URL`: calendar API root
//! - `WHENIS_TIMEZONE`: IANA zone for date-only events
//! - `WHENIS_PRIMARY_CALENDAR`: id of the calendar new events go to
//! - `WHENIS_REFRESH_INTERVAL`: directory refresh interval in seconds
//! - `WHENIS_QUERY_DEADLINE`: per-request deadline in seconds
//! - `WHENIS_MAX_CONCURRENCY`: concurrent calendar queries per request
//! - `WHENIS_BACKGROUND_REFRESH`: keep the directory warm (true/false)
//!
//! ## File Locations
//! The loader probes `whenis.{toml,json}` then `config.{toml,json}` in the
//! current directory, its two parents, and next to the executable.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use whenis_domain::{Config, Result, WhenisError};

const CONFIG_FILE_NAMES: &[&str] = &["whenis.toml", "whenis.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `WhenisError::Config` if neither source yields a valid
/// configuration.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Only the access token is required; everything else falls back to the
/// defaults in [`Config::default`].
///
/// # Errors
/// Returns `WhenisError::Config` if the token is missing or a value does not
/// parse.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();
    config.calendar.access_token = Some(env_var("WHENIS_ACCESS_TOKEN")?);
    apply_env_overrides(&mut config)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. A token set in
/// `WHENIS_ACCESS_TOKEN` wins over one stored in the file.
///
/// # Errors
/// Returns `WhenisError::Config` if the file is missing, malformed, or
/// fails validation.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(WhenisError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            WhenisError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| WhenisError::Config(format!("Failed to read config file: {e}")))?;

    let mut config = parse_config(&contents, &config_path)?;
    if let Some(token) = env_opt("WHENIS_ACCESS_TOKEN") {
        config.calendar.access_token = Some(token);
    }
    config.validate()?;
    Ok(config)
}

/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| WhenisError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| WhenisError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(WhenisError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a config file
///
/// Returns the first existing candidate, or `None`.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.extend([exe_dir.to_path_buf(), exe_dir.join(".."), exe_dir.join("../..")]);
        }
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Some(url) = env_opt("WHENIS_API_BASE_URL") {
        config.calendar.api_base_url = url;
    }
    if let Some(tz) = env_opt("WHENIS_TIMEZONE") {
        config.calendar.timezone = tz;
    }
    if let Some(primary) = env_opt("WHENIS_PRIMARY_CALENDAR") {
        config.calendar.primary_calendar_id = primary;
    }
    if let Some(secs) = env_parse("WHENIS_REFRESH_INTERVAL")? {
        config.directory.refresh_interval_secs = secs;
    }
    if let Some(secs) = env_parse("WHENIS_QUERY_DEADLINE")? {
        config.query.deadline_secs = secs;
    }
    if let Some(limit) = env_parse("WHENIS_MAX_CONCURRENCY")? {
        config.query.max_concurrency = limit;
    }
    config.directory.background_refresh =
        env_bool("WHENIS_BACKGROUND_REFRESH", config.directory.background_refresh);
    Ok(())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| {
        WhenisError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Optional variable; blank counts as unset.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| WhenisError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

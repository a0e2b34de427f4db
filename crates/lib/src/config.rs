//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.echobot/config.json`) and environment.
//! Every field has a default, so a missing file or `{}` runs the bot as-is.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Path the health probe is served on; the webhook path must not collide with it.
pub const HEALTH_PATH: &str = "/health";

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Bot reply settings.
    #[serde(default)]
    pub bot: BotConfig,

    /// Log level and target.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Bind address, port, and webhook path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Port for HTTP (default 8080). Overridden by PORT env.
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1"). Use "0.0.0.0" when running behind the platform's ingress.
    #[serde(default = "default_server_bind")]
    pub bind: String,

    /// Path the chat platform POSTs events to (default "/").
    #[serde(default = "default_webhook_path")]
    pub path: String,
}

fn default_server_port() -> u16 {
    8080
}

fn default_server_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_webhook_path() -> String {
    "/".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
            bind: default_server_bind(),
            path: default_webhook_path(),
        }
    }
}

/// Reply settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotConfig {
    /// Text sent when the bot is added to a space (default "Hi!").
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

fn default_greeting() -> String {
    "Hi!".to_string()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            greeting: default_greeting(),
        }
    }
}

/// Logging settings. RUST_LOG, when set, takes precedence over `level`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Default filter for env_logger (e.g. "info", "debug", "echobot=debug").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log target used by the event handler for per-request lines.
    #[serde(default = "default_log_target")]
    pub target: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_target() -> String {
    "echobot::events".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            target: default_log_target(),
        }
    }
}

/// Resolve the listen port: env PORT (set by hosting platforms) overrides config.
pub fn resolve_port(config: &Config) -> u16 {
    port_from_env(std::env::var("PORT").ok().as_deref()).unwrap_or(config.server.port)
}

fn port_from_env(value: Option<&str>) -> Option<u16> {
    let v = value?.trim();
    if v.is_empty() {
        return None;
    }
    match v.parse::<u16>() {
        Ok(p) => Some(p),
        Err(_) => {
            log::warn!("ignoring invalid PORT value: {}", v);
            None
        }
    }
}

/// Check values serde cannot: webhook path shape and a non-empty greeting.
pub fn validate(config: &Config) -> Result<()> {
    let path = config.server.path.as_str();
    if !path.starts_with('/') {
        anyhow::bail!("server.path must start with '/' (got {:?})", path);
    }
    if path.contains(':') || path.contains('*') {
        anyhow::bail!(
            "server.path must be a literal path without ':' or '*' (got {:?})",
            path
        );
    }
    if path == HEALTH_PATH {
        anyhow::bail!("server.path must not be {} (reserved for the health probe)", HEALTH_PATH);
    }
    if config.bot.greeting.trim().is_empty() {
        anyhow::bail!("bot.greeting must not be empty");
    }
    Ok(())
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("ECHOBOT_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".echobot").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path, else the default path (or ECHOBOT_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    validate(&config).with_context(|| format!("invalid config in {}", path.display()))?;
    Ok((config, path))
}

/// Write a default config file if none exists. Returns true when a file was written.
pub fn write_default_config(path: &std::path::Path) -> Result<bool> {
    if path.exists() {
        log::debug!("config already exists at {}, skipping", path.display());
        return Ok(false);
    }
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating config directory {}", dir.display()))?;
    }
    let body = serde_json::to_string_pretty(&Config::default())?;
    std::fs::write(path, body)
        .with_context(|| format!("writing default config to {}", path.display()))?;
    log::info!("created default config at {}", path.display());
    Ok(true)
}

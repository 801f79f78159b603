//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `EQBRIDGE_DISCORD_TOKEN` - Discord bot token
//! - `EQBRIDGE_TELNET_HOST` - telnet console `host:port`
//! - `EQBRIDGE_TELNET_USERNAME` - telnet console account
//! - `EQBRIDGE_TELNET_PASSWORD` - telnet console password
//! - `EQBRIDGE_EQLOG_PATH` - game client log file
//!
//! Overrides only apply to sections present in the config file.

use std::env;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "EQBRIDGE";

/// Apply environment variable overrides to a config.
pub fn apply_env_overrides(config: Config) -> Config {
    apply_overrides(config, |name| env::var(format!("{}_{}", ENV_PREFIX, name)).ok())
}

/// Apply overrides from `lookup`, which maps an unprefixed name such as
/// `DISCORD_TOKEN` to its value.
pub fn apply_overrides(mut config: Config, lookup: impl Fn(&str) -> Option<String>) -> Config {
    if let Some(discord) = config.discord.as_mut() {
        if let Some(token) = lookup("DISCORD_TOKEN") {
            discord.token = token;
        }
    }

    if let Some(telnet) = config.telnet.as_mut() {
        if let Some(host) = lookup("TELNET_HOST") {
            telnet.host = host;
        }
        if let Some(username) = lookup("TELNET_USERNAME") {
            telnet.username = username;
        }
        if let Some(password) = lookup("TELNET_PASSWORD") {
            telnet.password = password;
        }
    }

    if let Some(eqlog) = config.eqlog.as_mut() {
        if let Some(path) = lookup("EQLOG_PATH") {
            eqlog.path = path;
        }
    }

    config
}

/// Check if any credential environment variables are set but empty.
///
/// Returns a list of variable names that are set but empty.
pub fn check_empty_env_vars() -> Vec<String> {
    let vars = [
        format!("{}_DISCORD_TOKEN", ENV_PREFIX),
        format!("{}_TELNET_USERNAME", ENV_PREFIX),
        format!("{}_TELNET_PASSWORD", ENV_PREFIX),
    ];

    vars.into_iter()
        .filter(|var| env::var(var).map(|v| v.is_empty()).unwrap_or(false))
        .collect()
}

/// Get the config file path from environment or use default.
///
/// Checks `EQBRIDGE_CONFIG` environment variable, otherwise returns "eqbridge.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "eqbridge.conf".to_string())
}

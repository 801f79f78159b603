//! Configuration type definitions.

use serde::{Deserialize, Deserializer};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    pub telnet: Option<TelnetConfig>,
    pub discord: Option<DiscordConfig>,
    pub eqlog: Option<EqlogConfig>,
}

/// Process-wide settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Redial disconnected endpoints in the background.
    #[serde(default = "default_true")]
    pub keep_alive: bool,
    /// Seconds between keep-alive checks (minimum 2).
    #[serde(default = "default_keep_alive_retry")]
    pub keep_alive_retry_secs: u64,
    /// Deadline for one call between components.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
    #[serde(default = "default_users_database")]
    pub users_database: String,
    #[serde(default = "default_guilds_database")]
    pub guilds_database: String,
    #[serde(default = "default_registrations_database")]
    pub registrations_database: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            keep_alive: true,
            keep_alive_retry_secs: default_keep_alive_retry(),
            call_timeout_secs: default_call_timeout(),
            users_database: default_users_database(),
            guilds_database: default_guilds_database(),
            registrations_database: default_registrations_database(),
        }
    }
}

/// Game server telnet console.
#[derive(Debug, Clone, Deserialize)]
pub struct TelnetConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// `host:port` of the console.
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Prefix for item links, e.g. `http://example.com/item.php?id=`.
    #[serde(default)]
    pub item_url: String,
    /// Tell subscribers when the server goes down and comes back.
    #[serde(default = "default_true")]
    pub announce_server_status: bool,
    #[serde(default = "default_login_timeout")]
    pub login_timeout_secs: u64,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

impl Default for TelnetConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: String::new(),
            username: String::new(),
            password: String::new(),
            item_url: String::new(),
            announce_server_status: true,
            login_timeout_secs: default_login_timeout(),
            routes: Vec::new(),
        }
    }
}

/// Discord bot.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub token: String,
    /// Discord user ids allowed to approve registrations.
    #[serde(default)]
    pub admin_ids: Vec<u64>,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            token: String::new(),
            admin_ids: Vec::new(),
            routes: Vec::new(),
        }
    }
}

/// Game client log file.
#[derive(Debug, Clone, Deserialize)]
pub struct EqlogConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub item_url: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

impl Default for EqlogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: String::new(),
            item_url: String::new(),
            poll_interval_ms: default_poll_interval(),
            routes: Vec::new(),
        }
    }
}

/// One routing rule.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub trigger: TriggerConfig,
    /// Endpoint name to send to.
    #[serde(default)]
    pub target: String,
    /// Destination channel at the target.
    #[serde(default, deserialize_with = "string_or_number")]
    pub channel_id: String,
    /// Guild key used to look up the destination channel.
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub message_pattern: Option<String>,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trigger: TriggerConfig::default(),
            target: String::new(),
            channel_id: String::new(),
            guild_id: None,
            message_pattern: None,
        }
    }
}

/// What makes a route fire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriggerConfig {
    pub regex: Option<String>,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub channel_id: Option<String>,
    pub custom: Option<String>,
    pub name_index: Option<usize>,
    pub message_index: Option<usize>,
    pub guild_index: Option<usize>,
}

/// Channel ids are snowflakes or channel numbers; accept either spelling.
#[derive(Deserialize)]
#[serde(untagged)]
enum IdValue {
    Text(String),
    Number(u64),
}

impl From<IdValue> for String {
    fn from(value: IdValue) -> Self {
        match value {
            IdValue::Text(text) => text,
            IdValue::Number(number) => number.to_string(),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    IdValue::deserialize(deserializer).map(String::from)
}

fn optional_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Option::<IdValue>::deserialize(deserializer).map(|value| value.map(String::from))
}

fn default_true() -> bool {
    true
}

fn default_keep_alive_retry() -> u64 {
    10
}

fn default_call_timeout() -> u64 {
    3
}

fn default_login_timeout() -> u64 {
    10
}

fn default_poll_interval() -> u64 {
    500
}

fn default_users_database() -> String {
    "users.json".to_string()
}

fn default_guilds_database() -> String {
    "guilds.json".to_string()
}

fn default_registrations_database() -> String {
    "registrations.json".to_string()
}

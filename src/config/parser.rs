//! Configuration file parsing (HOCON format).

use std::path::Path;

use hocon::{Hocon, HoconLoader};

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Load configuration from a HOCON file.
///
/// A missing or unreadable file is an `IoError`; bad syntax or a value of
/// the wrong type is a `ParseError` naming the file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    if let Err(source) = std::fs::metadata(path) {
        return Err(ConfigError::IoError {
            path: path.display().to_string(),
            source,
        });
    }

    let hocon = HoconLoader::new()
        .load_file(path)
        .and_then(|loader| loader.hocon())
        .map_err(|e| ConfigError::ParseError {
            message: format!("{}: {}", path.display(), e),
        })?;
    deserialize(hocon, &path.display().to_string())
}

/// Load configuration from a HOCON string.
pub fn load_config_str(content: &str) -> Result<Config, ConfigError> {
    let hocon = HoconLoader::new()
        .load_str(content)
        .and_then(|loader| loader.hocon())
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
    deserialize(hocon, "<string>")
}

fn deserialize(hocon: Hocon, origin: &str) -> Result<Config, ConfigError> {
    hocon.resolve().map_err(|e| ConfigError::ParseError {
        message: format!("{}: {}", origin, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{DiscordConfig, EqlogConfig, RouteConfig, TelnetConfig};

    const SAMPLE: &str = r#"
        general {
            keep_alive_retry_secs = 5
            users_database = "data/users.json"
        }
        telnet {
            host = "127.0.0.1:9000"
            username = "bridge"
            password = "secret"
            item_url = "http://example.com/item.php?id="
            routes = [
                {
                    trigger { channel_id = "260" }
                    target = "discord"
                    channel_id = "123456789"
                    message_pattern = "**%name**: %message"
                }
            ]
        }
        discord {
            token = "abc.def.ghi"
            routes = [
                {
                    trigger { channel_id = "123456789" }
                    target = "telnet"
                    channel_id = "260"
                    message_pattern = "%name says from discord, '%message'"
                }
            ]
        }
    "#;

    #[test]
    fn test_load_sample() {
        let config = load_config_str(SAMPLE).unwrap();

        assert_eq!(config.general.keep_alive_retry_secs, 5);
        assert!(config.general.keep_alive);
        assert_eq!(config.general.users_database, "data/users.json");
        assert_eq!(config.general.guilds_database, "guilds.json");

        let telnet = config.telnet.unwrap();
        assert!(telnet.enabled);
        assert!(telnet.announce_server_status);
        assert_eq!(telnet.host, "127.0.0.1:9000");
        assert_eq!(telnet.routes.len(), 1);
        assert_eq!(telnet.routes[0].target, "discord");
        assert_eq!(telnet.routes[0].trigger.channel_id.as_deref(), Some("260"));

        let discord = config.discord.unwrap();
        assert_eq!(discord.token, "abc.def.ghi");
        assert!(discord.admin_ids.is_empty());

        assert!(config.eqlog.is_none());
    }

    #[test]
    fn test_omitted_fields_match_default() {
        let config = load_config_str(
            r#"
            telnet { routes = [ { target = "discord" } ] }
            discord {}
            eqlog {}
            "#,
        )
        .unwrap();

        let telnet = config.telnet.unwrap();
        let expected = TelnetConfig::default();
        assert_eq!(telnet.enabled, expected.enabled);
        assert_eq!(telnet.announce_server_status, expected.announce_server_status);
        assert_eq!(telnet.login_timeout_secs, expected.login_timeout_secs);
        assert!(expected.enabled && expected.announce_server_status);
        assert_eq!(expected.login_timeout_secs, 10);

        let route = &telnet.routes[0];
        assert_eq!(route.enabled, RouteConfig::default().enabled);
        assert!(route.enabled);

        let discord = config.discord.unwrap();
        assert_eq!(discord.enabled, DiscordConfig::default().enabled);
        assert!(discord.enabled);

        let eqlog = config.eqlog.unwrap();
        let expected = EqlogConfig::default();
        assert_eq!(eqlog.enabled, expected.enabled);
        assert_eq!(eqlog.poll_interval_ms, expected.poll_interval_ms);
        assert_eq!(expected.poll_interval_ms, 500);
    }

    #[test]
    fn test_missing_file() {
        let err = load_config("/nonexistent/eqbridge.conf").unwrap_err();
        assert!(matches!(err, ConfigError::IoError { .. }));
    }
}

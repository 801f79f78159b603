//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.

use crate::common::error::ConfigError;
use crate::config::types::{Config, RouteConfig};
use crate::routing::route::Route;

/// Placeholder left in the sample config.
const PLACEHOLDER_TOKEN: &str = "YOUR_DISCORD_TOKEN_HERE";

/// Endpoints a route may send to. The game log is read-only.
const SENDABLE_TARGETS: [&str; 2] = ["telnet", "discord"];

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.general.call_timeout_secs == 0 {
        errors.push("general.call_timeout_secs must be non-zero".to_string());
    }

    if let Some(telnet) = config.telnet.as_ref().filter(|t| t.enabled) {
        if telnet.host.is_empty() {
            errors.push("telnet.host is required".to_string());
        }
        if telnet.username.is_empty() {
            errors.push("telnet.username is required".to_string());
        }
        if telnet.password.is_empty() {
            errors.push("telnet.password is required".to_string());
        }
    }

    if let Some(discord) = config.discord.as_ref().filter(|d| d.enabled) {
        if discord.token.is_empty() {
            errors.push("discord.token is required".to_string());
        }
        if discord.token == PLACEHOLDER_TOKEN {
            errors.push("discord.token has not been configured (still using placeholder)".to_string());
        }
    }

    if let Some(eqlog) = config.eqlog.as_ref().filter(|e| e.enabled) {
        if eqlog.path.is_empty() {
            errors.push("eqlog.path is required".to_string());
        }
    }

    if !has_enabled_endpoint(config) {
        errors.push("no endpoint is enabled - enable telnet, discord or eqlog".to_string());
    }

    let sections = [
        ("telnet", config.telnet.as_ref().map(|t| &t.routes)),
        ("discord", config.discord.as_ref().map(|d| &d.routes)),
        ("eqlog", config.eqlog.as_ref().map(|e| &e.routes)),
    ];
    for (section, routes) in sections {
        if let Some(routes) = routes {
            validate_routes(section, routes, &mut errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}

fn validate_routes(section: &str, routes: &[RouteConfig], errors: &mut Vec<String>) {
    for (i, route) in routes.iter().enumerate() {
        if let Err(e) = Route::compile(i, route) {
            errors.push(format!("{}.routes: {}", section, e));
            continue;
        }
        if !SENDABLE_TARGETS.contains(&route.target.as_str()) {
            errors.push(format!(
                "{}.routes[{}].target '{}' is invalid (use: telnet, discord)",
                section, i, route.target
            ));
        }
        if route.channel_id.is_empty() && route.guild_id.is_none() && !captures_guild(route) {
            errors.push(format!(
                "{}.routes[{}] needs a channel_id or a guild to send to",
                section, i
            ));
        }
        if route.target == "telnet"
            && !route.channel_id.is_empty()
            && route.channel_id.trim().parse::<u32>().is_err()
        {
            errors.push(format!(
                "{}.routes[{}].channel_id '{}' must be a game channel number for telnet",
                section, i, route.channel_id
            ));
        }
    }
}

/// Whether the trigger can capture a guild key, by index or `guild` group.
fn captures_guild(route: &RouteConfig) -> bool {
    route.trigger.guild_index.is_some()
        || route
            .trigger
            .regex
            .as_deref()
            .is_some_and(|regex| regex.contains("<guild>"))
}

/// Whether at least one endpoint section is present and enabled.
pub fn has_enabled_endpoint(config: &Config) -> bool {
    config.telnet.as_ref().is_some_and(|t| t.enabled)
        || config.discord.as_ref().is_some_and(|d| d.enabled)
        || config.eqlog.as_ref().is_some_and(|e| e.enabled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::*;

    fn route(target: &str, trigger_channel: &str, channel_id: &str) -> RouteConfig {
        RouteConfig {
            enabled: true,
            trigger: TriggerConfig {
                channel_id: Some(trigger_channel.to_string()),
                ..Default::default()
            },
            target: target.to_string(),
            channel_id: channel_id.to_string(),
            ..Default::default()
        }
    }

    fn make_valid_config() -> Config {
        Config {
            telnet: Some(TelnetConfig {
                enabled: true,
                host: "localhost:9000".to_string(),
                username: "bridge".to_string(),
                password: "secret".to_string(),
                routes: vec![route("discord", "260", "123456789")],
                ..Default::default()
            }),
            discord: Some(DiscordConfig {
                enabled: true,
                token: "valid_token_here".to_string(),
                routes: vec![route("telnet", "123456789", "260")],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&make_valid_config()).is_ok());
    }

    #[test]
    fn test_empty_token_fails() {
        let mut config = make_valid_config();
        if let Some(discord) = config.discord.as_mut() {
            discord.token = String::new();
        }

        let result = validate_config(&config);
        assert!(result.unwrap_err().to_string().contains("discord.token"));
    }

    #[test]
    fn test_placeholder_token_fails() {
        let mut config = make_valid_config();
        if let Some(discord) = config.discord.as_mut() {
            discord.token = PLACEHOLDER_TOKEN.to_string();
        }

        let result = validate_config(&config);
        assert!(result.unwrap_err().to_string().contains("placeholder"));
    }

    #[test]
    fn test_disabled_section_not_checked() {
        let mut config = make_valid_config();
        if let Some(discord) = config.discord.as_mut() {
            discord.enabled = false;
            discord.token = String::new();
        }
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_no_enabled_endpoint_fails() {
        let result = validate_config(&Config::default());
        assert!(result.unwrap_err().to_string().contains("no endpoint"));
    }

    #[test]
    fn test_eqlog_target_fails() {
        let mut config = make_valid_config();
        if let Some(telnet) = config.telnet.as_mut() {
            telnet.routes.push(route("eqlog", "260", "1"));
        }

        let result = validate_config(&config);
        assert!(result.unwrap_err().to_string().contains("telnet.routes[1].target"));
    }

    #[test]
    fn test_invalid_regex_fails() {
        let mut config = make_valid_config();
        if let Some(discord) = config.discord.as_mut() {
            discord.routes[0].trigger.regex = Some("[invalid".to_string());
        }

        let message = validate_config(&config).unwrap_err().to_string();
        assert!(message.contains("discord.routes"));
        assert!(message.contains("invalid regex"));
    }

    #[test]
    fn test_route_needs_destination() {
        let mut config = make_valid_config();
        if let Some(telnet) = config.telnet.as_mut() {
            telnet.routes.push(route("discord", "259", ""));
        }
        let message = validate_config(&config).unwrap_err().to_string();
        assert!(message.contains("telnet.routes[1] needs a channel_id"));

        if let Some(telnet) = config.telnet.as_mut() {
            telnet.routes[1].trigger.regex = Some(r"^\[(?P<guild>\w+)\]".to_string());
        }
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_telnet_target_needs_channel_number() {
        let mut config = make_valid_config();
        if let Some(discord) = config.discord.as_mut() {
            discord.routes.push(route("telnet", "123456789", "general"));
        }
        let message = validate_config(&config).unwrap_err().to_string();
        assert!(message.contains("discord.routes[1].channel_id 'general'"));
    }

    #[test]
    fn test_errors_are_collected() {
        let mut config = make_valid_config();
        if let Some(telnet) = config.telnet.as_mut() {
            telnet.username = String::new();
            telnet.password = String::new();
        }

        let message = validate_config(&config).unwrap_err().to_string();
        assert!(message.contains("telnet.username"));
        assert!(message.contains("telnet.password"));
    }
}

//! Compiled routes and trigger matching.

use fancy_regex::Regex;
use tracing::warn;

use super::template::{Template, DEFAULT_PATTERN};
use crate::common::error::RouteError;
use crate::common::ChatMessage;
use crate::config::types::{RouteConfig, TriggerConfig};

/// Values pulled out of a message by a firing trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captures {
    pub name: String,
    pub message: String,
    pub guild: Option<String>,
}

/// When a route fires.
#[derive(Debug, Clone)]
pub struct Trigger {
    channel_id: Option<String>,
    regex: Option<Regex>,
    custom: Option<String>,
    name_index: Option<usize>,
    message_index: Option<usize>,
    guild_index: Option<usize>,
}

impl Trigger {
    pub fn compile(index: usize, config: &TriggerConfig) -> Result<Self, RouteError> {
        if config.regex.is_none() && config.channel_id.is_none() && config.custom.is_none() {
            return Err(RouteError::MissingTrigger { index });
        }

        let regex = match &config.regex {
            Some(pattern) => Some(Regex::new(pattern).map_err(|e| RouteError::InvalidRegex {
                index,
                pattern: pattern.clone(),
                message: e.to_string(),
            })?),
            None => None,
        };

        let indices = [
            ("name_index", config.name_index),
            ("message_index", config.message_index),
            ("guild_index", config.guild_index),
        ];
        for (field, value) in indices {
            let Some(value) = value else { continue };
            let Some(regex) = &regex else {
                return Err(RouteError::CaptureWithoutRegex { index, field });
            };
            let groups = regex.captures_len().saturating_sub(1);
            if value > groups {
                return Err(RouteError::CaptureOutOfRange {
                    index,
                    field,
                    value,
                    groups,
                });
            }
        }

        Ok(Self {
            channel_id: config.channel_id.clone(),
            regex,
            custom: config.custom.clone(),
            name_index: config.name_index,
            message_index: config.message_index,
            guild_index: config.guild_index,
        })
    }

    /// Test `message`; on a match, return the captured values.
    ///
    /// A `custom` trigger only compares discriminators. Every other trigger
    /// ignores tagged messages.
    pub fn matches(&self, message: &ChatMessage) -> Option<Captures> {
        if let Some(custom) = &self.custom {
            return (message.discriminator.as_deref() == Some(custom.as_str()))
                .then(|| Captures::from_message(message));
        }

        if message.discriminator.is_some() {
            return None;
        }

        if let Some(channel_id) = &self.channel_id {
            if !message.is_on_channel(channel_id) {
                return None;
            }
        }

        let Some(regex) = &self.regex else {
            return Some(Captures::from_message(message));
        };

        let captures = match regex.captures(&message.message) {
            Ok(Some(captures)) => captures,
            Ok(None) => return None,
            Err(e) => {
                warn!("Regex match error for pattern '{}': {}", regex.as_str(), e);
                return None;
            }
        };

        let group = |index: Option<usize>, name: &str| {
            match index {
                Some(index) => captures.get(index),
                None => captures.name(name),
            }
            .map(|m| m.as_str().to_string())
        };

        Some(Captures {
            name: group(self.name_index, "name").unwrap_or_else(|| message.author.clone()),
            message: group(self.message_index, "message")
                .unwrap_or_else(|| message.message.clone()),
            guild: group(self.guild_index, "guild"),
        })
    }
}

impl Captures {
    fn from_message(message: &ChatMessage) -> Self {
        Self {
            name: message.author.clone(),
            message: message.message.clone(),
            guild: None,
        }
    }
}

/// A route ready to evaluate.
#[derive(Debug, Clone)]
pub struct Route {
    /// Position in the configured list.
    pub index: usize,
    pub enabled: bool,
    pub trigger: Trigger,
    pub target: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub template: Template,
}

impl Route {
    pub fn compile(index: usize, config: &RouteConfig) -> Result<Self, RouteError> {
        if config.target.trim().is_empty() {
            return Err(RouteError::MissingTarget { index });
        }

        let trigger = Trigger::compile(index, &config.trigger)?;
        let pattern = config.message_pattern.as_deref().unwrap_or(DEFAULT_PATTERN);
        let template = Template::compile(pattern)
            .map_err(|source| RouteError::InvalidTemplate { index, source })?;

        Ok(Self {
            index,
            enabled: config.enabled,
            trigger,
            target: config.target.clone(),
            channel_id: config.channel_id.clone(),
            guild_id: config.guild_id.clone(),
            template,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger(config: TriggerConfig) -> Trigger {
        Trigger::compile(0, &config).unwrap()
    }

    #[test]
    fn test_channel_trigger() {
        let t = trigger(TriggerConfig {
            channel_id: Some("260".to_string()),
            ..Default::default()
        });

        let ooc = ChatMessage::new("telnet", "Shin", "hi").with_channel_number(260);
        let say = ChatMessage::new("telnet", "Shin", "hi").with_channel_number(256);

        let captures = t.matches(&ooc).unwrap();
        assert_eq!(captures.name, "Shin");
        assert_eq!(captures.message, "hi");
        assert!(t.matches(&say).is_none());
    }

    #[test]
    fn test_regex_positional_captures() {
        let t = trigger(TriggerConfig {
            regex: Some(r"^(\w+) tells the guild, '(.*)'$".to_string()),
            name_index: Some(1),
            message_index: Some(2),
            ..Default::default()
        });

        let msg = ChatMessage::new("eqlog", "", "Shin tells the guild, 'pull now'");
        let captures = t.matches(&msg).unwrap();
        assert_eq!(captures.name, "Shin");
        assert_eq!(captures.message, "pull now");
    }

    #[test]
    fn test_regex_named_captures() {
        let t = trigger(TriggerConfig {
            regex: Some(r"^\[(?P<guild>[^\]]+)\] (?P<message>.+)$".to_string()),
            ..Default::default()
        });

        let msg = ChatMessage::new("telnet", "Shin", "[Raiders] inc");
        let captures = t.matches(&msg).unwrap();
        assert_eq!(captures.guild.as_deref(), Some("Raiders"));
        assert_eq!(captures.message, "inc");
        assert_eq!(captures.name, "Shin");
    }

    #[test]
    fn test_regex_is_case_sensitive() {
        let t = trigger(TriggerConfig {
            regex: Some("^hail".to_string()),
            ..Default::default()
        });

        assert!(t.matches(&ChatMessage::new("telnet", "Shin", "hail")).is_some());
        assert!(t.matches(&ChatMessage::new("telnet", "Shin", "Hail")).is_none());
    }

    #[test]
    fn test_custom_trigger_ignores_regex() {
        let t = trigger(TriggerConfig {
            custom: Some("admin".to_string()),
            regex: Some("never matches this".to_string()),
            ..Default::default()
        });

        let status = ChatMessage::admin("telnet", "Server is now UP");
        assert!(t.matches(&status).is_some());
        assert!(t
            .matches(&ChatMessage::new("telnet", "Shin", "never matches this"))
            .is_none());
    }

    #[test]
    fn test_tagged_messages_skip_plain_triggers() {
        let t = trigger(TriggerConfig {
            channel_id: Some("260".to_string()),
            ..Default::default()
        });

        let echo = ChatMessage::new("telnet", "Shin", "hi")
            .with_channel_number(260)
            .with_discriminator("emote");
        assert!(t.matches(&echo).is_none());
    }

    #[test]
    fn test_compile_errors() {
        let missing = Trigger::compile(3, &TriggerConfig::default()).unwrap_err();
        assert!(matches!(missing, RouteError::MissingTrigger { index: 3 }));

        let bad_regex = Trigger::compile(
            0,
            &TriggerConfig {
                regex: Some("(unclosed".to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(bad_regex, RouteError::InvalidRegex { .. }));

        let out_of_range = Trigger::compile(
            0,
            &TriggerConfig {
                regex: Some("(a)".to_string()),
                message_index: Some(2),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(
            out_of_range,
            RouteError::CaptureOutOfRange { groups: 1, value: 2, .. }
        ));
    }

    #[test]
    fn test_route_requires_target_and_valid_template() {
        let mut config = RouteConfig {
            trigger: TriggerConfig {
                channel_id: Some("260".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            Route::compile(0, &config),
            Err(RouteError::MissingTarget { .. })
        ));

        config.target = "discord".to_string();
        config.message_pattern = Some("%nope".to_string());
        assert!(matches!(
            Route::compile(0, &config),
            Err(RouteError::InvalidTemplate { .. })
        ));

        config.message_pattern = None;
        let route = Route::compile(0, &config).unwrap();
        assert_eq!(route.template.pattern(), DEFAULT_PATTERN);
    }
}

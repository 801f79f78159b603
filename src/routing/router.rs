//! Route evaluation.
//!
//! Routes are grouped by the endpoint they listen to and evaluated in
//! configured order. Every route that fires produces one [`Dispatch`].

use std::collections::HashMap;

use tracing::{debug, warn};

use super::route::Route;
use super::template::TemplateContext;
use super::GuildLookup;
use crate::common::ChatMessage;
use crate::config::types::{Config, RouteConfig};

/// One outgoing message produced by a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    /// Configured index of the route that fired.
    pub route: usize,
    /// Endpoint to send to.
    pub target: String,
    pub message: ChatMessage,
}

/// Routing table, keyed by source endpoint name.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: HashMap<String, Vec<Route>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from every endpoint section in the config.
    pub fn from_config(config: &Config) -> Self {
        let mut router = Self::new();
        if let Some(telnet) = &config.telnet {
            router.add_routes("telnet", &telnet.routes);
        }
        if let Some(discord) = &config.discord {
            router.add_routes("discord", &discord.routes);
        }
        if let Some(eqlog) = &config.eqlog {
            router.add_routes("eqlog", &eqlog.routes);
        }
        router
    }

    /// Compile routes for `source`. Invalid routes are logged and skipped.
    pub fn add_routes(&mut self, source: &str, configs: &[RouteConfig]) {
        let compiled = configs
            .iter()
            .enumerate()
            .filter_map(|(index, config)| match Route::compile(index, config) {
                Ok(route) => Some(route),
                Err(e) => {
                    warn!(source = %source, "Skipping route: {}", e);
                    None
                }
            });
        self.routes
            .entry(source.to_string())
            .or_default()
            .extend(compiled);
    }

    /// Number of compiled routes for `source`.
    pub fn route_count(&self, source: &str) -> usize {
        self.routes.get(source).map_or(0, Vec::len)
    }

    /// Evaluate every enabled route for the message's source, in order.
    pub fn evaluate(&self, message: &ChatMessage, guilds: &dyn GuildLookup) -> Vec<Dispatch> {
        let routes = self
            .routes
            .get(&message.source)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let dispatches: Vec<Dispatch> = routes
            .iter()
            .filter(|route| route.enabled)
            .filter_map(|route| self.fire(route, message, guilds))
            .collect();

        if dispatches.is_empty() {
            debug!(source = %message.source, "Discarded message: {}", message);
        }
        dispatches
    }

    fn fire(
        &self,
        route: &Route,
        message: &ChatMessage,
        guilds: &dyn GuildLookup,
    ) -> Option<Dispatch> {
        let captures = route.trigger.matches(message)?;

        let guild = captures.guild.as_deref().or(route.guild_id.as_deref());
        let channel_id = match guild {
            Some(guild) => guilds.channel_id(guild).unwrap_or_else(|| {
                debug!(
                    route = route.index,
                    guild = %guild,
                    "No channel mapped for guild, using the route's channel"
                );
                route.channel_id.clone()
            }),
            None => route.channel_id.clone(),
        };

        let ctx = TemplateContext {
            name: &captures.name,
            message: &captures.message,
            channel: &channel_id,
            channel_number: message.channel_number,
            guild,
            source: &message.source,
        };
        let text = match route.template.render(&ctx) {
            Ok(text) => text,
            Err(e) => {
                warn!(route = route.index, source = %message.source, "Skipping route: {}", e);
                return None;
            }
        };

        Some(Dispatch {
            route: route.index,
            target: route.target.clone(),
            message: ChatMessage {
                source: message.source.clone(),
                destination: Some(route.target.clone()),
                channel_id,
                channel_number: message.channel_number,
                author: captures.name,
                message: text,
                discriminator: message.discriminator.clone(),
            },
        })
    }
}

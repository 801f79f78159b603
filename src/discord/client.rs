//! Discord bot transport.
//!
//! Each dial builds a fresh serenity client, runs its gateway in the
//! background and waits for `ready`. Outbound messages go through the
//! client's HTTP handle.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serenity::gateway::ShardManager;
use serenity::http::{Http, HttpBuilder};
use serenity::model::id::ChannelId;
use serenity::prelude::*;
use serenity::Client;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::commands::CommandHandler;
use super::handler::DiscordHandler;
use super::split::{split_message, DISCORD_MESSAGE_LIMIT};
use crate::common::error::{EndpointError, EndpointResult};
use crate::common::ChatMessage;
use crate::config::types::DiscordConfig;
use crate::endpoint::{Connection, InboundSink, Transport};
use crate::game::sanitize::unescape;
use crate::store::{RegistrationStore, UserStore};

const KIND: &str = "discord";

/// Left in the sample config; never a real token.
const PLACEHOLDER_TOKEN: &str = "YOUR_DISCORD_TOKEN_HERE";

/// How long a dial waits for the gateway to report ready.
const READY_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Clone)]
pub struct DiscordTransport {
    users: UserStore,
    registrations: RegistrationStore,
}

impl DiscordTransport {
    pub fn new(users: UserStore, registrations: RegistrationStore) -> Self {
        Self {
            users,
            registrations,
        }
    }
}

#[async_trait]
impl Transport for DiscordTransport {
    const KIND: &'static str = KIND;

    type Config = DiscordConfig;
    type Connection = DiscordConnection;

    fn validate(&self, config: &DiscordConfig) -> EndpointResult<()> {
        let token = config.token.trim();
        if token.is_empty() || token == PLACEHOLDER_TOKEN {
            return Err(EndpointError::MissingConfig {
                endpoint: KIND,
                field: "token",
            });
        }
        Ok(())
    }

    async fn dial(&self, config: &DiscordConfig, sink: InboundSink) -> EndpointResult<DiscordConnection> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let commands = CommandHandler::new(
            self.users.clone(),
            self.registrations.clone(),
            config.admin_ids.clone(),
        );
        let handler = DiscordHandler::new(sink.clone(), self.users.clone(), commands, ready_tx);

        let mut client = build_client(config.token.trim(), handler).await?;
        let http = Arc::clone(&client.http);
        let shard_manager = Arc::clone(&client.shard_manager);

        let gateway = tokio::spawn(async move {
            let reason = match client.start().await {
                Ok(()) => "gateway shut down".to_string(),
                Err(e) => {
                    warn!("Discord client error: {}", e);
                    e.to_string()
                }
            };
            sink.closed(reason).await;
        });

        match tokio::time::timeout(READY_TIMEOUT, ready_rx).await {
            Ok(Ok(())) => Ok(DiscordConnection {
                http,
                shard_manager,
                gateway,
            }),
            Ok(Err(_)) => {
                gateway.abort();
                Err(EndpointError::AuthFailed {
                    endpoint: KIND,
                    reason: "gateway closed before ready".to_string(),
                })
            }
            Err(_) => {
                shard_manager.shutdown_all().await;
                gateway.abort();
                Err(EndpointError::Timeout {
                    endpoint: KIND,
                    operation: "gateway ready",
                })
            }
        }
    }
}

async fn build_client(token: &str, handler: DiscordHandler) -> EndpointResult<Client> {
    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS;

    let reqwest_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| EndpointError::Io {
            endpoint: KIND,
            source: std::io::Error::other(e),
        })?;

    let http = HttpBuilder::new(token).client(reqwest_client).build();

    let client = serenity::client::ClientBuilder::new_with_http(http, intents)
        .event_handler(handler)
        .await?;
    Ok(client)
}

pub struct DiscordConnection {
    http: Arc<Http>,
    shard_manager: Arc<ShardManager>,
    gateway: JoinHandle<()>,
}

/// Parse a destination channel id as a Discord snowflake.
fn parse_channel(channel_id: &str) -> EndpointResult<ChannelId> {
    match channel_id.trim().parse::<u64>() {
        Ok(id) if id != 0 => Ok(ChannelId::new(id)),
        _ => Err(EndpointError::InvalidChannel {
            endpoint: KIND,
            channel_id: channel_id.to_string(),
        }),
    }
}

#[async_trait]
impl Connection for DiscordConnection {
    async fn send(&mut self, message: &ChatMessage) -> EndpointResult<()> {
        let channel = parse_channel(&message.channel_id)?;
        let body = unescape(&message.message);

        for chunk in split_message(&body, DISCORD_MESSAGE_LIMIT) {
            channel.say(&self.http, chunk).await?;
        }
        debug!(channel = %channel, "Sent Discord message");
        Ok(())
    }

    async fn close(&mut self) {
        if self.gateway.is_finished() {
            return;
        }
        info!("Shutting down Discord gateway");
        self.shard_manager.shutdown_all().await;
    }
}

impl Drop for DiscordConnection {
    fn drop(&mut self) {
        self.gateway.abort();
    }
}

//! Gateway event handler.
//!
//! Turns guild messages into chat messages for the endpoint, answers bot
//! commands in place, and reports when the gateway is ready.

use std::sync::{Mutex, PoisonError};

use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use super::commands::{Command, CommandHandler};
use crate::common::ChatMessage;
use crate::endpoint::InboundSink;
use crate::game::{sanitize, sanitize_name};
use crate::store::UserStore;

pub struct DiscordHandler {
    sink: InboundSink,
    users: UserStore,
    commands: CommandHandler,
    ready: Mutex<Option<oneshot::Sender<()>>>,
}

impl DiscordHandler {
    pub fn new(
        sink: InboundSink,
        users: UserStore,
        commands: CommandHandler,
        ready: oneshot::Sender<()>,
    ) -> Self {
        Self {
            sink,
            users,
            commands,
            ready: Mutex::new(Some(ready)),
        }
    }
}

/// Name shown in game for a Discord author: the registered character if
/// there is one, else the guild nickname, global name or username.
pub fn display_name(
    users: &UserStore,
    author_id: u64,
    nick: Option<&str>,
    global_name: Option<&str>,
    username: &str,
) -> String {
    if let Some(name) = users.name(&author_id.to_string()) {
        return name;
    }
    [nick, global_name, Some(username)]
        .into_iter()
        .flatten()
        .map(sanitize_name)
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| author_id.to_string())
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("Discord bot connected as {}", ready.user.name);
        let sender = self
            .ready
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sender) = sender {
            let _ = sender.send(());
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot || msg.guild_id.is_none() {
            return;
        }

        if let Some(command) = Command::parse(&msg.content) {
            match self
                .commands
                .execute(msg.author.id.get(), &msg.author.name, command)
            {
                Ok(reply) => {
                    if let Err(e) = msg.channel_id.say(&ctx.http, reply).await {
                        warn!("Failed to reply to command: {}", e);
                    }
                }
                Err(e) => error!("Command failed: {}", e),
            }
            return;
        }

        let body = sanitize(&msg.content);
        if body.is_empty() {
            return;
        }

        let nick = msg.member.as_ref().and_then(|member| member.nick.as_deref());
        let author = display_name(
            &self.users,
            msg.author.id.get(),
            nick,
            msg.author.global_name.as_deref(),
            &msg.author.name,
        );

        let message =
            ChatMessage::new("", author, body).with_channel_id(msg.channel_id.get().to_string());
        if !self.sink.deliver(message).await {
            debug!("Discord endpoint stopped listening");
        }
    }
}

//! Game client log transport.
//!
//! Read-only: follows the log the game client writes and turns chat lines
//! into messages. Lines that are not chat are still delivered, with no
//! author, so routes can match them with their own pattern.

use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::tail::LogTail;
use crate::common::error::{EndpointError, EndpointResult};
use crate::common::ChatMessage;
use crate::config::types::EqlogConfig;
use crate::endpoint::{Connection, InboundSink, Transport};
use crate::game::sanitize;
use crate::telnet::parser::parse_line;

const KIND: &str = "eqlog";

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, Default)]
pub struct EqlogTransport;

#[async_trait]
impl Transport for EqlogTransport {
    const KIND: &'static str = KIND;

    type Config = EqlogConfig;
    type Connection = EqlogConnection;

    fn validate(&self, config: &EqlogConfig) -> EndpointResult<()> {
        if config.path.trim().is_empty() {
            return Err(EndpointError::MissingConfig {
                endpoint: KIND,
                field: "path",
            });
        }
        Ok(())
    }

    async fn dial(&self, config: &EqlogConfig, sink: InboundSink) -> EndpointResult<EqlogConnection> {
        let tail = LogTail::open(config.path.trim())
            .await
            .map_err(|source| EndpointError::ConnectFailed {
                endpoint: KIND,
                address: config.path.clone(),
                source,
            })?;
        info!(path = %tail.path().display(), "Following game log");

        let interval = Duration::from_millis(config.poll_interval_ms).max(MIN_POLL_INTERVAL);
        let follower = tokio::spawn(follow(tail, sink, config.item_url.clone(), interval));

        Ok(EqlogConnection { follower })
    }
}

pub struct EqlogConnection {
    follower: JoinHandle<()>,
}

#[async_trait]
impl Connection for EqlogConnection {
    async fn send(&mut self, _message: &ChatMessage) -> EndpointResult<()> {
        Err(EndpointError::Unsupported {
            endpoint: KIND,
            operation: "send",
        })
    }

    async fn close(&mut self) {
        self.follower.abort();
    }
}

impl Drop for EqlogConnection {
    fn drop(&mut self) {
        self.follower.abort();
    }
}

/// Drop the `[Sat Oct 18 20:15:02 2026] ` prefix the client writes.
pub fn strip_timestamp(line: &str) -> &str {
    if line.starts_with('[') {
        if let Some(end) = line.find("] ") {
            return &line[end + 2..];
        }
    }
    line
}

/// Chat lines parse like console lines; anything else keeps its text.
pub fn parse_log_line(line: &str, item_url: &str) -> Option<ChatMessage> {
    let text = strip_timestamp(line);
    if let Some(message) = parse_line(text, item_url) {
        return Some(message);
    }
    let body = sanitize(text);
    (!body.is_empty()).then(|| ChatMessage::new("", "", body))
}

async fn follow(mut tail: LogTail, sink: InboundSink, item_url: String, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let reason = loop {
        ticker.tick().await;

        let lines = match tail.poll().await {
            Ok(lines) => lines,
            Err(e) => {
                warn!(path = %tail.path().display(), "Game log read failed: {}", e);
                break e.to_string();
            }
        };

        for line in lines {
            let Some(message) = parse_log_line(&line, &item_url) else {
                continue;
            };
            if !sink.deliver(message).await {
                debug!("Game log endpoint stopped listening");
                return;
            }
        }
    };

    sink.closed(reason).await;
}

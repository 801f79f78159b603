//! Telnet console transport.
//!
//! Dials the console, logs in, turns off echo and subscribes to chat, then
//! parses every line in a background read loop.

use std::time::Duration;

use async_trait::async_trait;
use backon::BackoffBuilder;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, warn};

use super::codec::{TelnetCodec, TelnetFrame};
use super::parser::parse_line;
use crate::common::error::{EndpointError, EndpointResult};
use crate::common::ChatMessage;
use crate::config::types::TelnetConfig;
use crate::endpoint::{Connection, InboundSink, Transport};

const KIND: &str = "telnet";

/// Console command that speaks on a numbered channel.
const EMOTE_COMMAND: &str = "emote world";

/// Commands sent once logged in.
const SESSION_COMMANDS: [&str; 2] = ["echo off", "acceptmessages on"];

/// Short retry for the TCP dial itself; longer outages are the keep-alive's job.
fn dial_backoff() -> impl Iterator<Item = Duration> {
    backon::ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(500))
        .with_max_delay(Duration::from_secs(2))
        .with_max_times(2)
        .build()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TelnetTransport;

#[async_trait]
impl Transport for TelnetTransport {
    const KIND: &'static str = KIND;

    type Config = TelnetConfig;
    type Connection = TelnetConnection;

    fn validate(&self, config: &TelnetConfig) -> EndpointResult<()> {
        let required = [
            ("host", &config.host),
            ("username", &config.username),
            ("password", &config.password),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(EndpointError::MissingConfig {
                    endpoint: KIND,
                    field,
                });
            }
        }
        Ok(())
    }

    fn announces_status(&self, config: &TelnetConfig) -> bool {
        config.announce_server_status
    }

    async fn dial(&self, config: &TelnetConfig, sink: InboundSink) -> EndpointResult<TelnetConnection> {
        let stream = connect_tcp(&config.host).await?;
        let (read, write) = stream.into_split();
        let mut reader = FramedRead::new(read, TelnetCodec::new());
        let mut writer = FramedWrite::new(write, TelnetCodec::new());

        let login_timeout = Duration::from_secs(config.login_timeout_secs.max(1));
        tokio::time::timeout(
            login_timeout,
            login(&mut reader, &mut writer, &config.username, &config.password),
        )
        .await
        .map_err(|_| EndpointError::Timeout {
            endpoint: KIND,
            operation: "login",
        })??;

        for command in SESSION_COMMANDS {
            writer.send(command.to_string()).await.map_err(io_error)?;
        }
        info!(host = %config.host, "Logged in to telnet console");

        let read_loop = tokio::spawn(read_loop(reader, sink, config.item_url.clone()));

        Ok(TelnetConnection {
            writer: Some(writer),
            read_loop,
        })
    }
}

pub struct TelnetConnection {
    writer: Option<FramedWrite<OwnedWriteHalf, TelnetCodec>>,
    read_loop: JoinHandle<()>,
}

#[async_trait]
impl Connection for TelnetConnection {
    /// Emote the rendered text on the game channel named by `channel_id`.
    async fn send(&mut self, message: &ChatMessage) -> EndpointResult<()> {
        let command = encode_command(message)?;
        let writer = self.writer.as_mut().ok_or_else(|| EndpointError::NotConnected {
            endpoint: KIND.to_string(),
        })?;
        debug!(command = %command, "Sending telnet command");
        writer.send(command).await.map_err(io_error)
    }

    async fn close(&mut self) {
        self.read_loop.abort();
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.close().await {
                debug!("Error closing telnet writer: {}", e);
            }
        }
    }
}

impl Drop for TelnetConnection {
    fn drop(&mut self) {
        self.read_loop.abort();
    }
}

/// Build the console command for an outbound message.
///
/// The channel must be a game channel number. The text is always an
/// argument of `emote`, never the start of a line, and cannot carry
/// control characters into a second command.
pub fn encode_command(message: &ChatMessage) -> EndpointResult<String> {
    let channel: u32 = message
        .channel_id
        .trim()
        .parse()
        .map_err(|_| EndpointError::InvalidChannel {
            endpoint: KIND,
            channel_id: message.channel_id.clone(),
        })?;

    let text: String = message
        .message
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();

    Ok(format!("{} {} {}", EMOTE_COMMAND, channel, text.trim()))
}

fn io_error(source: std::io::Error) -> EndpointError {
    EndpointError::Io {
        endpoint: KIND,
        source,
    }
}

async fn connect_tcp(host: &str) -> EndpointResult<TcpStream> {
    let mut backoff = dial_backoff();
    loop {
        match TcpStream::connect(host).await {
            Ok(stream) => return Ok(stream),
            Err(e) => match backoff.next() {
                Some(delay) => {
                    debug!(host = %host, "Telnet dial failed ({}), retrying in {:?}", e, delay);
                    tokio::time::sleep(delay).await;
                }
                None => {
                    return Err(EndpointError::ConnectFailed {
                        endpoint: KIND,
                        address: host.to_string(),
                        source: e,
                    })
                }
            },
        }
    }
}

/// Answer the username and password prompts and wait for the verdict.
async fn login<R, W>(
    reader: &mut FramedRead<R, TelnetCodec>,
    writer: &mut FramedWrite<W, TelnetCodec>,
    username: &str,
    password: &str,
) -> EndpointResult<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut sent_username = false;
    let mut sent_password = false;

    while let Some(frame) = reader.next().await {
        match frame.map_err(io_error)? {
            TelnetFrame::Prompt(prompt) => {
                let prompt = prompt.to_ascii_lowercase();
                if prompt.contains("username") || prompt.contains("login") {
                    writer.send(username.to_string()).await.map_err(io_error)?;
                    sent_username = true;
                } else if prompt.contains("password") {
                    writer.send(password.to_string()).await.map_err(io_error)?;
                    sent_password = true;
                } else if sent_username && sent_password {
                    return Ok(());
                }
            }
            TelnetFrame::Line(line) => {
                let lower = line.to_ascii_lowercase();
                if lower.contains("login failed") || lower.contains("not authorized") {
                    return Err(EndpointError::AuthFailed {
                        endpoint: KIND,
                        reason: line.trim().to_string(),
                    });
                }
                if sent_password && lower.contains("login accepted") {
                    return Ok(());
                }
            }
        }
    }

    Err(io_error(std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        "console closed during login",
    )))
}

async fn read_loop(
    mut reader: FramedRead<OwnedReadHalf, TelnetCodec>,
    sink: InboundSink,
    item_url: String,
) {
    let reason = loop {
        match reader.next().await {
            Some(Ok(TelnetFrame::Line(line))) => {
                let Some(message) = parse_line(&line, &item_url) else {
                    continue;
                };
                if !sink.deliver(message).await {
                    debug!("Telnet endpoint stopped listening");
                    return;
                }
            }
            Some(Ok(TelnetFrame::Prompt(_))) => {}
            Some(Err(e)) => {
                warn!("Telnet read error: {}", e);
                break e.to_string();
            }
            None => break "console closed the connection".to_string(),
        }
    };

    sink.closed(reason).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    fn config(host: String) -> TelnetConfig {
        TelnetConfig {
            enabled: true,
            host,
            username: "bridge".to_string(),
            password: "secret".to_string(),
            item_url: String::new(),
            announce_server_status: true,
            login_timeout_secs: 2,
            routes: Vec::new(),
        }
    }

    /// A console that logs the client in and returns every line it receives.
    async fn fake_console(
        listener: TcpListener,
        accept: bool,
        chat: &'static str,
    ) -> Vec<String> {
        let (stream, _) = listener.accept().await.unwrap();
        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();
        let mut received = Vec::new();

        write.write_all(b"Username: ").await.unwrap();
        received.push(lines.next_line().await.unwrap().unwrap());
        write.write_all(b"Password: ").await.unwrap();
        received.push(lines.next_line().await.unwrap().unwrap());

        if !accept {
            write.write_all(b"Login failed.\r\n").await.unwrap();
            return received;
        }

        write.write_all(b"Login accepted.\r\n> ").await.unwrap();
        for _ in SESSION_COMMANDS {
            received.push(lines.next_line().await.unwrap().unwrap());
        }
        write.write_all(chat.as_bytes()).await.unwrap();
        received.push(lines.next_line().await.unwrap().unwrap());
        received
    }

    #[test]
    fn test_validate_requires_credentials() {
        let mut cfg = config("127.0.0.1:1".to_string());
        assert!(TelnetTransport.validate(&cfg).is_ok());

        cfg.password.clear();
        assert!(matches!(
            TelnetTransport.validate(&cfg),
            Err(EndpointError::MissingConfig { field: "password", .. })
        ));
    }

    #[test]
    fn test_encode_command_emotes_on_channel() {
        let message = ChatMessage::new("discord", "worldshutdown now", "worldshutdown now: hi")
            .with_channel_id("260");
        assert_eq!(
            encode_command(&message).unwrap(),
            "emote world 260 worldshutdown now: hi"
        );
    }

    #[test]
    fn test_default_route_output_stays_an_emote_argument() {
        use crate::config::types::{RouteConfig, TriggerConfig};
        use crate::routing::{NoGuilds, Router};

        let mut router = Router::new();
        router.add_routes(
            "discord",
            &[RouteConfig {
                trigger: TriggerConfig {
                    channel_id: Some("555".to_string()),
                    ..Default::default()
                },
                target: "telnet".to_string(),
                channel_id: "260".to_string(),
                ..Default::default()
            }],
        );

        let inbound = ChatMessage::new("discord", "worldshutdown now", "hi").with_channel_id("555");
        let dispatches = router.evaluate(&inbound, &NoGuilds);
        assert_eq!(dispatches.len(), 1);
        assert_eq!(
            encode_command(&dispatches[0].message).unwrap(),
            "emote world 260 worldshutdown now: hi"
        );
    }

    #[test]
    fn test_encode_command_flattens_line_breaks() {
        let message = ChatMessage::new("discord", "Ann", "hi\r\nworldshutdown").with_channel_id(" 260 ");
        assert_eq!(
            encode_command(&message).unwrap(),
            "emote world 260 hi  worldshutdown"
        );
    }

    #[test]
    fn test_encode_command_rejects_non_numeric_channel() {
        for channel in ["", "general", "123456789012345678901", "-1"] {
            let message = ChatMessage::new("discord", "Ann", "hi").with_channel_id(channel);
            assert!(matches!(
                encode_command(&message),
                Err(EndpointError::InvalidChannel { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_login_read_and_send() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let console = tokio::spawn(fake_console(
            listener,
            true,
            "Shin says ooc, 'hello from the game'\r\n",
        ));

        let (sink, mut events) = InboundSink::channel(8);
        let mut connection = TelnetTransport.dial(&config(address), sink).await.unwrap();

        let event = events.recv().await.unwrap();
        match event {
            crate::endpoint::TransportEvent::Message(message) => {
                assert_eq!(message.author, "Shin");
                assert_eq!(message.message, "hello from the game");
            }
            other => panic!("unexpected event: {:?}", other),
        }

        let reply = ChatMessage::new("discord", "Ann", "Ann says from discord, 'hi'")
            .with_channel_id("260");
        connection.send(&reply).await.unwrap();

        let received = console.await.unwrap();
        assert_eq!(
            received,
            vec![
                "bridge",
                "secret",
                "echo off",
                "acceptmessages on",
                "emote world 260 Ann says from discord, 'hi'",
            ]
        );
        connection.close().await;
    }

    #[tokio::test]
    async fn test_login_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let console = tokio::spawn(fake_console(listener, false, ""));

        let (sink, _events) = InboundSink::channel(8);
        let err = TelnetTransport
            .dial(&config(address), sink)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, EndpointError::AuthFailed { .. }));
        console.await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_console_reports_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let console = tokio::spawn(fake_console(listener, true, "bye\r\n"));

        let (sink, mut events) = InboundSink::channel(8);
        let mut connection = TelnetTransport.dial(&config(address), sink).await.unwrap();
        connection
            .send(&ChatMessage::new("", "", "bye").with_channel_id("260"))
            .await
            .unwrap();
        console.await.unwrap();

        let event = events.recv().await.unwrap();
        assert!(matches!(
            event,
            crate::endpoint::TransportEvent::Closed { .. }
        ));
    }
}

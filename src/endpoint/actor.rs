//! Endpoint actor: connection lifecycle, sends and inbound fan-out.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::transport::{Connection, InboundSink, Transport, TransportEvent};
use super::{Subscriber, STATUS_DOWN, STATUS_UP};
use crate::common::error::{EndpointError, EndpointResult};
use crate::common::ChatMessage;
use crate::pump::{Actor, Pump, PumpError, PumpOptions, WeakPump};

/// Deadline for a `connect` call. Dialing includes login handshakes, so it
/// gets longer than ordinary calls.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Queue between a connection's read loop and its endpoint.
const INBOUND_CAPACITY: usize = 256;

/// Result of a call through an endpoint's pump.
pub type CallResult<T> = Result<T, PumpError<EndpointError>>;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(label)
    }
}

pub enum EndpointRequest<T: Transport> {
    Connect,
    Close,
    ConfigRead,
    ConfigUpdate(T::Config),
    SendMessage(ChatMessage),
    Subscribe(Subscriber),
    State,
    /// An event from the read loop of connection number `generation`.
    Inbound {
        generation: u64,
        event: TransportEvent,
    },
}

pub enum EndpointResponse<T: Transport> {
    Ack,
    Config(T::Config),
    State(ConnectionState),
}

pub struct EndpointActor<T: Transport> {
    name: String,
    transport: T,
    config: T::Config,
    connection: Option<T::Connection>,
    state: ConnectionState,
    /// Bumped on every connect and close; events from older read loops are ignored.
    generation: u64,
    connected_before: bool,
    subscribers: Vec<Subscriber>,
    me: WeakPump<Self>,
}

impl<T: Transport> EndpointActor<T> {
    fn new(name: String, transport: T, config: T::Config, me: WeakPump<Self>) -> Self {
        Self {
            name,
            transport,
            config,
            connection: None,
            state: ConnectionState::Disconnected,
            generation: 0,
            connected_before: false,
            subscribers: Vec::new(),
            me,
        }
    }

    async fn connect(&mut self) -> EndpointResult<()> {
        self.transport.validate(&self.config)?;

        let was_connected = self.state == ConnectionState::Connected;
        if self.connection.is_some() {
            self.disconnect().await;
        }

        self.generation += 1;
        self.state = ConnectionState::Connecting;
        info!(endpoint = %self.name, kind = T::KIND, "Connecting");

        let sink = self.spawn_forwarder(self.generation);
        match self.transport.dial(&self.config, sink).await {
            Ok(connection) => {
                self.connection = Some(connection);
                self.state = ConnectionState::Connected;
                info!(endpoint = %self.name, "Connected");

                if self.connected_before && !was_connected {
                    self.announce(STATUS_UP);
                }
                self.connected_before = true;
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                Err(e)
            }
        }
    }

    async fn disconnect(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.close().await;
            info!(endpoint = %self.name, "Disconnected");
        }
        self.generation += 1;
        self.state = ConnectionState::Disconnected;
    }

    /// The connection failed under us.
    async fn connection_lost(&mut self, reason: &str) {
        if self.state != ConnectionState::Connected {
            return;
        }
        warn!(endpoint = %self.name, reason = %reason, "Connection lost");
        self.disconnect().await;

        if self.transport.announces_status(&self.config) {
            self.announce(STATUS_DOWN);
        }
    }

    async fn send(&mut self, message: ChatMessage) -> EndpointResult<()> {
        let Some(connection) = self.connection.as_mut() else {
            return Err(EndpointError::NotConnected {
                endpoint: self.name.clone(),
            });
        };

        match connection.send(&message).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_connection_lost() => {
                self.connection_lost(&e.to_string()).await;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn inbound(&mut self, generation: u64, event: TransportEvent) {
        if generation != self.generation {
            debug!(endpoint = %self.name, generation, "Ignoring event from a previous connection");
            return;
        }

        match event {
            TransportEvent::Message(mut message) => {
                if message.source.is_empty() {
                    message.source = self.name.clone();
                }
                self.broadcast(message);
            }
            TransportEvent::Closed { reason } => self.connection_lost(&reason).await,
        }
    }

    fn announce(&self, text: &str) {
        if !self.transport.announces_status(&self.config) {
            return;
        }
        info!(endpoint = %self.name, "{}", text);
        self.broadcast(ChatMessage::admin(self.name.clone(), text));
    }

    fn broadcast(&self, message: ChatMessage) {
        if self.subscribers.is_empty() {
            debug!(endpoint = %self.name, "No subscribers, dropping inbound message");
            return;
        }
        for subscriber in &self.subscribers {
            subscriber(message.clone());
        }
    }

    /// Feed a new connection's events back into this actor's queue, in order.
    fn spawn_forwarder(&self, generation: u64) -> InboundSink {
        let (sink, mut events) = InboundSink::channel(INBOUND_CAPACITY);
        let me = self.me.clone();
        let name = self.name.clone();

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(pump) = me.upgrade() else { break };
                if pump
                    .enqueue(EndpointRequest::Inbound { generation, event })
                    .await
                    .is_err()
                {
                    break;
                }
            }
            debug!(endpoint = %name, generation, "Inbound forwarder finished");
        });

        sink
    }
}

#[async_trait]
impl<T: Transport> Actor for EndpointActor<T> {
    type Request = EndpointRequest<T>;
    type Response = EndpointResponse<T>;
    type Error = EndpointError;

    async fn handle(&mut self, request: Self::Request) -> EndpointResult<Self::Response> {
        match request {
            EndpointRequest::Connect => self.connect().await.map(|()| EndpointResponse::Ack),
            EndpointRequest::Close => {
                self.disconnect().await;
                Ok(EndpointResponse::Ack)
            }
            EndpointRequest::ConfigRead => Ok(EndpointResponse::Config(self.config.clone())),
            EndpointRequest::ConfigUpdate(config) => {
                debug!(endpoint = %self.name, "Config replaced");
                self.config = config;
                Ok(EndpointResponse::Ack)
            }
            EndpointRequest::SendMessage(message) => {
                self.send(message).await.map(|()| EndpointResponse::Ack)
            }
            EndpointRequest::Subscribe(subscriber) => {
                self.subscribers.push(subscriber);
                Ok(EndpointResponse::Ack)
            }
            EndpointRequest::State => Ok(EndpointResponse::State(self.state)),
            EndpointRequest::Inbound { generation, event } => {
                self.inbound(generation, event).await;
                Ok(EndpointResponse::Ack)
            }
        }
    }

    async fn stopped(&mut self) {
        self.disconnect().await;
    }
}

/// The operations the manager and the keep-alive loop need from any endpoint.
#[async_trait]
pub trait EndpointHandle: Send + Sync {
    fn name(&self) -> &str;

    /// Connect, replacing any existing connection.
    async fn connect(&self, caller: &CancellationToken) -> CallResult<()>;

    /// Best-effort disconnect. Closing a closed endpoint is a no-op.
    async fn close(&self, caller: &CancellationToken) -> CallResult<()>;

    async fn send_message(&self, message: ChatMessage, caller: &CancellationToken)
        -> CallResult<()>;

    async fn subscribe(&self, subscriber: Subscriber, caller: &CancellationToken)
        -> CallResult<()>;

    async fn state(&self, caller: &CancellationToken) -> CallResult<ConnectionState>;
}

/// Typed handle to a running endpoint.
pub struct Endpoint<T: Transport> {
    pump: Pump<EndpointActor<T>>,
}

impl<T: Transport> Clone for Endpoint<T> {
    fn clone(&self) -> Self {
        Self {
            pump: self.pump.clone(),
        }
    }
}

impl<T: Transport> Endpoint<T> {
    pub fn spawn(
        name: impl Into<String>,
        transport: T,
        config: T::Config,
        options: PumpOptions,
    ) -> Self {
        let name = name.into();
        let pump = Pump::spawn_cyclic(name.clone(), options, |me| {
            EndpointActor::new(name, transport, config, me)
        });
        Self { pump }
    }

    pub async fn config_read(&self, caller: &CancellationToken) -> CallResult<T::Config> {
        match self.pump.call(EndpointRequest::ConfigRead, caller).await? {
            EndpointResponse::Config(config) => Ok(config),
            _ => Err(self.unexpected("config_read")),
        }
    }

    /// Replace the config. Takes effect on the next connect.
    pub async fn config_update(
        &self,
        config: T::Config,
        caller: &CancellationToken,
    ) -> CallResult<()> {
        let response = self
            .pump
            .call(EndpointRequest::ConfigUpdate(config), caller)
            .await?;
        self.ack(response, "config_update")
    }

    fn ack(&self, response: EndpointResponse<T>, request: &'static str) -> CallResult<()> {
        match response {
            EndpointResponse::Ack => Ok(()),
            _ => Err(self.unexpected(request)),
        }
    }

    fn unexpected(&self, request: &'static str) -> PumpError<EndpointError> {
        PumpError::Handler(EndpointError::UnexpectedResponse {
            endpoint: self.pump.name().to_string(),
            request,
        })
    }
}

#[async_trait]
impl<T: Transport> EndpointHandle for Endpoint<T> {
    fn name(&self) -> &str {
        self.pump.name()
    }

    async fn connect(&self, caller: &CancellationToken) -> CallResult<()> {
        let response = self
            .pump
            .call_with_timeout(EndpointRequest::Connect, caller, CONNECT_TIMEOUT)
            .await?;
        self.ack(response, "connect")
    }

    async fn close(&self, caller: &CancellationToken) -> CallResult<()> {
        let response = self.pump.call(EndpointRequest::Close, caller).await?;
        self.ack(response, "close")
    }

    async fn send_message(
        &self,
        message: ChatMessage,
        caller: &CancellationToken,
    ) -> CallResult<()> {
        let response = self
            .pump
            .call(EndpointRequest::SendMessage(message), caller)
            .await?;
        self.ack(response, "send_message")
    }

    async fn subscribe(
        &self,
        subscriber: Subscriber,
        caller: &CancellationToken,
    ) -> CallResult<()> {
        let response = self
            .pump
            .call(EndpointRequest::Subscribe(subscriber), caller)
            .await?;
        self.ack(response, "subscribe")
    }

    async fn state(&self, caller: &CancellationToken) -> CallResult<ConnectionState> {
        match self.pump.call(EndpointRequest::State, caller).await? {
            EndpointResponse::State(state) => Ok(state),
            _ => Err(self.unexpected("state")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::messages::DISCRIMINATOR_ADMIN;
    use crate::endpoint::testing::{collecting_subscriber, MockConfig, MockTransport};
    use tokio_test::assert_ok;

    fn spawn_mock(announce: bool) -> (Endpoint<MockTransport>, MockTransport) {
        let transport = MockTransport::default();
        let config = MockConfig {
            address: "mock://server".to_string(),
            announce,
        };
        let endpoint = Endpoint::spawn("mock", transport.clone(), config, PumpOptions::default());
        (endpoint, transport)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_send_before_connect_fails() {
        let (endpoint, transport) = spawn_mock(false);
        let caller = CancellationToken::new();

        let err = endpoint
            .send_message(ChatMessage::new("discord", "Shin", "hi"), &caller)
            .await
            .unwrap_err();
        assert!(matches!(
            err.handler_error(),
            Some(EndpointError::NotConnected { .. })
        ));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_connect_validates_before_dialing() {
        let transport = MockTransport::default();
        let endpoint = Endpoint::spawn(
            "mock",
            transport.clone(),
            MockConfig::default(),
            PumpOptions::default(),
        );
        let caller = CancellationToken::new();

        let err = endpoint.connect(&caller).await.unwrap_err();
        assert!(matches!(
            err.handler_error(),
            Some(EndpointError::MissingConfig { field: "address", .. })
        ));
        assert_eq!(transport.dials(), 0);
        assert_eq!(
            endpoint.state(&caller).await.unwrap(),
            ConnectionState::Disconnected
        );
    }

    #[tokio::test]
    async fn test_connect_then_send() {
        let (endpoint, transport) = spawn_mock(false);
        let caller = CancellationToken::new();

        assert_ok!(endpoint.connect(&caller).await);
        assert_eq!(
            endpoint.state(&caller).await.unwrap(),
            ConnectionState::Connected
        );

        let message = ChatMessage::new("discord", "Shin", "hi").with_channel_id("260");
        assert_ok!(endpoint.send_message(message.clone(), &caller).await);
        assert_eq!(transport.sent(), vec![message]);
    }

    #[tokio::test]
    async fn test_reconnect_closes_previous_connection() {
        let (endpoint, transport) = spawn_mock(false);
        let caller = CancellationToken::new();

        assert_ok!(endpoint.connect(&caller).await);
        assert_ok!(endpoint.connect(&caller).await);

        assert_eq!(transport.dials(), 2);
        assert_eq!(transport.closes(), 1);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (endpoint, transport) = spawn_mock(false);
        let caller = CancellationToken::new();

        assert_ok!(endpoint.close(&caller).await);
        assert_ok!(endpoint.connect(&caller).await);
        assert_ok!(endpoint.close(&caller).await);
        assert_ok!(endpoint.close(&caller).await);

        assert_eq!(transport.closes(), 1);
    }

    #[tokio::test]
    async fn test_inbound_reaches_subscribers_in_order() {
        let (endpoint, transport) = spawn_mock(false);
        let caller = CancellationToken::new();
        let (subscriber, received) = collecting_subscriber();

        assert_ok!(endpoint.subscribe(subscriber, &caller).await);
        assert_ok!(endpoint.connect(&caller).await);

        let sink = transport.last_sink().unwrap();
        assert!(sink.deliver(ChatMessage::new("", "Shin", "one")).await);
        assert!(sink.deliver(ChatMessage::new("", "Shin", "two")).await);
        settle().await;

        let received = received.lock().unwrap().clone();
        let bodies: Vec<_> = received.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(bodies, vec!["one", "two"]);
        assert_eq!(received[0].source, "mock");
    }

    #[tokio::test]
    async fn test_status_announced_only_on_transitions() {
        let (endpoint, transport) = spawn_mock(true);
        let caller = CancellationToken::new();
        let (subscriber, received) = collecting_subscriber();
        assert_ok!(endpoint.subscribe(subscriber, &caller).await);

        assert_ok!(endpoint.connect(&caller).await);
        settle().await;
        assert!(received.lock().unwrap().is_empty());

        transport.last_sink().unwrap().closed("eof").await;
        settle().await;
        assert_eq!(
            endpoint.state(&caller).await.unwrap(),
            ConnectionState::Disconnected
        );

        assert_ok!(endpoint.connect(&caller).await);
        settle().await;

        let received = received.lock().unwrap().clone();
        let bodies: Vec<_> = received.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(bodies, vec![STATUS_DOWN, STATUS_UP]);
        assert!(received
            .iter()
            .all(|m| m.discriminator.as_deref() == Some(DISCRIMINATOR_ADMIN)));
    }

    #[tokio::test]
    async fn test_no_announcement_without_status_flag() {
        let (endpoint, transport) = spawn_mock(false);
        let caller = CancellationToken::new();
        let (subscriber, received) = collecting_subscriber();
        assert_ok!(endpoint.subscribe(subscriber, &caller).await);

        assert_ok!(endpoint.connect(&caller).await);
        transport.last_sink().unwrap().closed("eof").await;
        settle().await;
        assert_ok!(endpoint.connect(&caller).await);
        settle().await;

        assert!(received.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stale_close_is_ignored() {
        let (endpoint, transport) = spawn_mock(false);
        let caller = CancellationToken::new();

        assert_ok!(endpoint.connect(&caller).await);
        let old_sink = transport.last_sink().unwrap();
        assert_ok!(endpoint.connect(&caller).await);

        old_sink.closed("old connection ended").await;
        settle().await;

        assert_eq!(
            endpoint.state(&caller).await.unwrap(),
            ConnectionState::Connected
        );
    }

    #[tokio::test]
    async fn test_send_failure_tears_down_connection() {
        let (endpoint, transport) = spawn_mock(false);
        let caller = CancellationToken::new();

        assert_ok!(endpoint.connect(&caller).await);
        transport.set_fail_send(true);

        let err = endpoint
            .send_message(ChatMessage::new("discord", "Shin", "hi"), &caller)
            .await
            .unwrap_err();
        assert!(err.handler_error().unwrap().is_connection_lost());
        assert_eq!(
            endpoint.state(&caller).await.unwrap(),
            ConnectionState::Disconnected
        );
    }

    #[tokio::test]
    async fn test_failed_dial_leaves_disconnected() {
        let (endpoint, transport) = spawn_mock(false);
        let caller = CancellationToken::new();
        transport.set_fail_dial(true);

        let err = endpoint.connect(&caller).await.unwrap_err();
        assert!(matches!(
            err.handler_error(),
            Some(EndpointError::ConnectFailed { .. })
        ));
        assert_eq!(
            endpoint.state(&caller).await.unwrap(),
            ConnectionState::Disconnected
        );
    }

    #[tokio::test]
    async fn test_config_update_then_read() {
        let (endpoint, transport) = spawn_mock(false);
        let caller = CancellationToken::new();

        let updated = MockConfig {
            address: "mock://other".to_string(),
            announce: true,
        };
        assert_ok!(endpoint.config_update(updated, &caller).await);

        let config = endpoint.config_read(&caller).await.unwrap();
        assert_eq!(config.address, "mock://other");
        assert!(config.announce);
        assert_eq!(transport.dials(), 0);
    }
}

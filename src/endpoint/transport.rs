//! The capability interface every transport implements.

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::common::error::EndpointResult;
use crate::common::ChatMessage;

/// Something a transport's read loop reports to its endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A parsed inbound chat message.
    Message(ChatMessage),
    /// The connection is gone and will produce nothing more.
    Closed { reason: String },
}

/// Where a connection's read loop pushes its events.
///
/// Events are forwarded to the owning endpoint in the order they are sent.
#[derive(Debug, Clone)]
pub struct InboundSink {
    sender: mpsc::Sender<TransportEvent>,
}

impl InboundSink {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<TransportEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Push a parsed message. Returns false once the endpoint stopped listening.
    pub async fn deliver(&self, message: ChatMessage) -> bool {
        self.sender
            .send(TransportEvent::Message(message))
            .await
            .is_ok()
    }

    /// Report that the connection ended.
    pub async fn closed(&self, reason: impl Into<String>) {
        let _ = self
            .sender
            .send(TransportEvent::Closed {
                reason: reason.into(),
            })
            .await;
    }
}

/// A live connection, owned exclusively by one endpoint.
#[async_trait]
pub trait Connection: Send + 'static {
    /// Transmit one outbound message.
    async fn send(&mut self, message: &ChatMessage) -> EndpointResult<()>;

    /// Tear the connection down. Must be safe to call more than once.
    async fn close(&mut self);
}

/// Factory for connections of one kind (telnet, discord, eqlog).
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Short name used in errors and logs.
    const KIND: &'static str;

    type Config: Clone + fmt::Debug + Send + Sync + 'static;
    type Connection: Connection;

    /// Check the config has everything a dial needs. Runs before any I/O.
    fn validate(&self, config: &Self::Config) -> EndpointResult<()>;

    /// Whether subscribers get "Server is now UP/DOWN" announcements.
    fn announces_status(&self, _config: &Self::Config) -> bool {
        false
    }

    /// Open a connection. Its read loop reports through `sink`.
    async fn dial(&self, config: &Self::Config, sink: InboundSink)
        -> EndpointResult<Self::Connection>;
}

//! In-memory transport for tests.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::transport::{Connection, InboundSink, Transport};
use super::Subscriber;
use crate::common::error::{EndpointError, EndpointResult};
use crate::common::ChatMessage;

#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    pub address: String,
    pub announce: bool,
}

#[derive(Default)]
struct Recorded {
    dials: usize,
    closes: usize,
    sent: Vec<ChatMessage>,
    sinks: Vec<InboundSink>,
    fail_dial: bool,
    fail_send: bool,
    send_delay: Option<Duration>,
}

/// Records every dial, send and close; the sinks it hands out let tests
/// play the part of a read loop.
#[derive(Clone, Default)]
pub struct MockTransport {
    recorded: Arc<Mutex<Recorded>>,
}

impl MockTransport {
    pub fn dials(&self) -> usize {
        self.recorded.lock().unwrap().dials
    }

    pub fn closes(&self) -> usize {
        self.recorded.lock().unwrap().closes
    }

    pub fn sent(&self) -> Vec<ChatMessage> {
        self.recorded.lock().unwrap().sent.clone()
    }

    pub fn last_sink(&self) -> Option<InboundSink> {
        self.recorded.lock().unwrap().sinks.last().cloned()
    }

    pub fn set_fail_dial(&self, fail: bool) {
        self.recorded.lock().unwrap().fail_dial = fail;
    }

    pub fn set_fail_send(&self, fail: bool) {
        self.recorded.lock().unwrap().fail_send = fail;
    }

    /// Make every send stall for `delay` before it is recorded.
    pub fn set_send_delay(&self, delay: Duration) {
        self.recorded.lock().unwrap().send_delay = Some(delay);
    }
}

#[async_trait]
impl Transport for MockTransport {
    const KIND: &'static str = "mock";

    type Config = MockConfig;
    type Connection = MockConnection;

    fn validate(&self, config: &MockConfig) -> EndpointResult<()> {
        if config.address.is_empty() {
            return Err(EndpointError::MissingConfig {
                endpoint: Self::KIND,
                field: "address",
            });
        }
        Ok(())
    }

    fn announces_status(&self, config: &MockConfig) -> bool {
        config.announce
    }

    async fn dial(&self, config: &MockConfig, sink: InboundSink) -> EndpointResult<MockConnection> {
        let mut recorded = self.recorded.lock().unwrap();
        if recorded.fail_dial {
            return Err(EndpointError::ConnectFailed {
                endpoint: Self::KIND,
                address: config.address.clone(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
            });
        }
        recorded.dials += 1;
        recorded.sinks.push(sink);

        Ok(MockConnection {
            recorded: Arc::clone(&self.recorded),
            closed: false,
        })
    }
}

pub struct MockConnection {
    recorded: Arc<Mutex<Recorded>>,
    closed: bool,
}

#[async_trait]
impl Connection for MockConnection {
    async fn send(&mut self, message: &ChatMessage) -> EndpointResult<()> {
        let delay = self.recorded.lock().unwrap().send_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut recorded = self.recorded.lock().unwrap();
        if recorded.fail_send {
            return Err(EndpointError::Io {
                endpoint: MockTransport::KIND,
                source: io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"),
            });
        }
        recorded.sent.push(message.clone());
        Ok(())
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.recorded.lock().unwrap().closes += 1;
        }
    }
}

/// A subscriber that stores everything it receives.
pub fn collecting_subscriber() -> (Subscriber, Arc<Mutex<Vec<ChatMessage>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let subscriber: Subscriber = Arc::new(move |message| sink.lock().unwrap().push(message));
    (subscriber, received)
}

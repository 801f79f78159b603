//! Pump handles and the worker loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{Actor, PumpError, DEFAULT_CALL_TIMEOUT, DEFAULT_QUEUE_CAPACITY};

type Reply<A> = oneshot::Sender<Result<<A as Actor>::Response, <A as Actor>::Error>>;

/// One queued request and, for calls, where its result goes.
struct Envelope<A: Actor> {
    request: A::Request,
    reply: Option<Reply<A>>,
}

/// Settings for a spawned pump.
#[derive(Debug, Clone)]
pub struct PumpOptions {
    /// Deadline for a whole `call`.
    pub timeout: Duration,
    /// Request queue capacity.
    pub capacity: usize,
    /// Cancelling this stops the worker.
    pub lifetime: CancellationToken,
}

impl PumpOptions {
    pub fn new(lifetime: CancellationToken) -> Self {
        Self {
            timeout: DEFAULT_CALL_TIMEOUT,
            capacity: DEFAULT_QUEUE_CAPACITY,
            lifetime,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }
}

impl Default for PumpOptions {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}

/// Handle to a running actor. Cheap to clone; the worker stops when the
/// last handle is dropped or the lifetime token is cancelled.
pub struct Pump<A: Actor> {
    name: Arc<str>,
    sender: mpsc::Sender<Envelope<A>>,
    lifetime: CancellationToken,
    timeout: Duration,
}

impl<A: Actor> Clone for Pump<A> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            sender: self.sender.clone(),
            lifetime: self.lifetime.clone(),
            timeout: self.timeout,
        }
    }
}

impl<A: Actor> std::fmt::Debug for Pump<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pump")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl<A: Actor> Pump<A> {
    /// Spawn a worker that owns `actor`.
    pub fn spawn(name: impl Into<String>, actor: A, options: PumpOptions) -> Self {
        Self::spawn_cyclic(name, options, |_| actor)
    }

    /// Spawn a worker whose actor needs a handle to its own pump.
    ///
    /// The actor only gets a [`WeakPump`] so it does not keep itself alive.
    pub fn spawn_cyclic<F>(name: impl Into<String>, options: PumpOptions, build: F) -> Self
    where
        F: FnOnce(WeakPump<A>) -> A,
    {
        let name: Arc<str> = Arc::from(name.into());
        let (sender, receiver) = mpsc::channel(options.capacity.max(1));

        let pump = Self {
            name: Arc::clone(&name),
            sender,
            lifetime: options.lifetime.clone(),
            timeout: options.timeout,
        };
        let actor = build(pump.downgrade());

        tokio::spawn(run_worker(name, actor, receiver, options.lifetime));
        pump
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn downgrade(&self) -> WeakPump<A> {
        WeakPump {
            name: Arc::clone(&self.name),
            sender: self.sender.downgrade(),
            lifetime: self.lifetime.clone(),
            timeout: self.timeout,
        }
    }

    /// Run `request` on the worker and wait for its result.
    ///
    /// Both the enqueue and the wait share one deadline. If the caller gives
    /// up before the worker reaches the request, the request is skipped.
    pub async fn call(
        &self,
        request: A::Request,
        caller: &CancellationToken,
    ) -> Result<A::Response, PumpError<A::Error>> {
        self.call_with_timeout(request, caller, self.timeout).await
    }

    /// Like [`Pump::call`] with a deadline other than the pump's default.
    pub async fn call_with_timeout(
        &self,
        request: A::Request,
        caller: &CancellationToken,
        timeout: Duration,
    ) -> Result<A::Response, PumpError<A::Error>> {
        let deadline = Instant::now() + timeout;
        let (reply_tx, reply_rx) = oneshot::channel();
        let envelope = Envelope {
            request,
            reply: Some(reply_tx),
        };

        let queued = tokio::select! {
            biased;
            _ = caller.cancelled() => Err(self.cancelled()),
            _ = self.lifetime.cancelled() => Err(self.shutdown()),
            _ = tokio::time::sleep_until(deadline) => Err(PumpError::RequestTimeout {
                component: self.name.to_string(),
                timeout,
            }),
            sent = self.sender.send(envelope) => sent.map_err(|_| self.shutdown()),
        };
        queued?;

        tokio::select! {
            biased;
            _ = caller.cancelled() => Err(self.cancelled()),
            _ = self.lifetime.cancelled() => Err(self.shutdown()),
            _ = tokio::time::sleep_until(deadline) => Err(PumpError::ResponseTimeout {
                component: self.name.to_string(),
                timeout,
            }),
            reply = reply_rx => match reply {
                Ok(Ok(response)) => Ok(response),
                Ok(Err(error)) => Err(PumpError::Handler(error)),
                Err(_) => Err(self.shutdown()),
            },
        }
    }

    /// Queue `request` without waiting for its result, waiting for queue
    /// space if needed. Order is preserved across successive enqueues.
    pub async fn enqueue(&self, request: A::Request) -> Result<(), PumpError<A::Error>> {
        let envelope = Envelope {
            request,
            reply: None,
        };

        tokio::select! {
            biased;
            _ = self.lifetime.cancelled() => Err(self.shutdown()),
            sent = self.sender.send(envelope) => sent.map_err(|_| self.shutdown()),
        }
    }

    /// Queue `request` if there is room right now. Returns whether it was
    /// accepted; a full queue drops it with a warning.
    pub fn notify(&self, request: A::Request) -> bool {
        let envelope = Envelope {
            request,
            reply: None,
        };

        match self.sender.try_send(envelope) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(component = %self.name, "Request queue full, dropping notification");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(component = %self.name, "Pump closed, dropping notification");
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed() || self.lifetime.is_cancelled()
    }

    fn cancelled(&self) -> PumpError<A::Error> {
        PumpError::Cancelled {
            component: self.name.to_string(),
        }
    }

    fn shutdown(&self) -> PumpError<A::Error> {
        PumpError::Shutdown {
            component: self.name.to_string(),
        }
    }
}

/// Non-owning pump handle.
pub struct WeakPump<A: Actor> {
    name: Arc<str>,
    sender: mpsc::WeakSender<Envelope<A>>,
    lifetime: CancellationToken,
    timeout: Duration,
}

impl<A: Actor> Clone for WeakPump<A> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            sender: self.sender.clone(),
            lifetime: self.lifetime.clone(),
            timeout: self.timeout,
        }
    }
}

impl<A: Actor> WeakPump<A> {
    /// A strong handle, if the pump still has one somewhere.
    pub fn upgrade(&self) -> Option<Pump<A>> {
        self.sender.upgrade().map(|sender| Pump {
            name: Arc::clone(&self.name),
            sender,
            lifetime: self.lifetime.clone(),
            timeout: self.timeout,
        })
    }
}

async fn run_worker<A: Actor>(
    name: Arc<str>,
    mut actor: A,
    mut receiver: mpsc::Receiver<Envelope<A>>,
    lifetime: CancellationToken,
) {
    debug!(component = %name, "Worker started");

    loop {
        let envelope = tokio::select! {
            biased;
            _ = lifetime.cancelled() => break,
            next = receiver.recv() => match next {
                Some(envelope) => envelope,
                None => break,
            },
        };

        let Envelope { request, reply } = envelope;

        if reply.as_ref().is_some_and(|reply| reply.is_closed()) {
            debug!(component = %name, "Caller gave up before execution, skipping request");
            continue;
        }

        let result = tokio::select! {
            biased;
            _ = lifetime.cancelled() => break,
            result = actor.handle(request) => result,
        };

        match reply {
            Some(reply) => {
                if reply.send(result).is_err() {
                    info!(component = %name, "Caller gave up before the response, dropping it");
                }
            }
            None => {
                if let Err(e) = result {
                    warn!(component = %name, error = %e, "Queued request failed");
                }
            }
        }
    }

    actor.stopped().await;
    debug!(component = %name, "Worker stopped");
}

//! Single-worker request serialization.
//!
//! Every stateful component (endpoint, manager) is an [`Actor`] driven by one
//! [`Pump`]: a bounded queue plus one tokio task that owns the actor and runs
//! its requests strictly one at a time. Callers get a synchronous-looking
//! `call` bounded by a deadline and by two cancellation tokens (the caller's
//! and the pump's own lifetime).
//!
//! ## Module Structure
//!
//! - `worker`: `Pump`, `WeakPump` and the worker loop
//! - `error`: `PumpError`

pub mod error;
pub mod worker;

use async_trait::async_trait;

pub use error::PumpError;
pub use worker::{Pump, PumpOptions, WeakPump};

/// Default deadline for a call (enqueue and response together).
pub const DEFAULT_CALL_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(3);

/// Default request queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// A component whose private state is only touched by its pump worker.
#[async_trait]
pub trait Actor: Send + 'static {
    /// Requests the actor understands.
    type Request: Send + 'static;
    /// Successful result of a request.
    type Response: Send + 'static;
    /// Failure of a request. Never stops the worker.
    type Error: std::error::Error + Send + 'static;

    /// Execute one request against the actor's state.
    async fn handle(&mut self, request: Self::Request) -> Result<Self::Response, Self::Error>;

    /// Called once after the worker stops taking requests.
    async fn stopped(&mut self) {}
}

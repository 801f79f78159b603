//! Pump call errors.

use std::time::Duration;

use thiserror::Error;

/// Why a call through a pump did not produce a response.
#[derive(Debug, Error)]
pub enum PumpError<E>
where
    E: std::error::Error + 'static,
{
    /// The request queue stayed full until the deadline.
    #[error("{component}: timed out during request after {timeout:?}")]
    RequestTimeout { component: String, timeout: Duration },

    /// The request was queued but no response arrived before the deadline.
    /// The request may still execute.
    #[error("{component}: timed out during response after {timeout:?}")]
    ResponseTimeout { component: String, timeout: Duration },

    /// The caller's token was cancelled.
    #[error("{component}: call cancelled by caller")]
    Cancelled { component: String },

    /// The pump has stopped.
    #[error("{component}: shut down")]
    Shutdown { component: String },

    /// The actor handled the request and failed.
    #[error(transparent)]
    Handler(E),
}

impl<E> PumpError<E>
where
    E: std::error::Error + 'static,
{
    /// Whether the call hit its deadline in either phase.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            PumpError::RequestTimeout { .. } | PumpError::ResponseTimeout { .. }
        )
    }

    /// The actor's own error, if the request reached it.
    pub fn handler_error(&self) -> Option<&E> {
        match self {
            PumpError::Handler(error) => Some(error),
            _ => None,
        }
    }
}

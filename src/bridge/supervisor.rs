//! Keep-alive: periodically redial endpoints that are not connected.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::endpoint::{ConnectionState, EndpointHandle};

/// Shortest allowed interval between keep-alive checks.
pub const MIN_KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(2);

/// Check every endpoint each `interval` until `token` is cancelled.
///
/// The first check happens one interval after start; startup connects are
/// the caller's job.
pub async fn supervise(
    endpoints: Vec<Arc<dyn EndpointHandle>>,
    interval: Duration,
    token: CancellationToken,
) {
    let interval = interval.max(MIN_KEEP_ALIVE_INTERVAL);
    info!("Keep-alive running every {:?}", interval);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }
        reconnect_disconnected(&endpoints, &token).await;
    }

    debug!("Keep-alive stopped");
}

/// Reconnect every endpoint that reports itself disconnected. Returns the
/// number that came back.
pub async fn reconnect_disconnected(
    endpoints: &[Arc<dyn EndpointHandle>],
    token: &CancellationToken,
) -> usize {
    let mut reconnected = 0;

    for endpoint in endpoints {
        match endpoint.state(token).await {
            Ok(ConnectionState::Disconnected) => {}
            Ok(_) => continue,
            Err(e) => {
                warn!(endpoint = %endpoint.name(), "Keep-alive state check failed: {}", e);
                continue;
            }
        }

        info!(endpoint = %endpoint.name(), "Keep-alive reconnecting");
        match endpoint.connect(token).await {
            Ok(()) => reconnected += 1,
            Err(e) => warn!(endpoint = %endpoint.name(), "Reconnect failed: {}", e),
        }
    }

    reconnected
}

//! The manager: receives inbound messages from every endpoint, runs them
//! through the router and sends the results to their targets.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::common::error::ManagerError;
use crate::common::ChatMessage;
use crate::endpoint::{EndpointHandle, Subscriber};
use crate::pump::{Actor, Pump, PumpError, PumpOptions};
use crate::routing::{GuildLookup, Router};

pub enum ManagerRequest {
    Register(Arc<dyn EndpointHandle>),
    Dispatch(ChatMessage),
}

#[derive(Debug, PartialEq, Eq)]
pub enum ManagerResponse {
    Ack,
    /// Number of targets that accepted the message.
    Dispatched(usize),
}

pub struct ManagerActor {
    router: Router,
    guilds: Arc<dyn GuildLookup>,
    endpoints: HashMap<String, Arc<dyn EndpointHandle>>,
    /// Caller token for sends to endpoints.
    lifetime: CancellationToken,
}

impl ManagerActor {
    fn register(&mut self, endpoint: Arc<dyn EndpointHandle>) -> Result<(), ManagerError> {
        let name = endpoint.name().to_string();
        if self.endpoints.contains_key(&name) {
            return Err(ManagerError::DuplicateEndpoint { name });
        }
        info!(endpoint = %name, "Registered endpoint");
        self.endpoints.insert(name, endpoint);
        Ok(())
    }

    /// Send every dispatch in route order, one at a time.
    async fn dispatch(&self, message: ChatMessage) -> usize {
        let mut delivered = 0;

        for dispatch in self.router.evaluate(&message, self.guilds.as_ref()) {
            let Some(endpoint) = self.endpoints.get(&dispatch.target) else {
                warn!(
                    route = dispatch.route,
                    target = %dispatch.target,
                    "Route targets an unknown endpoint, skipping"
                );
                continue;
            };

            match endpoint
                .send_message(dispatch.message, &self.lifetime)
                .await
            {
                Ok(()) => {
                    debug!(route = dispatch.route, target = %dispatch.target, "Delivered");
                    delivered += 1;
                }
                Err(e) if e.is_timeout() => {
                    warn!(route = dispatch.route, target = %dispatch.target, "Send timed out: {}", e);
                }
                Err(e) => {
                    warn!(route = dispatch.route, target = %dispatch.target, "Send failed: {}", e);
                }
            }
        }

        delivered
    }
}

#[async_trait]
impl Actor for ManagerActor {
    type Request = ManagerRequest;
    type Response = ManagerResponse;
    type Error = ManagerError;

    async fn handle(&mut self, request: ManagerRequest) -> Result<ManagerResponse, ManagerError> {
        match request {
            ManagerRequest::Register(endpoint) => {
                self.register(endpoint)?;
                Ok(ManagerResponse::Ack)
            }
            ManagerRequest::Dispatch(message) => {
                Ok(ManagerResponse::Dispatched(self.dispatch(message).await))
            }
        }
    }
}

/// Handle to the running manager.
#[derive(Clone)]
pub struct Manager {
    pump: Pump<ManagerActor>,
}

impl Manager {
    pub fn spawn(router: Router, guilds: Arc<dyn GuildLookup>, options: PumpOptions) -> Self {
        let actor = ManagerActor {
            router,
            guilds,
            endpoints: HashMap::new(),
            lifetime: options.lifetime.clone(),
        };
        Self {
            pump: Pump::spawn("manager", actor, options),
        }
    }

    pub async fn register(
        &self,
        endpoint: Arc<dyn EndpointHandle>,
        caller: &CancellationToken,
    ) -> Result<(), PumpError<ManagerError>> {
        self.pump
            .call(ManagerRequest::Register(endpoint), caller)
            .await
            .map(|_| ())
    }

    /// Route `message` and wait for the fan-out. Returns how many targets
    /// accepted it.
    pub async fn dispatch(
        &self,
        message: ChatMessage,
        caller: &CancellationToken,
    ) -> Result<usize, PumpError<ManagerError>> {
        match self
            .pump
            .call(ManagerRequest::Dispatch(message), caller)
            .await?
        {
            ManagerResponse::Dispatched(count) => Ok(count),
            ManagerResponse::Ack => Ok(0),
        }
    }

    /// Callback for endpoint subscriptions. Queues without waiting so an
    /// endpoint never blocks on the manager.
    pub fn subscriber(&self) -> Subscriber {
        let pump = self.pump.clone();
        Arc::new(move |message| {
            pump.notify(ManagerRequest::Dispatch(message));
        })
    }
}

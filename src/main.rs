//! eqbridge - EverQuest/Discord chat relay
//!
//! Connects to a game server's telnet console, a Discord bot and
//! optionally the game client's log file, and relays chat between them
//! according to configured routes.

mod bridge;
mod common;
mod config;
mod discord;
mod endpoint;
mod eqlog;
mod game;
mod pump;
mod routing;
mod store;
mod telnet;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use bridge::{supervise, Manager};
use config::env::{check_empty_env_vars, get_config_path};
use config::{load_and_validate, Config};
use discord::DiscordTransport;
use endpoint::{Endpoint, EndpointHandle, Transport};
use eqlog::EqlogTransport;
use pump::PumpOptions;
use routing::Router;
use store::{GuildStore, RegistrationStore, StoreWatcher, UserStore};
use telnet::TelnetTransport;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("eqbridge v{} starting...", env!("CARGO_PKG_VERSION"));

    for var in check_empty_env_vars() {
        warn!("{} is set but empty; using the config file value", var);
    }

    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Please ensure {} exists and is properly formatted.", config_path);
        e
    })?;
    info!("Configuration loaded successfully");

    let users = UserStore::open(&config.general.users_database)?;
    let guilds = GuildStore::open(&config.general.guilds_database)?;
    let registrations = RegistrationStore::open(&config.general.registrations_database)?;
    let _watchers = watch_stores(&users, &guilds, &registrations);

    let root = CancellationToken::new();
    let options = PumpOptions::new(root.child_token())
        .timeout(Duration::from_secs(config.general.call_timeout_secs));

    let router = Router::from_config(&config);
    for source in [TelnetTransport::KIND, DiscordTransport::KIND, EqlogTransport::KIND] {
        info!("Loaded {} {} routes", router.route_count(source), source);
    }
    let manager = Manager::spawn(router, Arc::new(guilds), options.clone());

    let endpoints = spawn_endpoints(&config, users, registrations, &options);
    for endpoint in &endpoints {
        manager.register(Arc::clone(endpoint), &root).await?;
        endpoint.subscribe(manager.subscriber(), &root).await?;
    }

    for endpoint in &endpoints {
        info!(endpoint = %endpoint.name(), "Connecting...");
        if let Err(e) = endpoint.connect(&root).await {
            if !config.general.keep_alive {
                error!(endpoint = %endpoint.name(), "Initial connect failed: {}", e);
                root.cancel();
                return Err(e.into());
            }
            warn!(
                endpoint = %endpoint.name(),
                "Initial connect failed, keep-alive will retry: {}", e
            );
        }
    }

    let keep_alive = config.general.keep_alive.then(|| {
        tokio::spawn(supervise(
            endpoints.clone(),
            Duration::from_secs(config.general.keep_alive_retry_secs),
            root.child_token(),
        ))
    });

    shutdown_signal().await;
    info!("Shutdown signal received - closing endpoints...");

    if let Some(keep_alive) = keep_alive {
        keep_alive.abort();
    }
    for endpoint in &endpoints {
        if let Err(e) = endpoint.close(&root).await {
            warn!(endpoint = %endpoint.name(), "Close failed: {}", e);
        }
    }
    root.cancel();

    info!("Exiting...");
    Ok(())
}

/// Spawn every enabled endpoint, named after its kind.
fn spawn_endpoints(
    config: &Config,
    users: UserStore,
    registrations: RegistrationStore,
    options: &PumpOptions,
) -> Vec<Arc<dyn EndpointHandle>> {
    let mut endpoints: Vec<Arc<dyn EndpointHandle>> = Vec::new();

    if let Some(telnet) = config.telnet.clone().filter(|t| t.enabled) {
        endpoints.push(Arc::new(Endpoint::spawn(
            TelnetTransport::KIND,
            TelnetTransport,
            telnet,
            options.clone(),
        )));
    }
    if let Some(discord) = config.discord.clone().filter(|d| d.enabled) {
        endpoints.push(Arc::new(Endpoint::spawn(
            DiscordTransport::KIND,
            DiscordTransport::new(users, registrations),
            discord,
            options.clone(),
        )));
    }
    if let Some(eqlog) = config.eqlog.clone().filter(|e| e.enabled) {
        endpoints.push(Arc::new(Endpoint::spawn(
            EqlogTransport::KIND,
            EqlogTransport,
            eqlog,
            options.clone(),
        )));
    }

    endpoints
}

/// Reload stores edited on disk. A store that cannot be watched still works.
fn watch_stores(
    users: &UserStore,
    guilds: &GuildStore,
    registrations: &RegistrationStore,
) -> Vec<StoreWatcher> {
    [
        ("users", users.watch()),
        ("guilds", guilds.watch()),
        ("registrations", registrations.watch()),
    ]
    .into_iter()
    .filter_map(|(name, watcher)| match watcher {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            warn!("Not watching {} store: {}", name, e);
            None
        }
    })
    .collect()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

use crate::channel::{DeliveryError, WebhookChannel};
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::ingest::{start_server, IngestState};
use crate::queue::AuditQueue;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("channel error: {0}")]
    Channel(#[from] DeliveryError),

    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

pub async fn run() -> Result<(), RunError> {
    let config = Config::from_env()?;

    if config.auth_token.is_none() {
        warn!("AUTH_TOKEN is not set, all ingest requests will be rejected with a server error");
    }
    if config.webhook_url.is_none() {
        warn!("WEBHOOK_URL is not set, deliveries will fail and records will queue up");
    }

    let queue = Arc::new(AuditQueue::new());
    let channel = Arc::new(WebhookChannel::new(&config)?);

    let dispatcher = Dispatcher::new(
        queue.clone(),
        channel,
        config.drip_interval,
        config.delivery_timeout,
    );
    let dispatcher_handle = tokio::spawn(dispatcher.run());

    let listen_addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = Arc::new(IngestState {
        queue,
        auth_token: config.auth_token.clone(),
    });
    let server_handle = tokio::spawn(start_server(listen_addr, state));

    info!("Service started, press Ctrl+C to shutdown");

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        result = server_handle => {
            match result {
                Ok(Ok(())) => info!("Server task completed"),
                Ok(Err(e)) => error!(error = %e, "Server task error"),
                Err(e) => error!(error = %e, "Server task join error"),
            }
        }
    }

    // Queued records are in-memory only; whatever is still undelivered at
    // shutdown is lost, by design.
    dispatcher_handle.abort();
    info!("Dispatcher stopped");

    Ok(())
}

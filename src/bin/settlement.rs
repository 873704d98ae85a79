//! Settlement Service - Main Application Entry Point
//!
//! Accepts deposit, withdraw, and transfer requests, queues them, and
//! answers immediately. A background batch consumer settles the queue
//! against the Ledger Service.
//!
//! # Startup Flow
//!
//! 1. Load configuration from `SETTLEMENT_*` environment variables
//! 2. Build the ledger HTTP client and the operation queue
//! 3. Spawn the batch consumer
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port, exiting if the consumer stops

use std::future::IntoFuture;
use std::sync::Arc;

use ledger_settlement::{
    config::SettlementConfig,
    server,
    services::{
        batch_consumer::{BatchConsumer, SettlementStats},
        ledger_client::{HttpLedgerClient, LedgerApi},
        queue::OperationQueue,
    },
    state::SettlementState,
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let config = SettlementConfig::from_env()?;
    config.validate()?;
    tracing::info!("Configuration loaded");

    let ledger_url = config.ledger_url()?;
    let ledger: Arc<dyn LedgerApi> = Arc::new(HttpLedgerClient::new(
        ledger_url.clone(),
        config.ledger_token.clone(),
        config.request_timeout(),
    )?);
    tracing::info!(%ledger_url, owner_id = config.business_id, "Ledger client ready");

    let queue = Arc::new(OperationQueue::new(
        config.queue_capacity,
        config.dequeue_order,
    ));
    let stats = Arc::new(SettlementStats::default());

    tracing::info!(
        capacity = queue.capacity(),
        order = ?queue.order(),
        "Operation queue ready"
    );

    // Single consumer for the lifetime of the process
    let consumer = BatchConsumer::new(
        Arc::clone(&queue),
        Arc::clone(&ledger),
        config.owner_id(),
        config.batch_size,
        config.idle_interval(),
        Arc::clone(&stats),
    )
    .spawn();

    let state = SettlementState {
        queue,
        ledger,
        owner: config.owner_id(),
        credentials: Arc::new(config.credentials()?),
        stats,
    };
    let app = server::settlement_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Settlement service listening on {}", addr);

    // Without the consumer nothing settles, so its exit takes the service down
    tokio::select! {
        served = axum::serve(listener, app).into_future() => served?,
        joined = consumer => {
            match joined {
                Err(err) if err.is_panic() => tracing::error!(error = %err, "Batch consumer panicked"),
                _ => tracing::error!("Batch consumer exited"),
            }
            anyhow::bail!("batch consumer stopped, shutting down");
        }
    }

    Ok(())
}

//! Ledger Service - Main Application Entry Point
//!
//! Holds account balances and the per-account lock table. Business
//! front-ends lock an account, read it, write it, and unlock it over HTTP.
//!
//! # Startup Flow
//!
//! 1. Load configuration from `LEDGER_*` environment variables
//! 2. Build the credential registry
//! 3. Seed the pre-provisioned accounts
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

use ledger_settlement::{
    config::LedgerConfig, server, services::ledger::Ledger, state::LedgerState, telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let config = LedgerConfig::from_env()?;
    tracing::info!("Configuration loaded");

    let credentials = config.credentials()?;
    if credentials.is_empty() {
        tracing::warn!("No LEDGER_CREDENTIALS configured, every authenticated route will return 401");
    }

    let ledger = Ledger::from_config(&config);
    tracing::info!(
        accounts = ledger.account_count(),
        balance = %config.seed_balance,
        policy = ?ledger.locks().policy(),
        "Accounts seeded"
    );

    let app = server::ledger_router(LedgerState::new(ledger, credentials));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Ledger service listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

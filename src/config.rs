//! Application configuration management.
//!
//! Each binary reads its own prefixed environment variables into a typed
//! struct with the `envy` crate. A `.env` file is loaded first if present.

use std::time::Duration;

use anyhow::Context;
use rust_decimal::Decimal;
use serde::Deserialize;
use url::Url;

use crate::models::account::OwnerId;
use crate::models::credential::Credentials;
use crate::services::lock_table::OwnershipPolicy;
use crate::services::queue::DequeueOrder;

/// Ledger Service configuration (`LEDGER_` prefix).
///
/// # Environment Variables
///
/// - `LEDGER_PORT`: HTTP port, defaults to 5000
/// - `LEDGER_CREDENTIALS`: comma-separated `identity:token` pairs
/// - `LEDGER_SEED_ACCOUNTS`: number of pre-provisioned accounts, defaults to 10
/// - `LEDGER_SEED_BALANCE`: starting balance of each account, defaults to 1000
/// - `LEDGER_LOCK_TIMEOUT_MS`: bounded wait when acquiring a lock, defaults to 1000
/// - `LEDGER_OWNERSHIP_POLICY`: `sticky` or `handover`, defaults to `sticky`
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_port")]
    pub port: u16,

    #[serde(default)]
    pub credentials: Vec<String>,

    #[serde(default = "default_seed_accounts")]
    pub seed_accounts: u32,

    #[serde(default = "default_seed_balance")]
    pub seed_balance: Decimal,

    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    #[serde(default)]
    pub ownership_policy: OwnershipPolicy,
}

impl LedgerConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        // Does nothing if there is no .env file
        dotenvy::dotenv().ok();

        envy::prefixed("LEDGER_").from_env::<LedgerConfig>()
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn credentials(&self) -> anyhow::Result<Credentials> {
        Credentials::from_entries(&self.credentials).context("invalid LEDGER_CREDENTIALS")
    }
}

/// Settlement Service configuration (`SETTLEMENT_` prefix).
///
/// # Environment Variables
///
/// - `SETTLEMENT_PORT`: HTTP port, defaults to 5001
/// - `SETTLEMENT_LEDGER_URL`: base URL of the Ledger Service
/// - `SETTLEMENT_LEDGER_TOKEN` (required): token presented to the Ledger Service
/// - `SETTLEMENT_BUSINESS_ID`: owner id used for every ledger lock, defaults to 1
/// - `SETTLEMENT_CREDENTIALS`: comma-separated `identity:token` pairs for clients
/// - `SETTLEMENT_BATCH_SIZE`: operations per batch, defaults to 5
/// - `SETTLEMENT_IDLE_INTERVAL_MS`: consumer sleep when below threshold, defaults to 1000
/// - `SETTLEMENT_QUEUE_CAPACITY`: maximum queued operations, defaults to 10000
/// - `SETTLEMENT_DEQUEUE_ORDER`: `fifo` or `lifo`, defaults to `fifo`
/// - `SETTLEMENT_REQUEST_TIMEOUT_MS`: ledger HTTP timeout, defaults to 5000
#[derive(Debug, Clone, Deserialize)]
pub struct SettlementConfig {
    #[serde(default = "default_settlement_port")]
    pub port: u16,

    #[serde(default = "default_ledger_url")]
    pub ledger_url: String,

    pub ledger_token: String,

    #[serde(default = "default_business_id")]
    pub business_id: u32,

    #[serde(default)]
    pub credentials: Vec<String>,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_idle_interval_ms")]
    pub idle_interval_ms: u64,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default)]
    pub dequeue_order: DequeueOrder,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl SettlementConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();

        envy::prefixed("SETTLEMENT_").from_env::<SettlementConfig>()
    }

    pub fn owner_id(&self) -> OwnerId {
        OwnerId(self.business_id)
    }

    /// Ledger base URL, always ending in `/` so endpoint paths are joined
    /// below any prefix (`http://h/ledger` serves `http://h/ledger/lock`).
    pub fn ledger_url(&self) -> anyhow::Result<Url> {
        let mut url = Url::parse(&self.ledger_url)
            .with_context(|| format!("invalid SETTLEMENT_LEDGER_URL: {}", self.ledger_url))?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn credentials(&self) -> anyhow::Result<Credentials> {
        Credentials::from_entries(&self.credentials).context("invalid SETTLEMENT_CREDENTIALS")
    }

    /// Reject settings the batch consumer cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.batch_size > 0, "SETTLEMENT_BATCH_SIZE must be positive");
        anyhow::ensure!(
            self.queue_capacity >= self.batch_size,
            "SETTLEMENT_QUEUE_CAPACITY must be at least SETTLEMENT_BATCH_SIZE"
        );
        Ok(())
    }
}

/// Load client configuration (`CLIENT_` prefix).
///
/// # Environment Variables
///
/// - `CLIENT_SETTLEMENT_URLS`: comma-separated Settlement Service URLs
/// - `CLIENT_TOKENS` (required): comma-separated tokens, assigned round-robin to URLs
/// - `CLIENT_ACCOUNTS`: accounts are picked from `1..=CLIENT_ACCOUNTS`, defaults to 10
/// - `CLIENT_INTERVAL_MS`: pause between requests, defaults to 500
/// - `CLIENT_MAX_AMOUNT`: upper bound for random amounts, defaults to 100
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_settlement_urls")]
    pub settlement_urls: Vec<String>,

    pub tokens: Vec<String>,

    #[serde(default = "default_seed_accounts")]
    pub accounts: u32,

    #[serde(default = "default_client_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_max_amount")]
    pub max_amount: u32,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();

        envy::prefixed("CLIENT_").from_env::<ClientConfig>()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_ledger_port() -> u16 {
    5000
}

fn default_settlement_port() -> u16 {
    5001
}

fn default_seed_accounts() -> u32 {
    10
}

fn default_seed_balance() -> Decimal {
    Decimal::from(1000)
}

fn default_lock_timeout_ms() -> u64 {
    1000
}

fn default_ledger_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_business_id() -> u32 {
    1
}

fn default_batch_size() -> usize {
    5
}

fn default_idle_interval_ms() -> u64 {
    1000
}

fn default_queue_capacity() -> usize {
    10_000
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_settlement_urls() -> Vec<String> {
    vec!["http://localhost:5001".to_string()]
}

fn default_client_interval_ms() -> u64 {
    500
}

fn default_max_amount() -> u32 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn ledger_defaults() {
        let config: LedgerConfig = envy::from_iter(Vec::<(String, String)>::new()).unwrap();

        assert_eq!(config.port, 5000);
        assert_eq!(config.seed_accounts, 10);
        assert_eq!(config.seed_balance, Decimal::from(1000));
        assert_eq!(config.lock_timeout(), Duration::from_secs(1));
        assert_eq!(config.ownership_policy, OwnershipPolicy::Sticky);
        assert!(config.credentials().unwrap().is_empty());
    }

    #[test]
    fn settlement_reads_lists_and_enums() {
        let config: SettlementConfig = envy::from_iter(vars(&[
            ("LEDGER_TOKEN", "secret"),
            ("CREDENTIALS", "client-1:aaa,client-2:bbb"),
            ("DEQUEUE_ORDER", "lifo"),
            ("BATCH_SIZE", "3"),
        ]))
        .unwrap();

        assert_eq!(config.batch_size, 3);
        assert_eq!(config.dequeue_order, DequeueOrder::Lifo);
        assert_eq!(config.credentials().unwrap().len(), 2);
        assert_eq!(config.owner_id(), OwnerId(1));
        assert!(config.ledger_url().is_ok());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn ledger_url_keeps_path_prefix() {
        let config: SettlementConfig = envy::from_iter(vars(&[
            ("LEDGER_TOKEN", "secret"),
            ("LEDGER_URL", "http://ledger.internal:8080/ledger"),
        ]))
        .unwrap();

        let url = config.ledger_url().unwrap();
        assert_eq!(url.as_str(), "http://ledger.internal:8080/ledger/");
        assert_eq!(
            url.join("lock").unwrap().as_str(),
            "http://ledger.internal:8080/ledger/lock"
        );

        let config: SettlementConfig = envy::from_iter(vars(&[("LEDGER_TOKEN", "secret")])).unwrap();
        assert_eq!(config.ledger_url().unwrap().as_str(), "http://localhost:5000/");
    }

    #[test]
    fn settlement_rejects_zero_batch() {
        let config: SettlementConfig =
            envy::from_iter(vars(&[("LEDGER_TOKEN", "secret"), ("BATCH_SIZE", "0")])).unwrap();

        assert!(config.validate().is_err());
    }
}

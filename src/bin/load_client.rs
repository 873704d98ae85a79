//! Load client - keeps the Settlement Services busy.
//!
//! In a loop, picks a random Settlement Service and a random account, reads
//! the balance, and queues a random deposit, withdrawal, or transfer.
//! Failures are logged and the loop continues.

use anyhow::Context;
use rand::Rng;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use url::Url;

use ledger_settlement::{
    config::ClientConfig,
    models::{account::BalanceResponse, operation::EnqueueResponse},
    telemetry,
};

/// Stateless client for one Settlement Service.
struct SettlementClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl SettlementClient {
    async fn fetch_balance(&self, account: u32) -> anyhow::Result<Decimal> {
        let response = self
            .http
            .get(self.base_url.join(&format!("balance/{account}"))?)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            anyhow::bail!("balance request failed ({status}): {}", response.text().await?);
        }

        Ok(response.json::<BalanceResponse>().await?.balance)
    }

    /// POST one of the queued operations, e.g. `deposit/3/25`.
    async fn submit(&self, path: &str) -> anyhow::Result<EnqueueResponse> {
        let response = self
            .http
            .post(self.base_url.join(path)?)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            anyhow::bail!("{path} failed ({status}): {}", response.text().await?);
        }

        Ok(response.json().await?)
    }
}

/// One randomly chosen round of work.
struct Round {
    client: usize,
    account: u32,
    operation: String,
}

fn pick_round(clients: usize, accounts: u32, max_amount: u32) -> Round {
    let mut rng = rand::rng();
    let account = rng.random_range(1..=accounts);
    let amount = rng.random_range(1..=max_amount);

    let operation = match rng.random_range(0..3) {
        0 => format!("deposit/{account}/{amount}"),
        1 => format!("withdraw/{account}/{amount}"),
        _ => {
            let mut credit = rng.random_range(1..=accounts);
            if credit == account {
                credit = account % accounts + 1;
            }
            format!("transfer/{account}/{credit}/{amount}")
        }
    };

    Round {
        client: rng.random_range(0..clients),
        account,
        operation,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let config = ClientConfig::from_env()?;
    anyhow::ensure!(!config.tokens.is_empty(), "CLIENT_TOKENS must not be empty");
    anyhow::ensure!(config.accounts > 1, "CLIENT_ACCOUNTS must be at least 2");
    anyhow::ensure!(config.max_amount > 0, "CLIENT_MAX_AMOUNT must be positive");

    let http = reqwest::Client::new();
    let clients = config
        .settlement_urls
        .iter()
        .enumerate()
        .map(|(index, url)| {
            Ok(SettlementClient {
                http: http.clone(),
                base_url: Url::parse(url).with_context(|| format!("invalid URL: {url}"))?,
                // Tokens are handed out round-robin
                token: config.tokens[index % config.tokens.len()].clone(),
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    anyhow::ensure!(!clients.is_empty(), "CLIENT_SETTLEMENT_URLS must not be empty");

    tracing::info!(services = clients.len(), "Load client started");

    let mut ticker = tokio::time::interval(config.interval());
    loop {
        ticker.tick().await;

        let round = pick_round(clients.len(), config.accounts, config.max_amount);
        let client = &clients[round.client];

        match client.fetch_balance(round.account).await {
            Ok(balance) => tracing::info!(account = round.account, %balance, "Balance"),
            Err(err) => tracing::error!(account = round.account, error = %err, "Balance request failed"),
        }

        match client.submit(&round.operation).await {
            Ok(accepted) => tracing::info!(
                operation = %round.operation,
                operation_id = %accepted.operation_id,
                queued = accepted.queued,
                "Operation accepted"
            ),
            Err(err) => tracing::error!(operation = %round.operation, error = %err, "Operation rejected"),
        }
    }
}

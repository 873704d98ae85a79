//! Access to the Ledger Service from the settlement side.
//!
//! The batch consumer only needs four calls: acquire, release, read, write.
//! [`LedgerApi`] captures them so the consumer runs the same way against the
//! remote Ledger Service ([`HttpLedgerClient`]) or an in-process [`Ledger`].

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use url::Url;

use crate::error::AppError;
use crate::models::account::{AccountId, BalanceUpdate, LockRequest, OwnerId};
use crate::services::ledger::Ledger;

#[async_trait]
pub trait LedgerApi: Send + Sync {
    async fn acquire(&self, owner: OwnerId, account: AccountId) -> Result<(), AppError>;

    async fn release(&self, owner: OwnerId, account: AccountId) -> Result<(), AppError>;

    async fn read_balance(&self, owner: OwnerId, account: AccountId) -> Result<Decimal, AppError>;

    async fn write_balance(
        &self,
        owner: OwnerId,
        account: AccountId,
        amount: Decimal,
    ) -> Result<(), AppError>;
}

#[async_trait]
impl LedgerApi for Ledger {
    async fn acquire(&self, owner: OwnerId, account: AccountId) -> Result<(), AppError> {
        Ledger::acquire(self, account, owner).await
    }

    async fn release(&self, owner: OwnerId, account: AccountId) -> Result<(), AppError> {
        Ledger::release(self, account, owner)
    }

    async fn read_balance(&self, owner: OwnerId, account: AccountId) -> Result<Decimal, AppError> {
        Ledger::read_balance(self, owner, account)
    }

    async fn write_balance(
        &self,
        owner: OwnerId,
        account: AccountId,
        amount: Decimal,
    ) -> Result<(), AppError> {
        Ledger::write_balance(self, owner, account, amount)
    }
}

/// Body shape shared by every Ledger Service response.
#[derive(Debug, Deserialize)]
struct LedgerReply {
    error: i32,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    balance: Option<Decimal>,
}

/// reqwest-based client for the Ledger Service HTTP API.
///
/// # Headers Sent
///
/// - `Authorization: Bearer <token>`
/// - `Content-Type: application/json` on requests with a body
pub struct HttpLedgerClient {
    client: reqwest::Client,
    base_url: Url,
    token: String,
}

impl HttpLedgerClient {
    /// Build a client for the ledger at `base_url`.
    ///
    /// Endpoints are joined onto `base_url`, so a path prefix is only kept
    /// when it ends in `/` (see `SettlementConfig::ledger_url`).
    ///
    /// `timeout` bounds every request, so a stalled ledger cannot hang the
    /// batch consumer.
    pub fn new(base_url: Url, token: String, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::LedgerUnavailable(format!("Invalid ledger URL: {e}")))
    }

    fn balance_endpoint(&self, owner: OwnerId, account: AccountId) -> Result<Url, AppError> {
        self.endpoint(&format!("balance/{owner}/{account}"))
    }

    /// Turn a ledger response into `Ok(reply)` or the error it encodes.
    async fn read_reply(response: reqwest::Response) -> Result<LedgerReply, AppError> {
        let status = response.status();
        let reply: LedgerReply = response.json().await.map_err(|e| {
            AppError::LedgerUnavailable(format!("Unreadable ledger response ({status}): {e}"))
        })?;

        if reply.error == 0 && status.is_success() {
            return Ok(reply);
        }

        let message = reply.message.clone().unwrap_or_default();
        Err(match reply.code.as_deref() {
            Some(code) => AppError::from_code(code, message),
            None => match status.as_u16() {
                401 => AppError::InvalidCredentials,
                403 => AppError::OwnedByOther,
                404 => AppError::AccountNotFound,
                _ => AppError::LedgerUnavailable(format!("Ledger answered {status}")),
            },
        })
    }
}

#[async_trait]
impl LedgerApi for HttpLedgerClient {
    async fn acquire(&self, owner: OwnerId, account: AccountId) -> Result<(), AppError> {
        let response = self
            .client
            .put(self.endpoint("lock")?)
            .bearer_auth(&self.token)
            .json(&LockRequest {
                owner_id: owner,
                account,
            })
            .send()
            .await?;

        Self::read_reply(response).await.map(|_| ())
    }

    async fn release(&self, owner: OwnerId, account: AccountId) -> Result<(), AppError> {
        let response = self
            .client
            .delete(self.endpoint("lock")?)
            .bearer_auth(&self.token)
            .json(&LockRequest {
                owner_id: owner,
                account,
            })
            .send()
            .await?;

        Self::read_reply(response).await.map(|_| ())
    }

    async fn read_balance(&self, owner: OwnerId, account: AccountId) -> Result<Decimal, AppError> {
        let response = self
            .client
            .get(self.balance_endpoint(owner, account)?)
            .bearer_auth(&self.token)
            .send()
            .await?;

        Self::read_reply(response)
            .await?
            .balance
            .ok_or_else(|| AppError::LedgerUnavailable("Balance missing from response".to_string()))
    }

    async fn write_balance(
        &self,
        owner: OwnerId,
        account: AccountId,
        amount: Decimal,
    ) -> Result<(), AppError> {
        let response = self
            .client
            .put(self.balance_endpoint(owner, account)?)
            .bearer_auth(&self.token)
            .json(&BalanceUpdate { amount })
            .send()
            .await?;

        Self::read_reply(response).await.map(|_| ())
    }
}

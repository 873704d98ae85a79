//! Account identifiers and the Ledger Service wire types.
//!
//! This module defines:
//! - `AccountId` / `OwnerId`: identifiers for accounts and business front-ends
//! - `LockRequest`: body of `PUT /lock` and `DELETE /lock`
//! - `BalanceUpdate`: body of `PUT /balance/{owner_id}/{account}`
//! - `BalanceResponse` / `Ack`: response bodies returned to callers

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier of a ledger account.
///
/// Accounts are pre-provisioned by the Ledger Service at startup
/// (ids `1..=seed_accounts`). Any other id is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub u32);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a business front-end (a Settlement Service instance).
///
/// The Lock Table records the owner of every account lock using this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub u32);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request to acquire or release an account lock.
///
/// # JSON Example
///
/// ```json
/// {
///   "owner_id": 1,
///   "account": 3
/// }
/// ```
///
/// `business_id` is accepted in place of `owner_id` for older callers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LockRequest {
    /// Business front-end requesting the lock
    #[serde(alias = "business_id")]
    pub owner_id: OwnerId,

    /// Account to lock or unlock
    pub account: AccountId,
}

/// Request to overwrite an account balance.
///
/// # JSON Example
///
/// ```json
/// {
///   "amount": "1100"
/// }
/// ```
///
/// Numbers are accepted as well as strings. `valor` is accepted in place of
/// `amount` for older callers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BalanceUpdate {
    #[serde(alias = "valor")]
    pub amount: Decimal,
}

/// Response body for balance reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    /// Current balance of the account
    pub balance: Decimal,

    /// Always `0` on success
    pub error: i32,
}

impl BalanceResponse {
    pub fn new(balance: Decimal) -> Self {
        Self { balance, error: 0 }
    }
}

/// Plain acknowledgement: `{"error": 0}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    pub error: i32,
}

impl Ack {
    pub fn ok() -> Self {
        Self { error: 0 }
    }
}

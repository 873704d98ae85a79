//! Balance-changing operations accepted by the Settlement Service.
//!
//! This module defines:
//! - `Operation`: the deposit / withdraw / transfer request itself
//! - `QueuedOperation`: an operation as stored in the Operation Queue
//! - `EnqueueResponse`: response body returned when an operation is accepted

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::account::AccountId;

/// Largest amount accepted for a single operation (one billion).
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// A balance-changing request.
///
/// Operations are created by the HTTP handlers, queued, and later settled by
/// the batch consumer. They are never mutated once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    /// Add `amount` to `account`.
    Deposit { account: AccountId, amount: Decimal },

    /// Remove `amount` from `account`. The balance may go negative.
    Withdraw { account: AccountId, amount: Decimal },

    /// Move `amount` from `debit_account` to `credit_account`.
    Transfer {
        debit_account: AccountId,
        credit_account: AccountId,
        amount: Decimal,
    },
}

impl Operation {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Deposit { .. } => "deposit",
            Operation::Withdraw { .. } => "withdraw",
            Operation::Transfer { .. } => "transfer",
        }
    }

    /// Every account whose lock must be held while settling this operation.
    pub fn accounts(&self) -> Vec<AccountId> {
        match *self {
            Operation::Deposit { account, .. } | Operation::Withdraw { account, .. } => {
                vec![account]
            }
            Operation::Transfer {
                debit_account,
                credit_account,
                ..
            } => vec![debit_account, credit_account],
        }
    }

    pub fn amount(&self) -> Decimal {
        match *self {
            Operation::Deposit { amount, .. }
            | Operation::Withdraw { amount, .. }
            | Operation::Transfer { amount, .. } => amount,
        }
    }

    /// Validate the operation before it is queued.
    ///
    /// # Rules
    ///
    /// - Amount must be strictly positive and at most [`MAX_AMOUNT`]
    /// - A transfer must move money between two different accounts
    pub fn validate(&self) -> Result<(), AppError> {
        if self.amount() <= Decimal::ZERO {
            return Err(AppError::InvalidRequest(
                "Amount must be positive".to_string(),
            ));
        }

        if self.amount() > MAX_AMOUNT {
            return Err(AppError::InvalidRequest(format!(
                "Amount must not exceed {MAX_AMOUNT}"
            )));
        }

        if let Operation::Transfer {
            debit_account,
            credit_account,
            ..
        } = self
        {
            if debit_account == credit_account {
                return Err(AppError::InvalidRequest(
                    "Cannot transfer to same account".to_string(),
                ));
            }
        }

        Ok(())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Deposit { account, amount } => write!(f, "deposit {amount} to {account}"),
            Operation::Withdraw { account, amount } => {
                write!(f, "withdraw {amount} from {account}")
            }
            Operation::Transfer {
                debit_account,
                credit_account,
                amount,
            } => write!(f, "transfer {amount} from {debit_account} to {credit_account}"),
        }
    }
}

/// Parse an amount taken from a URL path segment (`"100"`, `"100.0"`, `"12.5"`).
pub fn parse_amount(raw: &str) -> Result<Decimal, AppError> {
    Decimal::from_str(raw)
        .map_err(|_| AppError::InvalidRequest(format!("Invalid amount: {raw}")))
}

/// An operation sitting in the Operation Queue.
#[derive(Debug, Clone, Serialize)]
pub struct QueuedOperation {
    /// Identifier returned to the client and used in settlement logs
    pub id: Uuid,

    pub operation: Operation,

    /// When the Settlement Service accepted the operation
    pub accepted_at: DateTime<Utc>,
}

impl QueuedOperation {
    pub fn new(operation: Operation) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation,
            accepted_at: Utc::now(),
        }
    }
}

/// Response returned once an operation is accepted into the queue.
///
/// Acceptance says nothing about settlement: the balance changes later,
/// when the batch consumer drains the queue.
///
/// # JSON Example
///
/// ```json
/// {
///   "error": 0,
///   "operation_id": "550e8400-e29b-41d4-a716-446655440000",
///   "queued": 3
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct EnqueueResponse {
    pub error: i32,
    pub operation_id: Uuid,

    /// Queue depth right after this operation was pushed
    pub queued: usize,
}

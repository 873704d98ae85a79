//! Settlement Service HTTP handlers.
//!
//! This module implements the client-facing endpoints:
//! - GET /balance/{account} - Synchronous pass-through to the Ledger Service
//! - POST /deposit/{account}/{amount} - Queue a deposit
//! - POST /withdraw/{account}/{amount} - Queue a withdrawal
//! - POST /transfer/{debit}/{credit}/{amount} - Queue a transfer
//!
//! Queued operations are answered as soon as they are accepted. Their effect
//! on balances happens later, when the batch consumer settles them.

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::PathRejection},
};

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        account::{AccountId, BalanceResponse},
        operation::{EnqueueResponse, Operation, QueuedOperation, parse_amount},
    },
    state::SettlementState,
};

/// Read an account balance through the Ledger Service.
///
/// # Response (200)
///
/// ```json
/// { "balance": "1000", "error": 0 }
/// ```
///
/// A 404 from the ledger is passed through.
pub async fn get_balance(
    State(state): State<SettlementState>,
    path: Result<Path<AccountId>, PathRejection>,
) -> Result<Json<BalanceResponse>, AppError> {
    let Path(account) = path?;

    let balance = state.ledger.read_balance(state.owner, account).await?;

    Ok(Json(BalanceResponse::new(balance)))
}

/// Queue a deposit.
///
/// # Response (200)
///
/// ```json
/// {
///   "error": 0,
///   "operation_id": "550e8400-e29b-41d4-a716-446655440000",
///   "queued": 1
/// }
/// ```
///
/// # Errors
///
/// - **400**: non-numeric or non-positive amount
/// - **503**: queue full
pub async fn deposit(
    State(state): State<SettlementState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<(AccountId, String)>, PathRejection>,
) -> Result<Json<EnqueueResponse>, AppError> {
    let Path((account, amount)) = path?;
    let operation = Operation::Deposit {
        account,
        amount: parse_amount(&amount)?,
    };

    enqueue(&state, &auth, operation)
}

/// Queue a withdrawal. Balances may go negative once it settles.
pub async fn withdraw(
    State(state): State<SettlementState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<(AccountId, String)>, PathRejection>,
) -> Result<Json<EnqueueResponse>, AppError> {
    let Path((account, amount)) = path?;
    let operation = Operation::Withdraw {
        account,
        amount: parse_amount(&amount)?,
    };

    enqueue(&state, &auth, operation)
}

/// Queue a transfer from `debit` to `credit`.
///
/// Transfers to the same account are rejected with 400.
pub async fn transfer(
    State(state): State<SettlementState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<(AccountId, AccountId, String)>, PathRejection>,
) -> Result<Json<EnqueueResponse>, AppError> {
    let Path((debit_account, credit_account, amount)) = path?;
    let operation = Operation::Transfer {
        debit_account,
        credit_account,
        amount: parse_amount(&amount)?,
    };

    enqueue(&state, &auth, operation)
}

/// Validate and push an operation.
fn enqueue(
    state: &SettlementState,
    auth: &AuthContext,
    operation: Operation,
) -> Result<Json<EnqueueResponse>, AppError> {
    operation.validate()?;

    let queued = QueuedOperation::new(operation);
    let operation_id = queued.id;
    let kind = queued.operation.kind();

    let depth = state.queue.push(queued).inspect_err(|_| {
        tracing::warn!(caller = %auth.caller, kind, "Operation rejected, queue full");
    })?;

    tracing::info!(
        caller = %auth.caller,
        %operation_id,
        kind,
        queued = depth,
        "Operation accepted"
    );

    Ok(Json(EnqueueResponse {
        error: 0,
        operation_id,
        queued: depth,
    }))
}

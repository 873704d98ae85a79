//! Ledger Service HTTP handlers.
//!
//! This module implements the lock and balance endpoints:
//! - PUT /lock - Acquire an account lock
//! - DELETE /lock - Release an account lock
//! - GET /balance/{owner_id}/{account} - Read a balance
//! - PUT /balance/{owner_id}/{account} - Overwrite a balance (lock owner only)

use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::account::{AccountId, Ack, BalanceResponse, BalanceUpdate, LockRequest, OwnerId},
    state::LedgerState,
};

/// Acquire the lock on an account.
///
/// # Request Body
///
/// ```json
/// { "owner_id": 1, "account": 3 }
/// ```
///
/// # Response
///
/// - **200** `{"error": 0}`: lock acquired
/// - **200** `{"error": -1, "code": "already_locked"}`: caller already holds it,
///   or the bounded wait expired
/// - **403**: account locked by a different business
/// - **400**: malformed payload
pub async fn acquire_lock(
    State(state): State<LedgerState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<LockRequest>, JsonRejection>,
) -> Result<Json<Ack>, AppError> {
    let Json(request) = payload?;
    tracing::debug!(caller = %auth.caller, account = %request.account, "Lock requested");

    state
        .ledger
        .acquire(request.account, request.owner_id)
        .await?;

    Ok(Json(Ack::ok()))
}

/// Release the lock on an account.
///
/// # Response
///
/// - **200** `{"error": 0}`: lock released
/// - **200** `{"error": -1, "code": "not_held"}`: lock was not held
/// - **403**: account locked by a different business
pub async fn release_lock(
    State(state): State<LedgerState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<LockRequest>, JsonRejection>,
) -> Result<Json<Ack>, AppError> {
    let Json(request) = payload?;
    tracing::debug!(caller = %auth.caller, account = %request.account, "Unlock requested");

    state.ledger.release(request.account, request.owner_id)?;

    Ok(Json(Ack::ok()))
}

/// Read an account balance. No lock is required.
///
/// # Response (200)
///
/// ```json
/// { "balance": "1000", "error": 0 }
/// ```
///
/// Returns 404 for an account that was never provisioned.
pub async fn get_balance(
    State(state): State<LedgerState>,
    path: Result<Path<(OwnerId, AccountId)>, PathRejection>,
) -> Result<Json<BalanceResponse>, AppError> {
    let Path((owner, account)) = path?;

    let balance = state.ledger.read_balance(owner, account)?;

    Ok(Json(BalanceResponse::new(balance)))
}

/// Overwrite an account balance.
///
/// # Request Body
///
/// ```json
/// { "amount": "1100" }
/// ```
///
/// # Response
///
/// - **200** `{"error": 0}`: balance written
/// - **403**: account not locked, or locked by a different business
/// - **404**: unknown account
pub async fn put_balance(
    State(state): State<LedgerState>,
    path: Result<Path<(OwnerId, AccountId)>, PathRejection>,
    payload: Result<Json<BalanceUpdate>, JsonRejection>,
) -> Result<Json<Ack>, AppError> {
    let Path((owner, account)) = path?;
    let Json(update) = payload?;

    state.ledger.write_balance(owner, account, update.amount)?;

    Ok(Json(Ack::ok()))
}

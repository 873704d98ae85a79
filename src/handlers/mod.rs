//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params)
//! 2. Calls into the ledger or the operation queue
//! 3. Returns HTTP response (JSON, status code)

/// Health endpoints for both services
pub mod health;
/// Lock and balance endpoints of the Ledger Service
pub mod ledger;
/// Client-facing endpoints of the Settlement Service
pub mod settlement;

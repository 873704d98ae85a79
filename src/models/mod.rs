//! Data models shared by both services.
//!
//! This module contains identifiers, wire types, and queued operations.

/// Account and owner identifiers, ledger request/response bodies
pub mod account;
/// Hashed bearer-token registry
pub mod credential;
/// Deposit / withdraw / transfer operations
pub mod operation;

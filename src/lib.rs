//! Multi-tenant ledger with cross-service locking and batched settlement.
//!
//! Two HTTP services share this crate:
//!
//! - **Ledger Service**: owns account balances and a per-account lock table.
//!   Callers lock an account, read it, write it, and unlock it.
//! - **Settlement Service**: accepts deposit, withdraw, and transfer requests,
//!   queues them, and answers immediately. A background batch consumer drains
//!   the queue in fixed-size batches and settles each operation against the
//!   Ledger Service with a lock / read / write / unlock sequence.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Ledger client**: reqwest, behind the `LedgerApi` trait
//! - **Authentication**: bearer tokens checked against SHA-256 hashes
//! - **Format**: JSON requests/responses, decimal amounts

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod server;
pub mod services;
pub mod state;
pub mod telemetry;

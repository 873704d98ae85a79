//! Business logic services.
//!
//! Services contain the core locking and settlement logic, separated from
//! HTTP handlers.

pub mod balance_store;
pub mod batch_consumer;
pub mod ledger;
pub mod ledger_client;
pub mod lock_table;
pub mod queue;

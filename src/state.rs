//! Shared state injected into request handlers.
//!
//! Each service builds one state value at startup and hands it to its router.
//! Handlers receive it through axum's `State` extractor; nothing lives in
//! process-wide globals.

use std::sync::Arc;

use crate::models::account::OwnerId;
use crate::models::credential::Credentials;
use crate::services::batch_consumer::SettlementStats;
use crate::services::ledger::Ledger;
use crate::services::ledger_client::LedgerApi;
use crate::services::queue::OperationQueue;

/// State of the Ledger Service.
#[derive(Clone)]
pub struct LedgerState {
    pub ledger: Arc<Ledger>,
    pub credentials: Arc<Credentials>,
}

impl LedgerState {
    pub fn new(ledger: Ledger, credentials: Credentials) -> Self {
        Self {
            ledger: Arc::new(ledger),
            credentials: Arc::new(credentials),
        }
    }
}

/// State of the Settlement Service.
///
/// The queue and stats are shared with the batch consumer task.
#[derive(Clone)]
pub struct SettlementState {
    pub queue: Arc<OperationQueue>,
    pub ledger: Arc<dyn LedgerApi>,
    /// Owner id this front-end locks ledger accounts under
    pub owner: OwnerId,
    pub credentials: Arc<Credentials>,
    pub stats: Arc<SettlementStats>,
}

//! Health check endpoints for service monitoring.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::services::batch_consumer::StatsSnapshot;
use crate::services::queue::DequeueOrder;
use crate::state::{LedgerState, SettlementState};

/// Ledger Service health response.
#[derive(Debug, Serialize)]
pub struct LedgerHealth {
    /// Overall service status
    pub status: String,

    /// Pre-provisioned accounts
    pub accounts: usize,

    /// Ledger operations served since startup
    pub operations: u64,

    /// Current server timestamp
    pub timestamp: DateTime<Utc>,
}

/// Settlement Service health response.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "status": "healthy",
///   "queued": 3,
///   "capacity": 10000,
///   "order": "fifo",
///   "settlement": { "settled": 120, "failed": 2, "batches": 25, "consumer_running": true },
///   "timestamp": "2025-12-21T19:00:00Z"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct SettlementHealth {
    /// `healthy` while the batch consumer runs, `degraded` otherwise
    pub status: String,

    /// Operations waiting for the batch consumer
    pub queued: usize,

    pub capacity: usize,

    pub order: DequeueOrder,

    pub settlement: StatsSnapshot,

    pub timestamp: DateTime<Utc>,
}

pub async fn ledger_health(State(state): State<LedgerState>) -> Json<LedgerHealth> {
    Json(LedgerHealth {
        status: "healthy".to_string(),
        accounts: state.ledger.account_count(),
        operations: state.ledger.operation_count(),
        timestamp: Utc::now(),
    })
}

pub async fn settlement_health(State(state): State<SettlementState>) -> Json<SettlementHealth> {
    let settlement = state.stats.snapshot();
    let status = if settlement.consumer_running {
        "healthy"
    } else {
        "degraded"
    };

    Json(SettlementHealth {
        status: status.to_string(),
        queued: state.queue.len(),
        capacity: state.queue.capacity(),
        order: state.queue.order(),
        settlement,
        timestamp: Utc::now(),
    })
}

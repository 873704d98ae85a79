//! Batch consumer - settles queued operations against the Ledger Service.
//!
//! A single background task drains the Operation Queue in fixed-size
//! batches. Operations inside a batch run one at a time, in the order they
//! were taken from the queue. Each one runs its settlement sequence:
//!
//! 1. Acquire every account lock it touches, in ascending account order
//! 2. Read the balances
//! 3. Write the new balances
//! 4. Release every acquired lock, whatever happened in steps 1-3
//!
//! A failed operation is logged and counted, then the next one runs. There
//! are no retries.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::error::AppError;
use crate::models::account::{AccountId, OwnerId};
use crate::models::operation::Operation;
use crate::services::ledger_client::LedgerApi;
use crate::services::queue::OperationQueue;

/// Running totals exposed on the health endpoint.
#[derive(Debug, Default)]
pub struct SettlementStats {
    settled: AtomicU64,
    failed: AtomicU64,
    batches: AtomicU64,
    running: AtomicBool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub settled: u64,
    pub failed: u64,
    pub batches: u64,
    pub consumer_running: bool,
}

impl SettlementStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            settled: self.settled.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
            consumer_running: self.is_running(),
        }
    }

    /// True while a consumer loop is alive.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn record(&self, report: &BatchReport) {
        self.settled
            .fetch_add(report.settled as u64, Ordering::Relaxed);
        self.failed.fetch_add(report.failed as u64, Ordering::Relaxed);
        self.batches.fetch_add(1, Ordering::Relaxed);
    }
}

/// Holds the running flag up for the life of the loop future. Dropping it,
/// on abort or panic unwind included, clears the flag.
struct RunningGuard(Arc<SettlementStats>);

impl RunningGuard {
    fn new(stats: Arc<SettlementStats>) -> Self {
        stats.running.store(true, Ordering::Release);
        Self(stats)
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.running.store(false, Ordering::Release);
        tracing::error!("Batch consumer stopped");
    }
}

/// Outcome of one drained batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub settled: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct BatchConsumer {
    queue: Arc<OperationQueue>,
    ledger: Arc<dyn LedgerApi>,
    owner: OwnerId,
    batch_size: usize,
    idle_interval: Duration,
    stats: Arc<SettlementStats>,
}

impl BatchConsumer {
    pub fn new(
        queue: Arc<OperationQueue>,
        ledger: Arc<dyn LedgerApi>,
        owner: OwnerId,
        batch_size: usize,
        idle_interval: Duration,
        stats: Arc<SettlementStats>,
    ) -> Self {
        Self {
            queue,
            ledger,
            owner,
            batch_size,
            idle_interval,
            stats,
        }
    }

    /// Run the consumer loop on its own task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Drain batches forever, sleeping `idle_interval` whenever fewer than
    /// `batch_size` operations are queued.
    pub async fn run(self) {
        let _running = RunningGuard::new(Arc::clone(&self.stats));
        tracing::info!(
            owner_id = %self.owner,
            batch_size = self.batch_size,
            "Batch consumer started"
        );

        loop {
            if self.run_once().await.is_none() {
                tokio::time::sleep(self.idle_interval).await;
            }
        }
    }

    /// Settle one batch if the queue has reached the threshold.
    ///
    /// Returns `None` without touching the queue when it holds fewer than
    /// `batch_size` operations.
    pub async fn run_once(&self) -> Option<BatchReport> {
        let batch = self.queue.try_drain_batch(self.batch_size)?;
        tracing::info!(
            size = batch.len(),
            remaining = self.queue.len(),
            "Draining batch"
        );

        let mut report = BatchReport::default();
        for queued in batch {
            let queued_ms = (Utc::now() - queued.accepted_at).num_milliseconds();
            match self.settle(&queued.operation).await {
                Ok(()) => {
                    report.settled += 1;
                    tracing::info!(
                        operation_id = %queued.id,
                        kind = queued.operation.kind(),
                        queued_ms,
                        "Settled {}",
                        queued.operation
                    );
                }
                Err(err) => {
                    report.failed += 1;
                    tracing::error!(
                        operation_id = %queued.id,
                        kind = queued.operation.kind(),
                        queued_ms,
                        error = %err,
                        "Failed to settle {}",
                        queued.operation
                    );
                }
            }
        }

        self.stats.record(&report);
        Some(report)
    }

    /// Run the settlement sequence for a single operation.
    pub async fn settle(&self, operation: &Operation) -> Result<(), AppError> {
        match *operation {
            Operation::Deposit { account, amount } => self.adjust(account, amount).await,
            Operation::Withdraw { account, amount } => self.adjust(account, -amount).await,
            Operation::Transfer {
                debit_account,
                credit_account,
                amount,
            } => self.transfer(debit_account, credit_account, amount).await,
        }
    }

    /// Read-modify-write of a single balance. Negative results are allowed.
    async fn adjust(&self, account: AccountId, delta: Decimal) -> Result<(), AppError> {
        self.with_locks(&[account], || async move {
            let balance = self.ledger.read_balance(self.owner, account).await?;
            let updated = checked(balance.checked_add(delta))?;
            self.ledger
                .write_balance(self.owner, account, updated)
                .await
        })
        .await
    }

    async fn transfer(
        &self,
        debit: AccountId,
        credit: AccountId,
        amount: Decimal,
    ) -> Result<(), AppError> {
        self.with_locks(&[debit, credit], || async move {
            let debit_balance = self.ledger.read_balance(self.owner, debit).await?;
            let credit_balance = self.ledger.read_balance(self.owner, credit).await?;

            // Both results are computed before anything is written
            let debited = checked(debit_balance.checked_sub(amount))?;
            let credited = checked(credit_balance.checked_add(amount))?;

            self.ledger
                .write_balance(self.owner, debit, debited)
                .await?;

            if let Err(err) = self
                .ledger
                .write_balance(self.owner, credit, credited)
                .await
            {
                // Undo the debit so the transfer is not left half-applied
                match self
                    .ledger
                    .write_balance(self.owner, debit, debit_balance)
                    .await
                {
                    Ok(()) => tracing::warn!(
                        debit_account = %debit,
                        credit_account = %credit,
                        "Credit failed, debit restored"
                    ),
                    Err(restore_err) => tracing::error!(
                        debit_account = %debit,
                        credit_account = %credit,
                        %amount,
                        error = %restore_err,
                        "Credit failed and debit could not be restored"
                    ),
                }
                return Err(err);
            }

            Ok(())
        })
        .await
    }

    /// Hold the locks of `accounts` while `body` runs.
    ///
    /// Locks are taken in ascending account order and released in reverse
    /// order on every exit path, including a failed acquire part way through.
    async fn with_locks<T, F, Fut>(&self, accounts: &[AccountId], body: F) -> Result<T, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let mut ordered = accounts.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        let mut held = Vec::with_capacity(ordered.len());
        for account in ordered {
            match self.ledger.acquire(self.owner, account).await {
                Ok(()) => held.push(account),
                Err(err) => {
                    // The ledger may have granted a lock whose response we lost
                    if matches!(err, AppError::Http(_)) {
                        held.push(account);
                    }
                    self.release_all(&held).await;
                    return Err(err);
                }
            }
        }

        let outcome = body().await;
        self.release_all(&held).await;
        outcome
    }

    async fn release_all(&self, held: &[AccountId]) {
        for &account in held.iter().rev() {
            match self.ledger.release(self.owner, account).await {
                Ok(()) => {}
                Err(AppError::NotHeld) => {
                    tracing::debug!(%account, "Lock was not held at release")
                }
                Err(err) => tracing::warn!(%account, error = %err, "Failed to release lock"),
            }
        }
    }
}

fn checked(balance: Option<Decimal>) -> Result<Decimal, AppError> {
    balance.ok_or_else(|| AppError::InvalidRequest("Balance overflow".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::operation::QueuedOperation;
    use crate::services::balance_store::BalanceStore;
    use crate::services::ledger::Ledger;
    use crate::services::lock_table::{LockTable, OwnershipPolicy};
    use crate::services::queue::DequeueOrder;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;

    const OWNER: OwnerId = OwnerId(1);

    fn ledger() -> Arc<Ledger> {
        Arc::new(Ledger::new(
            LockTable::new(Duration::from_millis(50), OwnershipPolicy::Sticky),
            BalanceStore::seeded(10, dec!(1000)),
        ))
    }

    fn consumer(queue: &Arc<OperationQueue>, ledger: Arc<dyn LedgerApi>) -> BatchConsumer {
        BatchConsumer::new(
            Arc::clone(queue),
            ledger,
            OWNER,
            5,
            Duration::from_millis(10),
            Arc::new(SettlementStats::default()),
        )
    }

    fn enqueue(queue: &OperationQueue, operation: Operation) {
        queue.push(QueuedOperation::new(operation)).unwrap();
    }

    fn deposit(account: u32, amount: Decimal) -> Operation {
        Operation::Deposit {
            account: AccountId(account),
            amount,
        }
    }

    fn withdraw(account: u32, amount: Decimal) -> Operation {
        Operation::Withdraw {
            account: AccountId(account),
            amount,
        }
    }

    fn transfer(debit: u32, credit: u32, amount: Decimal) -> Operation {
        Operation::Transfer {
            debit_account: AccountId(debit),
            credit_account: AccountId(credit),
            amount,
        }
    }

    fn balance(ledger: &Ledger, account: u32) -> Decimal {
        ledger.read_balance(OWNER, AccountId(account)).unwrap()
    }

    #[tokio::test]
    async fn settles_a_mixed_batch() {
        let queue = Arc::new(OperationQueue::new(100, DequeueOrder::Fifo));
        let ledger = ledger();
        let consumer = consumer(&queue, ledger.clone());

        enqueue(&queue, deposit(1, dec!(100)));
        enqueue(&queue, deposit(1, dec!(100)));
        enqueue(&queue, withdraw(2, dec!(100)));
        enqueue(&queue, withdraw(2, dec!(100)));
        enqueue(&queue, transfer(3, 4, dec!(100)));

        let report = consumer.run_once().await.unwrap();

        assert_eq!(report, BatchReport { settled: 5, failed: 0 });
        assert_eq!(balance(&ledger, 1), dec!(1200));
        assert_eq!(balance(&ledger, 2), dec!(800));
        assert_eq!(balance(&ledger, 3), dec!(900));
        assert_eq!(balance(&ledger, 4), dec!(1100));
        for account in 1..=4 {
            assert!(!ledger.locks().is_held(AccountId(account)));
        }
    }

    #[tokio::test]
    async fn four_operations_stay_queued() {
        let queue = Arc::new(OperationQueue::new(100, DequeueOrder::Fifo));
        let ledger = ledger();
        let consumer = consumer(&queue, ledger.clone());

        for _ in 0..4 {
            enqueue(&queue, deposit(1, dec!(10)));
        }

        assert!(consumer.run_once().await.is_none());
        assert!(consumer.run_once().await.is_none());
        assert_eq!(queue.len(), 4);
        assert_eq!(balance(&ledger, 1), dec!(1000));

        enqueue(&queue, deposit(1, dec!(10)));
        let report = consumer.run_once().await.unwrap();

        assert_eq!(report.settled, 5);
        assert!(queue.is_empty());
        assert_eq!(balance(&ledger, 1), dec!(1050));
    }

    #[tokio::test]
    async fn withdraw_may_go_negative() {
        let queue = Arc::new(OperationQueue::new(100, DequeueOrder::Fifo));
        let ledger = ledger();
        let consumer = consumer(&queue, ledger.clone());

        consumer.settle(&withdraw(7, dec!(1500.50))).await.unwrap();

        assert_eq!(balance(&ledger, 7), dec!(-500.50));
    }

    #[tokio::test]
    async fn overflowing_deposit_fails_and_batch_continues() {
        let queue = Arc::new(OperationQueue::new(100, DequeueOrder::Fifo));
        let ledger = ledger();
        let consumer = consumer(&queue, ledger.clone());

        enqueue(&queue, deposit(1, Decimal::MAX));
        for _ in 0..4 {
            enqueue(&queue, deposit(1, dec!(1)));
        }

        let report = consumer.run_once().await.unwrap();

        assert_eq!(report, BatchReport { settled: 4, failed: 1 });
        assert_eq!(balance(&ledger, 1), dec!(1004));
        assert!(!ledger.locks().is_held(AccountId(1)));
    }

    #[tokio::test]
    async fn overflowing_transfer_writes_nothing() {
        let queue = Arc::new(OperationQueue::new(100, DequeueOrder::Fifo));
        let ledger = ledger();
        let consumer = consumer(&queue, ledger.clone());

        ledger.acquire(AccountId(4), OWNER).await.unwrap();
        ledger.write_balance(OWNER, AccountId(4), Decimal::MAX).unwrap();
        ledger.release(AccountId(4), OWNER).unwrap();

        let result = consumer.settle(&transfer(3, 4, dec!(1))).await;

        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
        assert_eq!(balance(&ledger, 3), dec!(1000));
        assert_eq!(balance(&ledger, 4), Decimal::MAX);
        assert!(!ledger.locks().is_held(AccountId(3)));
        assert!(!ledger.locks().is_held(AccountId(4)));

        // Debiting below Decimal::MIN is refused the same way
        ledger.acquire(AccountId(5), OWNER).await.unwrap();
        ledger.write_balance(OWNER, AccountId(5), Decimal::MIN).unwrap();
        ledger.release(AccountId(5), OWNER).unwrap();

        let result = consumer.settle(&withdraw(5, dec!(1))).await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
        assert_eq!(balance(&ledger, 5), Decimal::MIN);
    }

    #[tokio::test]
    async fn failed_operation_releases_lock_and_batch_continues() {
        let queue = Arc::new(OperationQueue::new(100, DequeueOrder::Fifo));
        let ledger = ledger();
        let stats = Arc::new(SettlementStats::default());
        let consumer = BatchConsumer::new(
            Arc::clone(&queue),
            ledger.clone(),
            OWNER,
            5,
            Duration::from_millis(10),
            Arc::clone(&stats),
        );

        enqueue(&queue, withdraw(99, dec!(10)));
        for _ in 0..4 {
            enqueue(&queue, deposit(1, dec!(25)));
        }

        let report = consumer.run_once().await.unwrap();

        assert_eq!(report, BatchReport { settled: 4, failed: 1 });
        assert_eq!(balance(&ledger, 1), dec!(1100));
        assert!(!ledger.locks().is_held(AccountId(99)));
        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                settled: 4,
                failed: 1,
                batches: 1,
                consumer_running: false,
            }
        );
    }

    #[tokio::test]
    async fn account_owned_by_other_business_fails() {
        let queue = Arc::new(OperationQueue::new(100, DequeueOrder::Fifo));
        let ledger = ledger();
        let consumer = consumer(&queue, ledger.clone());

        ledger.acquire(AccountId(5), OwnerId(2)).await.unwrap();

        let result = consumer.settle(&deposit(5, dec!(1))).await;
        assert!(matches!(result, Err(AppError::OwnedByOther)));

        // Account 4 is locked first, then released when 5 is refused
        let result = consumer.settle(&transfer(4, 5, dec!(1))).await;
        assert!(matches!(result, Err(AppError::OwnedByOther)));
        assert_eq!(ledger.locks().recorded_owner(AccountId(4)), Some(OWNER));
        assert!(!ledger.locks().is_held(AccountId(4)));
        assert_eq!(balance(&ledger, 4), dec!(1000));
    }

    /// Wraps a ledger, records lock calls, and can fail writes to one account.
    struct RecordingLedger {
        inner: Arc<Ledger>,
        calls: Mutex<Vec<String>>,
        fail_writes_on: Option<AccountId>,
    }

    impl RecordingLedger {
        fn new(inner: Arc<Ledger>, fail_writes_on: Option<AccountId>) -> Self {
            Self {
                inner,
                calls: Mutex::new(Vec::new()),
                fail_writes_on,
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl LedgerApi for RecordingLedger {
        async fn acquire(&self, owner: OwnerId, account: AccountId) -> Result<(), AppError> {
            self.calls.lock().push(format!("lock {account}"));
            self.inner.acquire(account, owner).await
        }

        async fn release(&self, owner: OwnerId, account: AccountId) -> Result<(), AppError> {
            self.calls.lock().push(format!("unlock {account}"));
            self.inner.release(account, owner)
        }

        async fn read_balance(
            &self,
            owner: OwnerId,
            account: AccountId,
        ) -> Result<Decimal, AppError> {
            self.inner.read_balance(owner, account)
        }

        async fn write_balance(
            &self,
            owner: OwnerId,
            account: AccountId,
            amount: Decimal,
        ) -> Result<(), AppError> {
            if self.fail_writes_on == Some(account) {
                return Err(AppError::LedgerUnavailable("injected".to_string()));
            }
            self.inner.write_balance(owner, account, amount)
        }
    }

    #[tokio::test]
    async fn transfer_locks_in_account_order() {
        let queue = Arc::new(OperationQueue::new(100, DequeueOrder::Fifo));
        let inner = ledger();
        let recording = Arc::new(RecordingLedger::new(inner.clone(), None));
        let consumer = consumer(&queue, recording.clone());

        consumer.settle(&transfer(4, 3, dec!(100))).await.unwrap();

        assert_eq!(
            recording.calls(),
            vec!["lock 3", "lock 4", "unlock 4", "unlock 3"]
        );
        assert_eq!(balance(&inner, 4), dec!(900));
        assert_eq!(balance(&inner, 3), dec!(1100));
    }

    #[tokio::test]
    async fn failed_credit_restores_debit() {
        let queue = Arc::new(OperationQueue::new(100, DequeueOrder::Fifo));
        let inner = ledger();
        let recording = Arc::new(RecordingLedger::new(inner.clone(), Some(AccountId(4))));
        let consumer = consumer(&queue, recording.clone());

        let result = consumer.settle(&transfer(3, 4, dec!(100))).await;

        assert!(matches!(result, Err(AppError::LedgerUnavailable(_))));
        assert_eq!(balance(&inner, 3), dec!(1000));
        assert_eq!(balance(&inner, 4), dec!(1000));
        assert!(!inner.locks().is_held(AccountId(3)));
        assert!(!inner.locks().is_held(AccountId(4)));
    }

    #[tokio::test]
    async fn spawned_loop_drains_when_threshold_reached() {
        let queue = Arc::new(OperationQueue::new(100, DequeueOrder::Fifo));
        let ledger = ledger();
        let stats = Arc::new(SettlementStats::default());
        let handle = BatchConsumer::new(
            Arc::clone(&queue),
            ledger.clone(),
            OWNER,
            5,
            Duration::from_millis(10),
            Arc::clone(&stats),
        )
        .spawn();

        for _ in 0..5 {
            enqueue(&queue, deposit(8, dec!(1)));
        }

        let mut settled = false;
        for _ in 0..100 {
            if balance(&ledger, 8) == dec!(1005) {
                settled = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(settled);
        assert!(queue.is_empty());
        assert!(stats.is_running());

        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
        assert!(!stats.is_running());
    }
}

//! Ledger facade - Lock Table and Balance Store behind one owner.
//!
//! This service handles:
//! - Acquiring and releasing account locks
//! - Unguarded balance reads
//! - Ownership-checked balance writes
//! - The global operation counter carried in every log event
//!
//! # Write Rules
//!
//! A write is accepted when the account has a lock entry recorded under the
//! caller. The held state of the lock is not checked, only the recorded
//! owner. Writes overwrite the balance unconditionally.

use std::sync::atomic::{AtomicU64, Ordering};

use rust_decimal::Decimal;

use crate::config::LedgerConfig;
use crate::error::AppError;
use crate::models::account::{AccountId, OwnerId};
use crate::services::balance_store::BalanceStore;
use crate::services::lock_table::LockTable;

pub struct Ledger {
    locks: LockTable,
    balances: BalanceStore,
    operations: AtomicU64,
}

impl Ledger {
    pub fn new(locks: LockTable, balances: BalanceStore) -> Self {
        Self {
            locks,
            balances,
            operations: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(
            LockTable::new(config.lock_timeout(), config.ownership_policy),
            BalanceStore::seeded(config.seed_accounts, config.seed_balance),
        )
    }

    /// Number of ledger operations served so far.
    pub fn operation_count(&self) -> u64 {
        self.operations.load(Ordering::Relaxed)
    }

    pub fn account_count(&self) -> usize {
        self.balances.account_count()
    }

    pub fn locks(&self) -> &LockTable {
        &self.locks
    }

    fn next_operation(&self) -> u64 {
        self.operations.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub async fn acquire(&self, account: AccountId, owner: OwnerId) -> Result<(), AppError> {
        let operation_number = self.next_operation();

        let result = self.locks.acquire(account, owner).await;
        match &result {
            Ok(()) => tracing::info!(
                %account,
                owner_id = %owner,
                operation_number,
                "Lock acquired successfully"
            ),
            Err(AppError::OwnedByOther) => tracing::warn!(
                %account,
                owner_id = %owner,
                owner_with_lock = ?self.locks.recorded_owner(account),
                operation_number,
                "Account is locked by a different business"
            ),
            Err(err) => tracing::warn!(
                %account,
                owner_id = %owner,
                operation_number,
                error = %err,
                "Lock not acquired"
            ),
        }
        result
    }

    pub fn release(&self, account: AccountId, owner: OwnerId) -> Result<(), AppError> {
        let operation_number = self.next_operation();

        let result = self.locks.release(account, owner);
        match &result {
            Ok(()) => tracing::info!(%account, owner_id = %owner, operation_number, "Lock released"),
            Err(err) => tracing::warn!(
                %account,
                owner_id = %owner,
                operation_number,
                error = %err,
                "Lock not released"
            ),
        }
        result
    }

    /// Read a balance. No lock is required.
    pub fn read_balance(&self, owner: OwnerId, account: AccountId) -> Result<Decimal, AppError> {
        let operation_number = self.next_operation();
        tracing::debug!(%account, owner_id = %owner, operation_number, "Fetching account balance");

        self.balances.read(account).inspect_err(|_| {
            tracing::warn!(%account, owner_id = %owner, operation_number, "Account not found");
        })
    }

    /// Overwrite a balance on behalf of the lock's recorded owner.
    ///
    /// # Errors
    ///
    /// - `NotLocked`: no lock entry exists for the account
    /// - `OwnedByOther`: the entry is recorded under a different owner
    /// - `AccountNotFound`: the account has no balance record
    pub fn write_balance(
        &self,
        owner: OwnerId,
        account: AccountId,
        amount: Decimal,
    ) -> Result<(), AppError> {
        let operation_number = self.next_operation();

        let recorded = self.locks.recorded_owner(account).ok_or_else(|| {
            tracing::warn!(%account, owner_id = %owner, operation_number, "Account is not locked by any business");
            AppError::NotLocked
        })?;

        if recorded != owner {
            tracing::warn!(
                %account,
                owner_id = %owner,
                owner_with_lock = %recorded,
                operation_number,
                "Account is locked by a different business"
            );
            return Err(AppError::OwnedByOther);
        }

        self.balances.write(account, amount)?;
        tracing::info!(%account, owner_id = %owner, %amount, operation_number, "Account balance updated");

        Ok(())
    }
}

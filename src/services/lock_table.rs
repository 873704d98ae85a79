//! Per-account lock table.
//!
//! Every account that has ever been locked has one entry, created lazily on
//! the first acquire attempt. An entry pairs a single-permit semaphore (the
//! mutual-exclusion handle) with the id of its recorded owner. The permit is
//! held across HTTP requests: it is taken by `acquire` and dropped by
//! `release`, which may arrive on a different connection.
//!
//! # Ownership
//!
//! The owner recorded on an entry is checked before its held state. Under
//! [`OwnershipPolicy::Sticky`] the first caller to touch an account owns it
//! for the life of the process; under [`OwnershipPolicy::Handover`] an unheld
//! entry can be taken over by another caller, who becomes the new recorded
//! owner. In both modes the owner id survives `release`.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::AppError;
use crate::models::account::{AccountId, OwnerId};

/// What happens when a different caller asks for an account whose lock is
/// currently free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnershipPolicy {
    /// The recorded owner is never replaced. Other callers get `OwnedByOther`
    /// whether or not the lock is held.
    #[default]
    Sticky,
    /// A free lock may be acquired by anyone; the acquirer becomes the owner.
    Handover,
}

struct EntryState {
    owner: OwnerId,
    permit: Option<OwnedSemaphorePermit>,
}

/// A single account's lock.
struct AccountLock {
    gate: Arc<Semaphore>,
    state: Mutex<EntryState>,
}

impl AccountLock {
    fn new(owner: OwnerId) -> Self {
        Self {
            gate: Arc::new(Semaphore::new(1)),
            state: Mutex::new(EntryState {
                owner,
                permit: None,
            }),
        }
    }

    /// True while a permit is out, including one an acquirer is about to store.
    fn is_held(&self) -> bool {
        self.gate.available_permits() == 0
    }
}

/// Table of account locks shared by every ledger request handler.
pub struct LockTable {
    entries: DashMap<AccountId, Arc<AccountLock>>,
    acquire_timeout: Duration,
    policy: OwnershipPolicy,
}

impl LockTable {
    pub fn new(acquire_timeout: Duration, policy: OwnershipPolicy) -> Self {
        Self {
            entries: DashMap::new(),
            acquire_timeout,
            policy,
        }
    }

    /// Acquire the lock on `account` for `owner`.
    ///
    /// # Errors
    ///
    /// - `OwnedByOther`: the entry is recorded under another owner (under
    ///   `Handover`, only while it is held)
    /// - `AlreadyLocked`: `owner` already holds it, or the bounded wait for
    ///   the permit expired
    pub async fn acquire(&self, account: AccountId, owner: OwnerId) -> Result<(), AppError> {
        // The shard guard is dropped at the end of this statement.
        let entry = Arc::clone(
            &*self
                .entries
                .entry(account)
                .or_insert_with(|| Arc::new(AccountLock::new(owner))),
        );

        {
            let state = entry.state.lock();
            if state.owner != owner {
                let blocks = match self.policy {
                    OwnershipPolicy::Sticky => true,
                    OwnershipPolicy::Handover => entry.is_held(),
                };
                if blocks {
                    return Err(AppError::OwnedByOther);
                }
            } else if entry.is_held() {
                return Err(AppError::AlreadyLocked);
            }
        }

        let permit = match tokio::time::timeout(
            self.acquire_timeout,
            Arc::clone(&entry.gate).acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            // Semaphore closed or the wait timed out
            Ok(Err(_)) | Err(_) => return Err(AppError::AlreadyLocked),
        };

        let mut state = entry.state.lock();
        state.owner = owner;
        state.permit = Some(permit);

        Ok(())
    }

    /// Release the lock on `account` held by `owner`.
    ///
    /// # Errors
    ///
    /// - `OwnedByOther`: the entry is recorded under another owner
    /// - `NotHeld`: the lock is not currently held (or was never created)
    pub fn release(&self, account: AccountId, owner: OwnerId) -> Result<(), AppError> {
        let entry = self
            .entries
            .get(&account)
            .map(|e| Arc::clone(e.value()))
            .ok_or(AppError::NotHeld)?;

        let mut state = entry.state.lock();
        if state.owner != owner {
            return Err(AppError::OwnedByOther);
        }

        match state.permit.take() {
            Some(permit) => {
                drop(permit);
                Ok(())
            }
            None => Err(AppError::NotHeld),
        }
    }

    /// Owner recorded on the account's entry, held or not.
    pub fn recorded_owner(&self, account: AccountId) -> Option<OwnerId> {
        self.entries.get(&account).map(|e| e.state.lock().owner)
    }

    pub fn is_held(&self, account: AccountId) -> bool {
        self.entries
            .get(&account)
            .map(|e| e.is_held())
            .unwrap_or(false)
    }

    pub fn policy(&self) -> OwnershipPolicy {
        self.policy
    }
}

//! In-memory account balances.
//!
//! The store holds a fixed set of pre-provisioned accounts. Records are
//! never created on demand, so any operation on an unknown account fails
//! with `AccountNotFound`. Lock checks live in the ledger facade; the store
//! itself only reads and overwrites.

use dashmap::DashMap;
use rust_decimal::Decimal;

use crate::error::AppError;
use crate::models::account::AccountId;

pub struct BalanceStore {
    balances: DashMap<AccountId, Decimal>,
}

impl BalanceStore {
    /// Provision accounts `1..=accounts`, each with `balance`.
    pub fn seeded(accounts: u32, balance: Decimal) -> Self {
        let balances = DashMap::with_capacity(accounts as usize);
        for id in 1..=accounts {
            balances.insert(AccountId(id), balance);
        }
        Self { balances }
    }

    pub fn read(&self, account: AccountId) -> Result<Decimal, AppError> {
        self.balances
            .get(&account)
            .map(|balance| *balance)
            .ok_or(AppError::AccountNotFound)
    }

    /// Overwrite the balance. Last writer wins.
    pub fn write(&self, account: AccountId, amount: Decimal) -> Result<(), AppError> {
        let mut balance = self
            .balances
            .get_mut(&account)
            .ok_or(AppError::AccountNotFound)?;
        *balance = amount;
        Ok(())
    }

    pub fn account_count(&self) -> usize {
        self.balances.len()
    }
}

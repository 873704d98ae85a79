//! Bounded operation queue shared by the HTTP handlers and the batch consumer.
//!
//! Handlers push, the batch consumer is the only reader. All access goes
//! through one mutex, and the consumer drains through
//! [`OperationQueue::try_drain_batch`], which checks the threshold and
//! removes the batch in a single critical section.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::operation::QueuedOperation;

/// Which end of the queue operations are taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DequeueOrder {
    /// Oldest first.
    #[default]
    Fifo,
    /// Newest first.
    Lifo,
}

pub struct OperationQueue {
    items: Mutex<VecDeque<QueuedOperation>>,
    capacity: usize,
    order: DequeueOrder,
}

impl OperationQueue {
    pub fn new(capacity: usize, order: DequeueOrder) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            capacity,
            order,
        }
    }

    /// Append an operation at the tail.
    ///
    /// Returns the queue depth after the push.
    ///
    /// # Errors
    ///
    /// `QueueFull` when the queue already holds `capacity` operations.
    pub fn push(&self, operation: QueuedOperation) -> Result<usize, AppError> {
        let mut items = self.items.lock();
        if items.len() >= self.capacity {
            return Err(AppError::QueueFull);
        }
        items.push_back(operation);
        Ok(items.len())
    }

    /// Remove one operation, or `None` if the queue is empty.
    pub fn pop(&self) -> Option<QueuedOperation> {
        let mut items = self.items.lock();
        self.take(&mut items)
    }

    /// Remove exactly `batch_size` operations if at least that many are queued.
    ///
    /// Operations come back in the order they must be settled. A queue below
    /// the threshold is left untouched.
    pub fn try_drain_batch(&self, batch_size: usize) -> Option<Vec<QueuedOperation>> {
        let mut items = self.items.lock();
        if batch_size == 0 || items.len() < batch_size {
            return None;
        }

        let mut batch = Vec::with_capacity(batch_size);
        while batch.len() < batch_size {
            match self.take(&mut items) {
                Some(operation) => batch.push(operation),
                None => break,
            }
        }
        Some(batch)
    }

    fn take(&self, items: &mut VecDeque<QueuedOperation>) -> Option<QueuedOperation> {
        match self.order {
            DequeueOrder::Fifo => items.pop_front(),
            DequeueOrder::Lifo => items.pop_back(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn order(&self) -> DequeueOrder {
        self.order
    }
}

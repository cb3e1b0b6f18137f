use serde::{Deserialize, Serialize};

use crate::db_types::Order;

/// The outcome of one pass of the unpaid-order sweep.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepResult {
    /// Cash orders that blew their payment deadline and were cancelled, with their stock restored.
    pub cancelled: Vec<Order>,
}

impl SweepResult {
    pub fn count(&self) -> usize {
        self.cancelled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cancelled.is_empty()
    }
}

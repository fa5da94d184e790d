use crate::db_types::Order;

#[derive(Debug, Clone)]
pub struct SweepFailure {
    pub order_id: i64,
    pub reason: String,
}

/// The outcome of one reconciliation sweep. Candidates are handled one at a time, so a failure on one order never
/// prevents the others from being processed.
#[derive(Debug, Clone, Default)]
pub struct SweepResult {
    pub processed: Vec<Order>,
    /// Candidates that another writer modified between the scan and the update
    pub skipped: Vec<i64>,
    pub failed: Vec<SweepFailure>,
}

impl SweepResult {
    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

use log::warn;

use crate::error::ScheduleError;
use crate::models::DateUpdate;

/// Updates per storage batch.
pub const BATCH_SIZE: usize = 50;

/// Storage seam for batched date writes. `Database` is the production
/// implementation; tests substitute failure-injecting stubs.
pub trait BatchSink {
    /// Applies one batch atomically and returns how many rows it touched.
    fn apply_batch(&self, batch: &[DateUpdate]) -> Result<usize, ScheduleError>;
}

#[derive(Debug)]
pub struct BatchError {
    pub batch_index: usize,
    pub cause: ScheduleError,
}

#[derive(Debug, Default)]
pub struct CommitReport {
    pub committed: usize,
    pub errors: Vec<BatchError>,
}

/// Commits updates in fixed-size batches, sequentially.
///
/// A failing batch is recorded and skipped; batches already committed stay
/// committed and later batches still run. The caller decides what partial
/// success means for it.
pub fn commit(sink: &dyn BatchSink, updates: &[DateUpdate]) -> CommitReport {
    let mut report = CommitReport::default();
    for (batch_index, batch) in updates.chunks(BATCH_SIZE).enumerate() {
        match sink.apply_batch(batch) {
            Ok(n) => report.committed += n,
            Err(cause) => {
                warn!("batch {} failed ({} updates): {}", batch_index, batch.len(), cause);
                report.errors.push(BatchError { batch_index, cause });
            }
        }
    }
    report
}

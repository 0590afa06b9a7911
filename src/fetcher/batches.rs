use std::ops::Range;

use crate::artifacts::batch_file_name;
use crate::error::{CollectorError, Result};

/// One chunk of the identifier sequence and the artifact it is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    pub start: usize,
    pub len: usize,
    pub batch_size: usize,
}

impl BatchPlan {
    /// Identifiers actually requested for this batch.
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.len
    }

    /// Last offset claimed by the artifact name.
    pub fn nominal_end(&self) -> usize {
        (self.start + self.batch_size).saturating_sub(1)
    }

    pub fn file_name(&self) -> String {
        batch_file_name(self.start, self.batch_size)
    }
}

/// Splits `[start_from, total)` into consecutive chunks of `batch_size`.
///
/// The last chunk may be shorter. An offset at or past `total` yields no
/// batches.
pub fn plan_batches(total: usize, start_from: usize, batch_size: usize) -> Result<Vec<BatchPlan>> {
    if batch_size == 0 {
        return Err(CollectorError::Config(
            "batch size must be greater than zero".into(),
        ));
    }

    Ok((start_from..total)
        .step_by(batch_size)
        .map(|start| BatchPlan {
            start,
            len: batch_size.min(total - start),
            batch_size,
        })
        .collect())
}

//! Percent-complete reporting.

/// Tracks commits against the scanned candidate total.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    total: i64,
    committed: u64,
}

impl ProgressReporter {
    #[must_use]
    pub fn new(total: i64) -> Self {
        Self {
            total,
            committed: 0,
        }
    }

    /// Count a commit and log progress. Returns the new percentage, or `None`
    /// when the total is the empty-scan sentinel.
    pub fn record_commit(&mut self) -> Option<f64> {
        self.committed += 1;
        let percent = self.percent();
        match percent {
            Some(p) => tracing::info!(
                "{:.1}% complete, {}/{}",
                p,
                self.committed,
                self.total
            ),
            None => tracing::debug!("Progress suppressed (total {})", self.total),
        }
        percent
    }

    /// Commits so far as a percentage of the total.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> Option<f64> {
        if self.total <= 0 {
            return None;
        }
        Some(self.committed as f64 / self.total as f64 * 100.0)
    }

    #[must_use]
    pub fn committed(&self) -> u64 {
        self.committed
    }
}

//! Campaign-level counters.

use serde::{Deserialize, Serialize};

/// Counters folded from send results and engagement events.
///
/// Invariant: `pending == total_recipients - sent - failed` after every
/// batch; [`CampaignStats::recompute_pending`] restores it whenever sent
/// or failed move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignStats {
    pub total_recipients: u64,
    pub sent: u64,
    pub failed: u64,
    pub pending: u64,

    pub opens: u64,
    pub clicks: u64,
    pub replies: u64,
    pub bounces: u64,
    pub unsubscribes: u64,
    pub complaints: u64,

    /// Recipients the validator tagged as free-mail / higher reputation
    /// risk. Informational; they are still sent to.
    pub high_risk_recipients: u64,
}

impl CampaignStats {
    /// Initialise for a freshly validated recipient set.
    #[must_use]
    pub const fn for_recipients(total: u64, high_risk: u64) -> Self {
        Self {
            total_recipients: total,
            sent: 0,
            failed: 0,
            pending: total,
            opens: 0,
            clicks: 0,
            replies: 0,
            bounces: 0,
            unsubscribes: 0,
            complaints: 0,
            high_risk_recipients: high_risk,
        }
    }

    /// Fold a completed batch into the counters.
    ///
    /// `newly_sent` recipients moved out of pending for good;
    /// `newly_failed` counts recipients whose *first* recorded failure
    /// happened this batch (a retried recipient that fails again is
    /// already counted).
    pub const fn apply_batch(&mut self, newly_sent: u64, newly_failed: u64, retried: u64) {
        self.sent += newly_sent;
        self.failed += newly_failed;
        // A retried recipient that succeeds moves from failed to sent.
        self.failed = self.failed.saturating_sub(retried);
        self.recompute_pending();
    }

    /// Restore the pending invariant from the other counters.
    pub const fn recompute_pending(&mut self) {
        self.pending = self
            .total_recipients
            .saturating_sub(self.sent)
            .saturating_sub(self.failed);
    }

    /// Progress through the recipient set, in percent.
    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        if self.total_recipients == 0 {
            return 100.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let done = (self.sent + self.failed) as f64 / self.total_recipients as f64;
        (done * 100.0).min(100.0)
    }

    /// Whether the invariant holds (used by debug assertions and tests).
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.pending + self.sent + self.failed == self.total_recipients
    }
}

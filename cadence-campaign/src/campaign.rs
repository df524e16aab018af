//! The campaign aggregate root.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cadence_common::{EmailAddress, Recipient, Template};

use crate::{
    error::StateError,
    result::{SendResult, SendStatus},
    settings::CampaignSettings,
    stats::CampaignStats,
    status::{CampaignEvent, CampaignStatus},
    types::CampaignId,
};

/// A bulk messaging campaign.
///
/// Owns its validated recipient set (fixed at creation), its template,
/// its settings, its append-only send-result history, and its lifecycle
/// timestamps. All mutation flows through the owning scheduler task or
/// the state-guarded admin operations; the store serializes both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub workspace_id: String,
    pub name: String,
    pub from_email: EmailAddress,
    pub from_name: String,
    pub template: Template,
    pub recipients: Vec<Recipient>,
    pub settings: CampaignSettings,
    pub status: CampaignStatus,
    pub stats: CampaignStats,
    /// One entry per delivery attempt, in attempt order.
    pub results: Vec<SendResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Tallies from folding one batch of results into a campaign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchTally {
    pub sent: u64,
    pub failed: u64,
    pub retried: u64,
}

impl Campaign {
    /// Create a campaign in `draft` with an already-validated recipient
    /// set. `high_risk` is the validator's free-mail tag count.
    #[must_use]
    pub fn new(
        workspace_id: impl Into<String>,
        name: impl Into<String>,
        template: Template,
        recipients: Vec<Recipient>,
        from_email: EmailAddress,
        from_name: impl Into<String>,
        settings: CampaignSettings,
        high_risk: u64,
    ) -> Self {
        let now = Utc::now();
        let total = recipients.len() as u64;

        Self {
            id: CampaignId::generate(),
            workspace_id: workspace_id.into(),
            name: name.into(),
            from_email,
            from_name: from_name.into(),
            template,
            recipients,
            settings,
            status: CampaignStatus::Draft,
            stats: CampaignStats::for_recipients(total, high_risk),
            results: Vec::new(),
            created_at: now,
            updated_at: now,
            scheduled_at: None,
            started_at: None,
            completed_at: None,
        }
    }

    /// The most recent result recorded for a recipient, if any.
    #[must_use]
    pub fn latest_result(&self, recipient_id: &str) -> Option<&SendResult> {
        self.results
            .iter()
            .rev()
            .find(|r| r.recipient_id == recipient_id)
    }

    /// Whether a recipient is still eligible for a delivery attempt:
    /// no result yet, or the most recent result is a retryable failure.
    #[must_use]
    pub fn is_eligible(&self, recipient_id: &str) -> bool {
        self.latest_result(recipient_id)
            .is_none_or(SendResult::is_failed)
    }

    /// Snapshot the recipients still eligible for this run, in campaign
    /// order.
    #[must_use]
    pub fn eligible_recipients(&self) -> Vec<Recipient> {
        self.recipients
            .iter()
            .filter(|r| self.is_eligible(&r.id))
            .cloned()
            .collect()
    }

    /// Count of recipients still eligible.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.recipients
            .iter()
            .filter(|r| self.is_eligible(&r.id))
            .count()
    }

    /// Append a completed batch's results and fold the counters in one
    /// mutation, so observers see whole-batch increments only.
    ///
    /// Recipients within a batch are unique, so the prior state of each
    /// recipient is read from the history before the append.
    pub fn record_batch(&mut self, batch: Vec<SendResult>) -> BatchTally {
        let mut tally = BatchTally::default();

        for result in batch {
            let prior_failed = self
                .latest_result(&result.recipient_id)
                .is_some_and(|prior| {
                    matches!(prior.status, SendStatus::Failed | SendStatus::Skipped)
                });

            match result.status {
                SendStatus::Sent => {
                    tally.sent += 1;
                    if prior_failed {
                        tally.retried += 1;
                    }
                }
                // Skipped (late suppression) is terminal and non-retried;
                // it counts with failures for the pending arithmetic.
                SendStatus::Failed | SendStatus::Skipped => {
                    if !prior_failed {
                        tally.failed += 1;
                    }
                }
                // Bounces arrive through event recording, not the batch
                // path.
                SendStatus::Bounced => {}
            }

            self.results.push(result);
        }

        self.stats
            .apply_batch(tally.sent, tally.failed, tally.retried);
        self.touch();

        debug_assert!(self.stats.is_consistent());
        tally
    }

    /// Apply a lifecycle event, stamping the associated timestamps.
    ///
    /// # Errors
    ///
    /// Returns the state machine's rejection untouched; the campaign is
    /// not modified on error.
    pub fn apply_event(&mut self, event: CampaignEvent) -> Result<(), StateError> {
        let next = self.status.transition(event)?;

        match event {
            CampaignEvent::Start => {
                if self.started_at.is_none() {
                    self.started_at = Some(Utc::now());
                }
            }
            CampaignEvent::Exhausted { .. } => {
                self.completed_at = Some(Utc::now());
            }
            CampaignEvent::Schedule | CampaignEvent::Pause => {}
        }

        self.status = next;
        self.touch();
        Ok(())
    }

    /// Bump `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

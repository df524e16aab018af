//! Campaign lifecycle state machine.
//!
//! Transitions are expressed as a consuming `transition` over
//! `(status, event)` pairs; anything not matched is an explicit,
//! descriptive rejection. Status is monotonic along the allowed paths:
//!
//! ```text
//! draft ──schedule──▶ scheduled ──timer──▶ sending
//!   │                                        │  ▲
//!   └────────────────start──────────────────▶│  │
//!                                          pause start
//!                                            │  │
//!                                            ▼  │
//!                                           paused
//!
//! sending ──exhausted──▶ completed | failed
//! ```

use core::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::StateError;

/// Lifecycle status of a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    /// Created and validated, not yet started.
    Draft,
    /// A future activation time is recorded; a deferred timer will start
    /// the campaign unless something else transitions it first.
    Scheduled,
    /// The batch scheduler is actively dispatching.
    Sending,
    /// Dispatch suspended at a batch boundary; resumable via start.
    Paused,
    /// Every eligible recipient was attempted and at least one delivery
    /// succeeded.
    Completed,
    /// Every eligible recipient was attempted and none succeeded.
    Failed,
}

/// Inputs that drive status transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignEvent {
    /// Manual start, or a scheduled timer firing.
    Start,
    /// Record a future activation time.
    Schedule,
    /// Cooperative pause request.
    Pause,
    /// The scheduler exhausted all eligible recipients.
    Exhausted { any_sent: bool, any_failed: bool },
}

impl Default for CampaignStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl Display for CampaignStatus {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        fmt.write_str(match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Sending => "sending",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
        })
    }
}

impl CampaignStatus {
    /// Apply an event, returning the next status or a descriptive
    /// rejection. Rejections never mutate anything; callers return the
    /// error message to the user verbatim.
    ///
    /// # Errors
    ///
    /// Returns a [`StateError`] when the event is not legal in the
    /// current status.
    pub fn transition(self, event: CampaignEvent) -> Result<Self, StateError> {
        match (self, event) {
            (Self::Draft | Self::Paused, CampaignEvent::Start) => Ok(Self::Sending),

            // A scheduled timer firing is a Start against Scheduled; a
            // manual start on a scheduled campaign also wins the race.
            (Self::Scheduled, CampaignEvent::Start) => Ok(Self::Sending),

            (Self::Draft, CampaignEvent::Schedule) => Ok(Self::Scheduled),

            (Self::Sending, CampaignEvent::Pause) => Ok(Self::Paused),

            (Self::Sending, CampaignEvent::Exhausted { any_sent, any_failed }) => {
                if !any_sent && any_failed {
                    Ok(Self::Failed)
                } else {
                    Ok(Self::Completed)
                }
            }

            (status, CampaignEvent::Start) => Err(StateError::NotStartable { status }),

            (status, CampaignEvent::Schedule) => Err(StateError::NotSchedulable { status }),

            (status, CampaignEvent::Pause) => Err(StateError::NotSending { status }),

            // Exhaustion while not sending means a pause won the race;
            // the in-flight results are kept but no terminal transition
            // happens.
            (status, CampaignEvent::Exhausted { .. }) => Err(StateError::NotSending { status }),
        }
    }

    /// Whether the scheduler may begin dispatching from this status.
    #[must_use]
    pub const fn is_startable(&self) -> bool {
        matches!(self, Self::Draft | Self::Paused | Self::Scheduled)
    }

    /// Whether this status is terminal.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn draft_starts_and_schedules() {
        assert_eq!(
            CampaignStatus::Draft.transition(CampaignEvent::Start).unwrap(),
            CampaignStatus::Sending
        );
        assert_eq!(
            CampaignStatus::Draft
                .transition(CampaignEvent::Schedule)
                .unwrap(),
            CampaignStatus::Scheduled
        );
    }

    #[test]
    fn pause_resume_cycle() {
        let status = CampaignStatus::Sending
            .transition(CampaignEvent::Pause)
            .unwrap();
        assert_eq!(status, CampaignStatus::Paused);

        let status = status.transition(CampaignEvent::Start).unwrap();
        assert_eq!(status, CampaignStatus::Sending);
    }

    #[test]
    fn pause_requires_sending() {
        let err = CampaignStatus::Draft
            .transition(CampaignEvent::Pause)
            .unwrap_err();
        assert_eq!(err.to_string(), "Campaign is not currently sending");
    }

    #[test]
    fn completed_rejects_start() {
        let err = CampaignStatus::Completed
            .transition(CampaignEvent::Start)
            .unwrap_err();
        assert!(matches!(err, StateError::NotStartable { .. }));
    }

    #[test]
    fn scheduling_is_draft_only() {
        for status in [
            CampaignStatus::Scheduled,
            CampaignStatus::Sending,
            CampaignStatus::Paused,
            CampaignStatus::Completed,
        ] {
            assert!(status.transition(CampaignEvent::Schedule).is_err());
        }
    }

    #[test]
    fn exhaustion_policy() {
        let done = CampaignStatus::Sending
            .transition(CampaignEvent::Exhausted {
                any_sent: true,
                any_failed: true,
            })
            .unwrap();
        assert_eq!(done, CampaignStatus::Completed);

        let failed = CampaignStatus::Sending
            .transition(CampaignEvent::Exhausted {
                any_sent: false,
                any_failed: true,
            })
            .unwrap();
        assert_eq!(failed, CampaignStatus::Failed);

        // An empty run (nothing eligible, nothing failed) completes.
        let empty = CampaignStatus::Sending
            .transition(CampaignEvent::Exhausted {
                any_sent: false,
                any_failed: false,
            })
            .unwrap();
        assert_eq!(empty, CampaignStatus::Completed);
    }

    #[test]
    fn exhaustion_loses_to_pause() {
        assert!(
            CampaignStatus::Paused
                .transition(CampaignEvent::Exhausted {
                    any_sent: true,
                    any_failed: false,
                })
                .is_err()
        );
    }
}

//! Error types for campaign state, settings, and storage.

use thiserror::Error;

use crate::{status::CampaignStatus, types::CampaignId};

/// An operation was attempted in a status that does not permit it.
///
/// These are expected, user-facing conditions: the message is written to
/// be returned verbatim to the caller (e.g. "Campaign is not currently
/// sending"), and the rejected operation never mutates the campaign.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("Campaign can only be started from draft or paused (currently {status})")]
    NotStartable { status: CampaignStatus },

    #[error("Campaign is not currently sending")]
    NotSending { status: CampaignStatus },

    #[error("Only draft campaigns can be scheduled (currently {status})")]
    NotSchedulable { status: CampaignStatus },
}

impl StateError {
    /// The status the campaign was in when the operation was rejected.
    #[must_use]
    pub const fn status(&self) -> CampaignStatus {
        match self {
            Self::NotStartable { status }
            | Self::NotSending { status }
            | Self::NotSchedulable { status } => *status,
        }
    }
}

/// Campaign settings rejected at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("Batch size must be at least 1")]
    ZeroBatchSize,

    #[error("Hourly limit must be at least 1")]
    ZeroHourlyLimit,

    #[error("Daily limit must be at least the hourly limit")]
    DailyBelowHourly,

    #[error("Warm-up day must be at least 1 when warm-up is enabled")]
    ZeroWarmupDay,

    #[error("Send timeout must be at least 1 second")]
    ZeroSendTimeout,
}

/// Errors from the campaign store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No campaign with the given id.
    #[error("Campaign not found: {0}")]
    NotFound(CampaignId),

    /// A state guard inside a `mutate` closure rejected the operation.
    #[error(transparent)]
    State(#[from] StateError),

    /// Internal store failure (lock poisoning, backend I/O).
    #[error("Internal store error: {0}")]
    Internal(String),
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::Internal(format!("Lock poisoned: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_error_messages_are_user_facing() {
        let err = StateError::NotSending {
            status: CampaignStatus::Draft,
        };
        assert_eq!(err.to_string(), "Campaign is not currently sending");

        let err = StateError::NotStartable {
            status: CampaignStatus::Completed,
        };
        assert!(err.to_string().contains("completed"));
    }

    #[test]
    fn not_found_names_the_campaign() {
        let id = crate::types::CampaignId::generate();
        let err = StoreError::NotFound(id.clone());
        assert!(err.to_string().contains(&id.to_string()));
    }
}

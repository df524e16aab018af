//! Error type for scheduler and engine-facing operations.

use thiserror::Error;

use cadence_campaign::{SettingsError, StateError, StoreError};

/// Failures surfaced by the delivery pipeline's control operations
/// (start, pause, schedule).
///
/// Per-recipient transport failures never appear here — they are
/// absorbed into send results and stats. What does appear are the
/// expected, user-facing rejections (state and configuration errors) and
/// genuine store faults.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The operation is illegal in the campaign's current status.
    #[error(transparent)]
    State(#[from] StateError),

    /// Settings rejected before the campaign could be created.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// The campaign store failed or the campaign does not exist.
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for DispatchError {
    fn from(error: StoreError) -> Self {
        // Guard rejections raised inside store mutations are state
        // errors to the caller, not storage faults.
        match error {
            StoreError::State(state) => Self::State(state),
            other => Self::Store(other),
        }
    }
}

impl DispatchError {
    /// Whether this is an expected user-facing rejection rather than an
    /// infrastructure fault.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::State(_) | Self::Settings(_))
    }
}

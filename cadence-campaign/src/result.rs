//! Per-recipient delivery outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome category of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendStatus {
    /// The sender accepted the message.
    Sent,
    /// The attempt errored or timed out; eligible for retry on the next
    /// scheduler pass.
    Failed,
    /// The provider later reported a hard bounce.
    Bounced,
    /// The recipient was suppressed between validation and dispatch.
    Skipped,
}

/// The recorded outcome of one delivery attempt for one recipient.
///
/// Append-only: a recipient may accumulate several results across retried
/// runs, but once one of them is `Sent` the recipient leaves batch
/// membership for good.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResult {
    pub recipient_id: String,
    pub status: SendStatus,
    /// Provider-assigned message id, when the sender returned one.
    #[serde(default)]
    pub provider_message_id: Option<String>,
    /// Error text for failed attempts.
    #[serde(default)]
    pub error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl SendResult {
    /// A successful attempt.
    #[must_use]
    pub fn sent(recipient_id: impl Into<String>, provider_message_id: impl Into<String>) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            status: SendStatus::Sent,
            provider_message_id: Some(provider_message_id.into()),
            error: None,
            completed_at: Utc::now(),
        }
    }

    /// A failed attempt with the transport error preserved.
    #[must_use]
    pub fn failed(recipient_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            status: SendStatus::Failed,
            provider_message_id: None,
            error: Some(error.into()),
            completed_at: Utc::now(),
        }
    }

    /// A recipient skipped because of late suppression.
    #[must_use]
    pub fn skipped(recipient_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            status: SendStatus::Skipped,
            provider_message_id: None,
            error: Some(reason.into()),
            completed_at: Utc::now(),
        }
    }

    #[must_use]
    pub const fn is_sent(&self) -> bool {
        matches!(self.status, SendStatus::Sent)
    }

    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self.status, SendStatus::Failed)
    }
}

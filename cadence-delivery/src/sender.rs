//! The pluggable delivery seam.
//!
//! The engine does not prescribe a transport: SMTP, an HTTP email API,
//! or a test double all sit behind [`Sender`]. Errors are categorized as
//! permanent or temporary in the way retry logic needs, but the batch
//! scheduler treats both the same within a run — the attempt is recorded
//! as failed and the recipient becomes eligible again on the next run.

use async_trait::async_trait;
use thiserror::Error;

use cadence_common::EmailAddress;

/// A fully rendered message ready for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub to: EmailAddress,
    pub from_email: EmailAddress,
    pub from_name: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: Option<String>,
}

/// Acknowledgement from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    /// Provider-assigned message id, used to correlate later bounce and
    /// engagement callbacks.
    pub provider_message_id: String,
}

/// Transport failure for a single recipient.
#[derive(Debug, Clone, Error)]
pub enum SendError {
    /// The provider rejected the message for good (bad mailbox, policy
    /// rejection). Retrying the same message will not help.
    #[error("Permanent failure: {0}")]
    Permanent(String),

    /// Transient failure (connection refused, provider busy, throttled).
    /// A later attempt may succeed.
    #[error("Temporary failure: {0}")]
    Temporary(String),
}

impl SendError {
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }

    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }
}

/// Transport collaborator: delivers one message to one recipient.
#[async_trait]
pub trait Sender: Send + Sync + std::fmt::Debug {
    /// Attempt delivery of a single message.
    ///
    /// # Errors
    ///
    /// Returns a categorized [`SendError`] on failure. Implementations
    /// should not retry internally; retry policy belongs to the
    /// scheduler.
    async fn send(&self, message: &OutboundMessage) -> Result<SendReceipt, SendError>;
}

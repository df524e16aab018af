//! Delivery pipeline for the Cadence engine.
//!
//! This crate owns the path from a validated recipient set to recorded
//! send results:
//!
//! - [`validator`] filters a raw recipient list against syntax rules,
//!   in-batch duplicates, the suppression registries, and disposable
//!   domains,
//! - [`personalize`] renders templates per recipient (pure, so retries
//!   are idempotent),
//! - [`governor`] computes the currently allowed rate (warm-up ramp) and
//!   enforces it with a per-campaign token bucket,
//! - [`scheduler`] drives batches through a pluggable [`Sender`],
//!   persisting progress after every batch and honoring pause at batch
//!   boundaries.

pub mod error;
pub mod governor;
pub mod personalize;
pub mod scheduler;
pub mod sender;
pub mod validator;

pub use error::DispatchError;
pub use governor::{RateLimiter, SendQuota, current_quota};
pub use personalize::{RenderedMessage, render};
pub use scheduler::{CampaignScheduler, StartReceipt};
pub use sender::{OutboundMessage, SendError, SendReceipt, Sender};
pub use validator::{RejectedRecipient, ValidationReport, validate};

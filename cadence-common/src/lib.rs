//! Shared leaf types for the Cadence bulk messaging engine.
//!
//! Everything in this crate is transport-agnostic: normalized email
//! addresses, the recipient and template data model, and the tracing
//! bootstrap used by the binaries and test harnesses.

pub mod email;
pub mod logging;
pub mod recipient;
pub mod template;

pub use email::{EmailAddress, EmailParseError};
pub use recipient::{Recipient, RecipientInput};
pub use template::Template;
pub use tracing;

//! Sender-reputation tracking for the Cadence engine.
//!
//! Three concerns live here, all workspace- or process-wide rather than
//! campaign-scoped:
//!
//! - the permanent suppression registries (bounced / unsubscribed /
//!   complained addresses),
//! - recording of engagement and reputation events into campaign
//!   counters,
//! - the derived deliverability health report with remediation advice.

pub mod events;
pub mod report;
pub mod suppression;

pub use events::EventRecorder;
pub use report::{HealthReport, health_report};
pub use suppression::{SuppressionEntry, SuppressionList, SuppressionReason};

//! Cadence: a bulk outbound messaging engine.
//!
//! Takes a validated recipient list and a message template, delivers at
//! a governed rate (with sender warm-up support), tracks per-recipient
//! outcomes idempotently, supports mid-flight pause/resume without
//! double-sending, and derives workspace-level deliverability health
//! from the outcomes.
//!
//! The crate wires the focused subsystem crates together behind
//! [`CampaignEngine`], the surface the rest of a product consumes:
//!
//! ```no_run
//! # use std::sync::Arc;
//! # async fn example(sender: Arc<dyn cadence::Sender>) -> Result<(), cadence::EngineError> {
//! use cadence::{CampaignEngine, NewCampaign, Template, RecipientInput};
//!
//! let engine = CampaignEngine::new(sender);
//! let created = engine
//!     .create_campaign(NewCampaign {
//!         workspace_id: "ws-1".into(),
//!         name: "Launch".into(),
//!         template: Template::new("Hi {{firstName}}", "<p>We launched!</p>"),
//!         recipients: vec![RecipientInput::new("r-1", "dana@example.com")],
//!         from_email: "news@sender.example.com".into(),
//!         from_name: "Launch Team".into(),
//!         settings: None,
//!     })
//!     .await?;
//!
//! engine.start_campaign(&created.campaign.id).await?;
//! # Ok(())
//! # }
//! ```

pub mod engine;

pub use cadence_campaign::{
    Campaign, CampaignId, CampaignSettings, CampaignStats, CampaignStatus, CampaignStore,
    MemoryCampaignStore, SendResult, SendStatus,
};
pub use cadence_common::{
    EmailAddress, Recipient, RecipientInput, Template, logging::Logger,
};
pub use cadence_delivery::{
    OutboundMessage, SendError, SendReceipt, Sender, StartReceipt,
};
pub use cadence_health::{HealthReport, SuppressionList, SuppressionReason};
pub use engine::{
    CampaignEngine, CampaignProgress, CreatedCampaign, EngineError, NewCampaign,
};

//! The engine facade: the API surface the surrounding product consumes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use cadence_campaign::{
    Campaign, CampaignId, CampaignSettings, CampaignStatus, CampaignStore, MemoryCampaignStore,
    SendResult, SettingsError, StoreError,
};
use cadence_common::{EmailAddress, EmailParseError, RecipientInput, Template};
use cadence_delivery::{
    CampaignScheduler, DispatchError, Sender, StartReceipt,
    validator::{RejectedRecipient, validate},
};
use cadence_health::{EventRecorder, HealthReport, SuppressionList, health_report};

/// Errors surfaced by the engine API.
///
/// State and configuration rejections are expected, user-facing
/// conditions; their `Display` text is the message to show the caller.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Illegal operation for the campaign's current status, or a
    /// scheduler fault.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Settings rejected at creation time; the campaign never reached
    /// `draft`.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// The sender address could not be parsed.
    #[error("Invalid sender address: {0}")]
    InvalidFromAddress(#[from] EmailParseError),

    /// Store failure outside the dispatch path.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Request payload for campaign creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCampaign {
    pub workspace_id: String,
    pub name: String,
    pub template: Template,
    pub recipients: Vec<RecipientInput>,
    pub from_email: String,
    pub from_name: String,
    /// Partial or absent settings fill from defaults.
    #[serde(default)]
    pub settings: Option<CampaignSettings>,
}

/// Creation outcome: the stored campaign plus the per-recipient
/// validation verdicts that did not make it into the sendable set.
#[derive(Debug, Clone)]
pub struct CreatedCampaign {
    pub campaign: Campaign,
    pub rejected: Vec<RejectedRecipient>,
    pub duplicates: usize,
}

/// Best-effort progress snapshot; always available for a known campaign,
/// mid-failure included.
#[derive(Debug, Clone)]
pub struct CampaignProgress {
    pub campaign: Campaign,
    pub results: Vec<SendResult>,
    pub progress_percent: f64,
    /// Estimated completion while sending; `None` otherwise.
    pub eta: Option<DateTime<Utc>>,
}

/// The bulk messaging engine.
///
/// Cheap to clone; all state lives behind shared handles. One engine
/// serves every workspace in the process — the suppression registries it
/// owns are deliberately process-wide.
#[derive(Debug, Clone)]
pub struct CampaignEngine {
    store: Arc<dyn CampaignStore>,
    suppression: Arc<SuppressionList>,
    scheduler: Arc<CampaignScheduler>,
    events: EventRecorder,
}

impl CampaignEngine {
    /// Build an engine over the in-memory store.
    #[must_use]
    pub fn new(sender: Arc<dyn Sender>) -> Self {
        Self::with_store(Arc::new(MemoryCampaignStore::new()), sender)
    }

    /// Build an engine over a caller-supplied store backend.
    #[must_use]
    pub fn with_store(store: Arc<dyn CampaignStore>, sender: Arc<dyn Sender>) -> Self {
        let suppression = Arc::new(SuppressionList::new());
        let scheduler = Arc::new(CampaignScheduler::new(
            Arc::clone(&store),
            sender,
            Arc::clone(&suppression),
        ));
        let events = EventRecorder::new(Arc::clone(&store), Arc::clone(&suppression));

        Self {
            store,
            suppression,
            scheduler,
            events,
        }
    }

    /// The process-wide suppression registries.
    #[must_use]
    pub fn suppression(&self) -> &Arc<SuppressionList> {
        &self.suppression
    }

    /// Create a campaign in `draft`.
    ///
    /// Settings and the sender address are checked first (configuration
    /// errors reject before anything is stored), then the recipient list
    /// is validated and only the valid subset is kept.
    ///
    /// # Errors
    ///
    /// [`EngineError::Settings`] or [`EngineError::InvalidFromAddress`]
    /// for configuration problems, [`EngineError::Store`] if persistence
    /// fails.
    pub async fn create_campaign(&self, new: NewCampaign) -> Result<CreatedCampaign, EngineError> {
        let settings = new.settings.unwrap_or_default();
        settings.validate()?;

        let from_email = EmailAddress::parse(&new.from_email)?;
        let report = validate(&new.recipients, &self.suppression);

        // The derived placeholder list is authoritative: anything the
        // template references that no accepted recipient can resolve is
        // flagged here, and renders as the safe default at send time.
        let merge_fields = new.template.merge_fields();
        for field in &merge_fields {
            let well_known = matches!(
                field.as_str(),
                "firstName" | "lastName" | "company" | "email"
            );
            if !well_known
                && !report
                    .valid
                    .iter()
                    .any(|r| r.custom_fields.contains_key(field))
            {
                tracing::warn!(
                    field = field.as_str(),
                    "Template placeholder has no resolvable value for any recipient; \
                     it will render empty"
                );
            }
        }

        let campaign = Campaign::new(
            new.workspace_id,
            new.name,
            new.template,
            report.valid,
            from_email,
            new.from_name,
            settings,
            report.high_risk as u64,
        );

        info!(
            campaign = %campaign.id,
            workspace = campaign.workspace_id.as_str(),
            accepted = campaign.recipients.len(),
            rejected = report.invalid.len(),
            duplicates = report.duplicates,
            "Campaign created"
        );

        self.store.insert(campaign.clone()).await?;

        Ok(CreatedCampaign {
            campaign,
            rejected: report.invalid,
            duplicates: report.duplicates,
        })
    }

    /// Start (or resume) dispatching.
    ///
    /// # Errors
    ///
    /// State rejections carry the user-facing message (for example
    /// "Campaign can only be started from draft or paused").
    pub async fn start_campaign(&self, id: &CampaignId) -> Result<StartReceipt, EngineError> {
        Ok(self.scheduler.start(id).await?)
    }

    /// Request a pause; the in-flight batch finishes first.
    ///
    /// # Errors
    ///
    /// Rejected unless the campaign is currently sending.
    pub async fn pause_campaign(&self, id: &CampaignId) -> Result<Campaign, EngineError> {
        Ok(self.scheduler.pause(id).await?)
    }

    /// Record a future activation time for a draft campaign.
    ///
    /// # Errors
    ///
    /// Rejected unless the campaign is in `draft`.
    pub async fn schedule_campaign(
        &self,
        id: &CampaignId,
        when: DateTime<Utc>,
    ) -> Result<Campaign, EngineError> {
        Ok(self.scheduler.schedule(id, when).await?)
    }

    /// Best-effort progress for a campaign.
    ///
    /// # Errors
    ///
    /// Only fails when the campaign does not exist.
    pub async fn campaign_progress(&self, id: &CampaignId) -> Result<CampaignProgress, EngineError> {
        let campaign = self.store.get(id).await?;

        let eta = if campaign.status == CampaignStatus::Sending {
            let batches = campaign
                .remaining()
                .div_ceil(campaign.settings.batch_size.max(1));
            let secs = batches as u64 * campaign.settings.batch_delay_secs;
            Some(Utc::now() + chrono::Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)))
        } else {
            None
        };

        Ok(CampaignProgress {
            results: campaign.results.clone(),
            progress_percent: campaign.stats.progress_percent(),
            eta,
            campaign,
        })
    }

    /// Record a hard bounce reported by the provider. Permanently
    /// suppresses the address from all future campaigns.
    ///
    /// # Errors
    ///
    /// Fails for an unknown campaign; the suppression itself still
    /// sticks.
    pub async fn record_bounce(
        &self,
        id: &CampaignId,
        email: &EmailAddress,
    ) -> Result<(), EngineError> {
        Ok(self.events.record_bounce(id, email).await?)
    }

    /// Record an unsubscribe. Permanently suppresses the address.
    ///
    /// # Errors
    ///
    /// Fails for an unknown campaign; the suppression itself still
    /// sticks.
    pub async fn record_unsubscribe(
        &self,
        id: &CampaignId,
        email: &EmailAddress,
    ) -> Result<(), EngineError> {
        Ok(self.events.record_unsubscribe(id, email).await?)
    }

    /// Record a spam complaint. Permanently suppresses the address.
    ///
    /// # Errors
    ///
    /// Fails for an unknown campaign; the suppression itself still
    /// sticks.
    pub async fn record_complaint(
        &self,
        id: &CampaignId,
        email: &EmailAddress,
    ) -> Result<(), EngineError> {
        Ok(self.events.record_complaint(id, email).await?)
    }

    /// Record an open-pixel hit.
    ///
    /// # Errors
    ///
    /// Fails for an unknown campaign.
    pub async fn record_open(
        &self,
        id: &CampaignId,
        recipient_id: &str,
    ) -> Result<(), EngineError> {
        Ok(self.events.record_open(id, recipient_id).await?)
    }

    /// Record a tracked-link click.
    ///
    /// # Errors
    ///
    /// Fails for an unknown campaign.
    pub async fn record_click(
        &self,
        id: &CampaignId,
        recipient_id: &str,
    ) -> Result<(), EngineError> {
        Ok(self.events.record_click(id, recipient_id).await?)
    }

    /// Record a reply.
    ///
    /// # Errors
    ///
    /// Fails for an unknown campaign.
    pub async fn record_reply(
        &self,
        id: &CampaignId,
        recipient_id: &str,
    ) -> Result<(), EngineError> {
        Ok(self.events.record_reply(id, recipient_id).await?)
    }

    /// Workspace-wide deliverability health.
    ///
    /// # Errors
    ///
    /// Fails only if the store cannot be read.
    pub async fn deliverability_health(
        &self,
        workspace_id: &str,
    ) -> Result<HealthReport, EngineError> {
        Ok(health_report(self.store.as_ref(), workspace_id).await?)
    }

    /// Wait for a campaign's dispatch (or scheduled-start timer) task to
    /// finish. Intended for graceful shutdown and tests.
    pub async fn await_campaign(&self, id: &CampaignId) {
        self.scheduler.join(id).await;
    }
}

//! Reputation and engagement event recording.

use std::sync::Arc;

use cadence_campaign::{CampaignId, CampaignStore, StoreError};
use cadence_common::EmailAddress;

use crate::suppression::{SuppressionList, SuppressionReason};

/// Folds provider callbacks (bounces, complaints) and tracking hits
/// (opens, clicks, replies, unsubscribes) into the owning campaign's
/// counters, and maintains the global suppression registries.
///
/// Counter updates are increments through the store's mutation path, so
/// they serialize cleanly against the scheduler's batch updates.
#[derive(Debug, Clone)]
pub struct EventRecorder {
    store: Arc<dyn CampaignStore>,
    suppression: Arc<SuppressionList>,
}

impl EventRecorder {
    #[must_use]
    pub fn new(store: Arc<dyn CampaignStore>, suppression: Arc<SuppressionList>) -> Self {
        Self { store, suppression }
    }

    /// Record a hard bounce: counts against the campaign and permanently
    /// suppresses the address from all future campaigns.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown campaign.
    pub async fn record_bounce(
        &self,
        campaign_id: &CampaignId,
        email: &EmailAddress,
    ) -> Result<(), StoreError> {
        tracing::info!(campaign = %campaign_id, email = %email, "Bounce recorded");
        self.suppression
            .record(email, SuppressionReason::Bounced, Some(campaign_id.clone()));

        self.store
            .mutate(
                campaign_id,
                Box::new(|c| {
                    c.stats.bounces += 1;
                    Ok(())
                }),
            )
            .await
            .map(drop)
    }

    /// Record an unsubscribe: counts against the campaign and suppresses
    /// the address.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown campaign.
    pub async fn record_unsubscribe(
        &self,
        campaign_id: &CampaignId,
        email: &EmailAddress,
    ) -> Result<(), StoreError> {
        tracing::info!(campaign = %campaign_id, email = %email, "Unsubscribe recorded");
        self.suppression.record(
            email,
            SuppressionReason::Unsubscribed,
            Some(campaign_id.clone()),
        );

        self.store
            .mutate(
                campaign_id,
                Box::new(|c| {
                    c.stats.unsubscribes += 1;
                    Ok(())
                }),
            )
            .await
            .map(drop)
    }

    /// Record a spam complaint: counts against the campaign and
    /// suppresses the address.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown campaign.
    pub async fn record_complaint(
        &self,
        campaign_id: &CampaignId,
        email: &EmailAddress,
    ) -> Result<(), StoreError> {
        tracing::warn!(campaign = %campaign_id, email = %email, "Spam complaint recorded");
        self.suppression.record(
            email,
            SuppressionReason::Complained,
            Some(campaign_id.clone()),
        );

        self.store
            .mutate(
                campaign_id,
                Box::new(|c| {
                    c.stats.complaints += 1;
                    Ok(())
                }),
            )
            .await
            .map(drop)
    }

    /// Record an open-pixel hit.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown campaign.
    pub async fn record_open(
        &self,
        campaign_id: &CampaignId,
        recipient_id: &str,
    ) -> Result<(), StoreError> {
        tracing::debug!(campaign = %campaign_id, recipient = recipient_id, "Open recorded");
        self.increment(campaign_id, |c| c.stats.opens += 1).await
    }

    /// Record a tracked-link click.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown campaign.
    pub async fn record_click(
        &self,
        campaign_id: &CampaignId,
        recipient_id: &str,
    ) -> Result<(), StoreError> {
        tracing::debug!(campaign = %campaign_id, recipient = recipient_id, "Click recorded");
        self.increment(campaign_id, |c| c.stats.clicks += 1).await
    }

    /// Record a reply.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown campaign.
    pub async fn record_reply(
        &self,
        campaign_id: &CampaignId,
        recipient_id: &str,
    ) -> Result<(), StoreError> {
        tracing::debug!(campaign = %campaign_id, recipient = recipient_id, "Reply recorded");
        self.increment(campaign_id, |c| c.stats.replies += 1).await
    }

    async fn increment(
        &self,
        campaign_id: &CampaignId,
        f: impl FnOnce(&mut cadence_campaign::Campaign) + Send + 'static,
    ) -> Result<(), StoreError> {
        self.store
            .mutate(
                campaign_id,
                Box::new(move |c| {
                    f(c);
                    Ok(())
                }),
            )
            .await
            .map(drop)
    }
}

//! The batch scheduler: one long-lived task per actively-sending
//! campaign.
//!
//! The task snapshots the eligible recipients at run start (no result
//! yet, or latest result failed), walks them in batches, and persists
//! each batch's results in a single store mutation so observers only
//! ever see whole-batch increments. Pause is cooperative: the flag is
//! checked at batch boundaries and the in-flight batch always finishes.
//! Per-recipient transport failures are absorbed into send results and
//! never abort the batch or the campaign.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use cadence_campaign::{
    Campaign, CampaignEvent, CampaignId, CampaignStatus, CampaignStore, SendResult, StateError,
    StoreError,
};
use cadence_health::SuppressionList;

use crate::{
    error::DispatchError,
    governor::{RateLimiter, current_quota},
    personalize::render,
    sender::{OutboundMessage, Sender},
};

/// Acknowledgement returned by a successful start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartReceipt {
    pub campaign_id: CampaignId,
    pub message: String,
    /// Batches this run will dispatch.
    pub batches: usize,
    /// Estimated completion time: `batches × batch_delay` from now.
    pub estimated_completion: DateTime<Utc>,
}

/// Drives campaigns through the sender collaborator.
#[derive(Debug)]
pub struct CampaignScheduler {
    store: Arc<dyn CampaignStore>,
    sender: Arc<dyn Sender>,
    suppression: Arc<SuppressionList>,
    limiter: Arc<RateLimiter>,
    /// One task handle per campaign: either a deferred scheduled-start
    /// timer or an active dispatch run.
    tasks: DashMap<CampaignId, JoinHandle<()>>,
}

impl CampaignScheduler {
    #[must_use]
    pub fn new(
        store: Arc<dyn CampaignStore>,
        sender: Arc<dyn Sender>,
        suppression: Arc<SuppressionList>,
    ) -> Self {
        Self {
            store,
            sender,
            suppression,
            limiter: Arc::new(RateLimiter::new()),
            tasks: DashMap::new(),
        }
    }

    /// Start (or resume) dispatching a campaign.
    ///
    /// Legal only from `draft`, `scheduled`, or `paused`; anything else
    /// is rejected synchronously with a descriptive message and no
    /// mutation.
    ///
    /// # Errors
    ///
    /// [`DispatchError::State`] for illegal statuses,
    /// [`DispatchError::Store`] for unknown campaigns.
    pub async fn start(&self, id: &CampaignId) -> Result<StartReceipt, DispatchError> {
        let current = self.store.get(id).await?;

        if !current.status.is_startable() {
            return Err(StateError::NotStartable {
                status: current.status,
            }
            .into());
        }

        // A paused run may still be draining its in-flight batch; wait
        // for it so two tasks never dispatch to the same recipient.
        if current.status == CampaignStatus::Paused {
            if let Some((_, handle)) = self.tasks.remove(id) {
                let _ = handle.await;
            }
        }

        let campaign = self
            .store
            .mutate(
                id,
                Box::new(|c| c.apply_event(CampaignEvent::Start).map_err(StoreError::from)),
            )
            .await?;

        let remaining = campaign.remaining();
        let batches = remaining.div_ceil(campaign.settings.batch_size.max(1));
        let eta_secs = batches as u64 * campaign.settings.batch_delay_secs;
        let estimated_completion =
            Utc::now() + chrono::Duration::seconds(i64::try_from(eta_secs).unwrap_or(i64::MAX));

        info!(
            campaign = %id,
            remaining,
            batches,
            "Campaign dispatch starting"
        );

        self.spawn_run(id.clone());

        Ok(StartReceipt {
            campaign_id: id.clone(),
            message: format!("Campaign started: {remaining} recipients in {batches} batches"),
            batches,
            estimated_completion,
        })
    }

    /// Request a pause. Takes effect at the next batch boundary; the
    /// in-flight batch finishes and its results are recorded.
    ///
    /// # Errors
    ///
    /// [`DispatchError::State`] unless the campaign is `sending`.
    pub async fn pause(&self, id: &CampaignId) -> Result<Campaign, DispatchError> {
        let campaign = self
            .store
            .mutate(
                id,
                Box::new(|c| c.apply_event(CampaignEvent::Pause).map_err(StoreError::from)),
            )
            .await?;

        info!(campaign = %id, "Pause requested; current batch will finish");
        Ok(campaign)
    }

    /// Record a future activation time. Legal only from `draft`. A
    /// deferred timer fires the start, but only if the campaign is still
    /// `scheduled` at fire time — a manual start in the interim wins and
    /// there is no double start.
    ///
    /// # Errors
    ///
    /// [`DispatchError::State`] unless the campaign is `draft`.
    pub async fn schedule(
        &self,
        id: &CampaignId,
        when: DateTime<Utc>,
    ) -> Result<Campaign, DispatchError> {
        let campaign = self
            .store
            .mutate(
                id,
                Box::new(move |c| {
                    c.apply_event(CampaignEvent::Schedule)
                        .map_err(StoreError::from)?;
                    c.scheduled_at = Some(when);
                    Ok(())
                }),
            )
            .await?;

        let delay = (when - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        info!(campaign = %id, %when, delay_secs = delay.as_secs(), "Campaign scheduled");

        let store = Arc::clone(&self.store);
        let sender = Arc::clone(&self.sender);
        let suppression = Arc::clone(&self.suppression);
        let limiter = Arc::clone(&self.limiter);
        let task_id = id.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            // Fire only if nothing else transitioned the campaign in the
            // meantime; the store serializes this against manual starts.
            let fired = store
                .mutate(
                    &task_id,
                    Box::new(|c| {
                        if c.status != CampaignStatus::Scheduled {
                            return Err(StateError::NotStartable { status: c.status }.into());
                        }
                        c.apply_event(CampaignEvent::Start).map_err(StoreError::from)
                    }),
                )
                .await;

            match fired {
                Ok(_) => run(store, sender, suppression, limiter, task_id).await,
                Err(e) => {
                    debug!(campaign = %task_id, error = %e, "Scheduled start superseded");
                }
            }
        });

        self.tasks.insert(id.clone(), handle);
        Ok(campaign)
    }

    /// Whether a dispatch or timer task is currently live for this
    /// campaign.
    #[must_use]
    pub fn is_running(&self, id: &CampaignId) -> bool {
        self.tasks
            .get(id)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Wait for the campaign's task (timer or run) to finish. Intended
    /// for graceful shutdown and tests; returns immediately when no task
    /// is registered.
    pub async fn join(&self, id: &CampaignId) {
        if let Some((_, handle)) = self.tasks.remove(id) {
            let _ = handle.await;
        }
    }

    fn spawn_run(&self, id: CampaignId) {
        let store = Arc::clone(&self.store);
        let sender = Arc::clone(&self.sender);
        let suppression = Arc::clone(&self.suppression);
        let limiter = Arc::clone(&self.limiter);

        let handle = tokio::spawn(run(store, sender, suppression, limiter, id.clone()));
        self.tasks.insert(id, handle);
    }
}

/// One dispatch run: walk the eligible recipients in batches until
/// exhausted or paused.
async fn run(
    store: Arc<dyn CampaignStore>,
    sender: Arc<dyn Sender>,
    suppression: Arc<SuppressionList>,
    limiter: Arc<RateLimiter>,
    id: CampaignId,
) {
    let campaign = match store.get(&id).await {
        Ok(campaign) => campaign,
        Err(e) => {
            error!(campaign = %id, error = %e, "Dispatch run could not load campaign");
            return;
        }
    };

    // One attempt per recipient per run: the snapshot fixes this run's
    // work list, so a recipient that fails now is retried on the next
    // run, not in a tight loop within this one.
    let eligible = campaign.eligible_recipients();
    let batch_size = campaign.settings.batch_size.max(1);
    let batch_delay = Duration::from_secs(campaign.settings.batch_delay_secs);
    let send_timeout = Duration::from_secs(campaign.settings.send_timeout_secs);
    let total_batches = eligible.len().div_ceil(batch_size);

    debug!(
        campaign = %id,
        eligible = eligible.len(),
        batch_size,
        total_batches,
        "Dispatch run loaded"
    );

    for (batch_index, batch) in eligible.chunks(batch_size).enumerate() {
        // Pause takes effect here, at the batch boundary.
        let current = match store.get(&id).await {
            Ok(campaign) => campaign,
            Err(e) => {
                error!(campaign = %id, error = %e, "Dispatch run lost its campaign");
                return;
            }
        };
        if current.status != CampaignStatus::Sending {
            info!(campaign = %id, status = %current.status, "Dispatch run stopping");
            return;
        }

        let quota = current_quota(&current.settings);
        let mut results = Vec::with_capacity(batch.len());

        for recipient in batch {
            // Late suppression: the address may have bounced or
            // unsubscribed in another campaign since validation.
            if let Some(reason) = suppression.check(&recipient.email) {
                debug!(
                    campaign = %id,
                    recipient = recipient.id.as_str(),
                    %reason,
                    "Recipient suppressed since validation, skipping"
                );
                results.push(SendResult::skipped(
                    recipient.id.as_str(),
                    format!("Suppressed since validation: {reason}"),
                ));
                continue;
            }

            // Hard quota enforcement: sleep out whatever the governor
            // reports before this delivery may proceed.
            while let Err(wait) = limiter.try_acquire(&id, quota) {
                tokio::time::sleep(wait).await;
            }

            let rendered = render(&current.template, recipient, &id, &current.settings);
            let message = OutboundMessage {
                to: recipient.email.clone(),
                from_email: current.from_email.clone(),
                from_name: current.from_name.clone(),
                subject: rendered.subject,
                html_body: rendered.html_body,
                text_body: rendered.text_body,
            };

            let result = match tokio::time::timeout(send_timeout, sender.send(&message)).await {
                Ok(Ok(receipt)) => {
                    SendResult::sent(recipient.id.as_str(), receipt.provider_message_id)
                }
                Ok(Err(send_error)) => {
                    warn!(
                        campaign = %id,
                        recipient = recipient.id.as_str(),
                        error = %send_error,
                        "Delivery attempt failed"
                    );
                    SendResult::failed(recipient.id.as_str(), send_error.to_string())
                }
                Err(_elapsed) => {
                    warn!(
                        campaign = %id,
                        recipient = recipient.id.as_str(),
                        timeout_secs = send_timeout.as_secs(),
                        "Delivery attempt timed out"
                    );
                    SendResult::failed(
                        recipient.id.as_str(),
                        format!(
                            "Delivery attempt timed out after {}s",
                            send_timeout.as_secs()
                        ),
                    )
                }
            };

            results.push(result);
        }

        // Whole-batch fold: results and counters land in one mutation.
        let folded = store
            .mutate(
                &id,
                Box::new(move |c| {
                    let _ = c.record_batch(results);
                    Ok(())
                }),
            )
            .await;

        match folded {
            Ok(updated) => {
                debug!(
                    campaign = %id,
                    batch = batch_index + 1,
                    sent = updated.stats.sent,
                    failed = updated.stats.failed,
                    pending = updated.stats.pending,
                    "Batch recorded"
                );
            }
            Err(e) => {
                error!(campaign = %id, error = %e, "Failed to record batch, run aborting");
                return;
            }
        }

        // Pace before the next batch, honoring a pause requested while
        // this batch was in flight.
        if batch_index + 1 < total_batches {
            match store.get(&id).await {
                Ok(campaign) if campaign.status == CampaignStatus::Sending => {
                    tokio::time::sleep(batch_delay).await;
                }
                Ok(campaign) => {
                    info!(campaign = %id, status = %campaign.status, "Dispatch run stopping");
                    return;
                }
                Err(e) => {
                    error!(campaign = %id, error = %e, "Dispatch run lost its campaign");
                    return;
                }
            }
        }
    }

    // Every eligible recipient was attempted. The terminal transition
    // only fires if the campaign is still sending; a pause that landed
    // during the final batch wins and keeps the campaign resumable.
    let outcome = store
        .mutate(
            &id,
            Box::new(|c| {
                let any_sent = c.stats.sent > 0;
                let any_failed = c.stats.failed > 0;
                c.apply_event(CampaignEvent::Exhausted {
                    any_sent,
                    any_failed,
                })
                .map_err(StoreError::from)
            }),
        )
        .await;

    match outcome {
        Ok(campaign) => {
            info!(
                campaign = %id,
                status = %campaign.status,
                sent = campaign.stats.sent,
                failed = campaign.stats.failed,
                "Dispatch run complete"
            );
        }
        Err(StoreError::State(_)) => {
            info!(campaign = %id, "Campaign paused during final batch; left resumable");
        }
        Err(e) => {
            error!(campaign = %id, error = %e, "Failed to finalize campaign");
        }
    }
}

//! Workspace-level deliverability health.
//!
//! Sender reputation is a property of the sending identity, not of a
//! single campaign, so the rates here aggregate every campaign the
//! workspace owns.

use serde::{Deserialize, Serialize};

use cadence_campaign::{CampaignStore, StoreError};

/// Bounce rate above this percentage starts costing score.
const BOUNCE_THRESHOLD: f64 = 2.0;
/// Complaint rate above this percentage starts costing score.
const COMPLAINT_THRESHOLD: f64 = 0.1;
/// Unsubscribe rate above this percentage starts costing score.
const UNSUBSCRIBE_THRESHOLD: f64 = 1.0;

/// Score lost per percentage point of bounce rate beyond the threshold.
const BOUNCE_PENALTY: f64 = 10.0;
/// Score lost per percentage point of complaint rate beyond the
/// threshold. Complaints are weighted hardest: providers block senders
/// over them fastest.
const COMPLAINT_PENALTY: f64 = 200.0;
/// Score lost per percentage point of unsubscribe rate beyond the
/// threshold.
const UNSUBSCRIBE_PENALTY: f64 = 5.0;

/// Derived deliverability health for one workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub workspace_id: String,
    /// 0–100; 100 is a clean sending record.
    pub score: f64,
    pub total_sent: u64,
    pub bounce_rate: f64,
    pub complaint_rate: f64,
    pub unsubscribe_rate: f64,
    pub recommendations: Vec<String>,
}

/// Compute the health report for a workspace from its campaigns.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub async fn health_report(
    store: &dyn CampaignStore,
    workspace_id: &str,
) -> Result<HealthReport, StoreError> {
    let campaigns = store.list_by_workspace(workspace_id).await?;

    let mut sent = 0u64;
    let mut bounces = 0u64;
    let mut complaints = 0u64;
    let mut unsubscribes = 0u64;

    for campaign in &campaigns {
        sent += campaign.stats.sent;
        bounces += campaign.stats.bounces;
        complaints += campaign.stats.complaints;
        unsubscribes += campaign.stats.unsubscribes;
    }

    let bounce_rate = rate(bounces, sent);
    let complaint_rate = rate(complaints, sent);
    let unsubscribe_rate = rate(unsubscribes, sent);

    let mut score = 100.0;
    let mut recommendations = Vec::new();

    if bounce_rate > BOUNCE_THRESHOLD {
        score -= (bounce_rate - BOUNCE_THRESHOLD) * BOUNCE_PENALTY;
        recommendations.push(format!(
            "Bounce rate is {bounce_rate:.2}% (target below {BOUNCE_THRESHOLD}%). \
             Re-verify your list and remove stale addresses before the next send."
        ));
    }

    if complaint_rate > COMPLAINT_THRESHOLD {
        score -= (complaint_rate - COMPLAINT_THRESHOLD) * COMPLAINT_PENALTY;
        recommendations.push(format!(
            "Complaint rate is {complaint_rate:.2}% (target below {COMPLAINT_THRESHOLD}%). \
             Tighten list consent and make the unsubscribe link more prominent."
        ));
    }

    if unsubscribe_rate > UNSUBSCRIBE_THRESHOLD {
        score -= (unsubscribe_rate - UNSUBSCRIBE_THRESHOLD) * UNSUBSCRIBE_PENALTY;
        recommendations.push(format!(
            "Unsubscribe rate is {unsubscribe_rate:.2}% (target below \
             {UNSUBSCRIBE_THRESHOLD}%). Revisit sending frequency and audience targeting."
        ));
    }

    if recommendations.is_empty() {
        recommendations
            .push("Deliverability looks healthy. Keep list hygiene as it is.".to_string());
    }

    Ok(HealthReport {
        workspace_id: workspace_id.to_string(),
        score: score.clamp(0.0, 100.0),
        total_sent: sent,
        bounce_rate,
        complaint_rate,
        unsubscribe_rate,
        recommendations,
    })
}

fn rate(events: u64, sent: u64) -> f64 {
    if sent == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let pct = (events as f64 / sent as f64) * 100.0;
    pct
}

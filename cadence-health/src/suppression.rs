//! Process-wide suppression registries.
//!
//! Addresses land here through explicit event recording (bounce,
//! unsubscribe, complaint) and never leave: suppression outlives the
//! campaign that caused it and applies to every future campaign in every
//! workspace. The registries are append-only and keyed by the normalized
//! (lowercased) address, so concurrent access from multiple scheduler
//! tasks needs no coordination beyond the map itself.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use cadence_campaign::CampaignId;
use cadence_common::EmailAddress;

/// Why an address was suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionReason {
    Bounced,
    Unsubscribed,
    Complained,
}

impl std::fmt::Display for SuppressionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Bounced => "bounced",
            Self::Unsubscribed => "unsubscribed",
            Self::Complained => "complained",
        })
    }
}

/// A single suppression record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionEntry {
    pub email: EmailAddress,
    pub reason: SuppressionReason,
    pub recorded_at: DateTime<Utc>,
    /// The campaign whose event caused the suppression, when known.
    #[serde(default)]
    pub source_campaign: Option<CampaignId>,
}

/// The three suppression registries.
#[derive(Debug, Default)]
pub struct SuppressionList {
    bounced: DashMap<String, SuppressionEntry>,
    unsubscribed: DashMap<String, SuppressionEntry>,
    complained: DashMap<String, SuppressionEntry>,
}

impl SuppressionList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a suppression. The first entry for an address wins; later
    /// events for the same reason do not overwrite the original record.
    pub fn record(
        &self,
        email: &EmailAddress,
        reason: SuppressionReason,
        source_campaign: Option<CampaignId>,
    ) {
        let registry = self.registry(reason);

        registry
            .entry(email.as_str().to_string())
            .or_insert_with(|| {
                tracing::debug!(email = %email, %reason, "Address suppressed");
                SuppressionEntry {
                    email: email.clone(),
                    reason,
                    recorded_at: Utc::now(),
                    source_campaign,
                }
            });
    }

    /// Which registry, if any, contains this address. Bounce takes
    /// precedence over unsubscribe over complaint when an address is in
    /// more than one.
    #[must_use]
    pub fn check(&self, email: &EmailAddress) -> Option<SuppressionReason> {
        let key = email.as_str();

        if self.bounced.contains_key(key) {
            Some(SuppressionReason::Bounced)
        } else if self.unsubscribed.contains_key(key) {
            Some(SuppressionReason::Unsubscribed)
        } else if self.complained.contains_key(key) {
            Some(SuppressionReason::Complained)
        } else {
            None
        }
    }

    /// Whether this address is suppressed for any reason.
    #[must_use]
    pub fn is_suppressed(&self, email: &EmailAddress) -> bool {
        self.check(email).is_some()
    }

    /// Look up the full entry for an address.
    #[must_use]
    pub fn entry(&self, email: &EmailAddress) -> Option<SuppressionEntry> {
        let reason = self.check(email)?;
        self.registry(reason)
            .get(email.as_str())
            .map(|entry| entry.value().clone())
    }

    /// Number of suppressed addresses across all registries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bounced.len() + self.unsubscribed.len() + self.complained.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    const fn registry(&self, reason: SuppressionReason) -> &DashMap<String, SuppressionEntry> {
        match reason {
            SuppressionReason::Bounced => &self.bounced,
            SuppressionReason::Unsubscribed => &self.unsubscribed,
            SuppressionReason::Complained => &self.complained,
        }
    }
}

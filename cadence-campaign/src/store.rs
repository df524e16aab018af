//! Campaign persistence seam.
//!
//! The engine talks to campaigns exclusively through [`CampaignStore`];
//! a real deployment puts a durable backend behind it. The in-memory
//! implementation here backs tests and transient runs.
//!
//! All writes go through [`CampaignStore::mutate`], which applies a
//! closure under the store's write lock. That gives every campaign a
//! single-writer discipline: the scheduler's whole-batch updates and the
//! admin operations (pause, schedule) are serialized against each other,
//! so neither can clobber the other's fields.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;

use crate::{campaign::Campaign, error::StoreError, types::CampaignId};

/// A closure applied to a campaign under the store lock.
pub type Mutation = Box<dyn FnOnce(&mut Campaign) -> Result<(), StoreError> + Send>;

/// Repository interface for campaigns.
#[async_trait]
pub trait CampaignStore: Send + Sync + std::fmt::Debug {
    /// Persist a new campaign.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    async fn insert(&self, campaign: Campaign) -> Result<(), StoreError>;

    /// Fetch a snapshot of a campaign.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown ids.
    async fn get(&self, id: &CampaignId) -> Result<Campaign, StoreError>;

    /// Apply a mutation atomically and return the updated snapshot.
    ///
    /// Closures must check their guards before writing any field; a
    /// closure that errors is expected to have left the campaign
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown ids, or the
    /// closure's error.
    async fn mutate(&self, id: &CampaignId, f: Mutation) -> Result<Campaign, StoreError>;

    /// Snapshots of every campaign owned by a workspace.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    async fn list_by_workspace(&self, workspace_id: &str) -> Result<Vec<Campaign>, StoreError>;
}

/// In-memory campaign store.
///
/// A `HashMap` behind an `RwLock`; mutations run under the write lock,
/// which is what provides the per-campaign single-writer guarantee.
/// Reads recover from lock poisoning by taking the inner value — a
/// panicked writer can only have left a fully-applied or fully-skipped
/// mutation behind.
#[derive(Debug, Clone, Default)]
pub struct MemoryCampaignStore {
    campaigns: Arc<RwLock<HashMap<CampaignId, Campaign>>>,
}

impl MemoryCampaignStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored campaigns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.campaigns
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CampaignStore for MemoryCampaignStore {
    async fn insert(&self, campaign: Campaign) -> Result<(), StoreError> {
        tracing::debug!(campaign = %campaign.id, workspace = campaign.workspace_id.as_str(), "Campaign stored");
        self.campaigns
            .write()?
            .insert(campaign.id.clone(), campaign);
        Ok(())
    }

    async fn get(&self, id: &CampaignId) -> Result<Campaign, StoreError> {
        self.campaigns
            .read()?
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn mutate(&self, id: &CampaignId, f: Mutation) -> Result<Campaign, StoreError> {
        let mut campaigns = self.campaigns.write()?;
        let campaign = campaigns
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        f(campaign)?;
        Ok(campaign.clone())
    }

    async fn list_by_workspace(&self, workspace_id: &str) -> Result<Vec<Campaign>, StoreError> {
        let mut campaigns: Vec<_> = self
            .campaigns
            .read()?
            .values()
            .filter(|c| c.workspace_id == workspace_id)
            .cloned()
            .collect();

        // Ids are ULIDs, so this is creation order.
        campaigns.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(campaigns)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cadence_common::{EmailAddress, Recipient, Template};

    use super::*;
    use crate::settings::CampaignSettings;

    fn campaign(workspace: &str) -> Campaign {
        Campaign::new(
            workspace,
            "Weekly digest",
            Template::new("Digest", "<p>News</p>"),
            vec![Recipient::new(
                "r-1",
                EmailAddress::parse("a@example.com").unwrap(),
            )],
            EmailAddress::parse("digest@sender.example.com").unwrap(),
            "Digest Bot",
            CampaignSettings::default(),
            0,
        )
    }

    #[tokio::test]
    async fn insert_get_roundtrip() {
        let store = MemoryCampaignStore::new();
        let campaign = campaign("ws-1");
        let id = campaign.id.clone();

        store.insert(campaign).await.unwrap();
        let fetched = store.get(&id).await.unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.workspace_id, "ws-1");
    }

    #[tokio::test]
    async fn get_unknown_id_is_not_found() {
        let store = MemoryCampaignStore::new();
        let missing = CampaignId::generate();
        assert!(matches!(
            store.get(&missing).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn mutate_applies_and_returns_snapshot() {
        let store = MemoryCampaignStore::new();
        let campaign = campaign("ws-1");
        let id = campaign.id.clone();
        store.insert(campaign).await.unwrap();

        let updated = store
            .mutate(
                &id,
                Box::new(|c| {
                    c.name = "Renamed".to_string();
                    Ok(())
                }),
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Renamed");
        assert_eq!(store.get(&id).await.unwrap().name, "Renamed");
    }

    #[tokio::test]
    async fn failed_mutation_leaves_campaign_unchanged() {
        let store = MemoryCampaignStore::new();
        let campaign = campaign("ws-1");
        let id = campaign.id.clone();
        let original_name = campaign.name.clone();
        store.insert(campaign).await.unwrap();

        let result = store
            .mutate(
                &id,
                Box::new(|c| {
                    // Guard fails before any field is written.
                    let _ = c;
                    Err(StoreError::Internal("guard rejected".to_string()))
                }),
            )
            .await;

        assert!(result.is_err());
        assert_eq!(store.get(&id).await.unwrap().name, original_name);
    }

    #[tokio::test]
    async fn list_is_scoped_to_workspace() {
        let store = MemoryCampaignStore::new();
        store.insert(campaign("ws-1")).await.unwrap();
        store.insert(campaign("ws-1")).await.unwrap();
        store.insert(campaign("ws-2")).await.unwrap();

        assert_eq!(store.list_by_workspace("ws-1").await.unwrap().len(), 2);
        assert_eq!(store.list_by_workspace("ws-2").await.unwrap().len(), 1);
        assert!(store.list_by_workspace("ws-3").await.unwrap().is_empty());
    }
}

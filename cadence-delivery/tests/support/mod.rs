//! Shared test fixtures: a scriptable in-memory sender and campaign
//! builders.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;

use cadence_campaign::{Campaign, CampaignSettings, CampaignStore, MemoryCampaignStore};
use cadence_common::{EmailAddress, Recipient, Template};
use cadence_delivery::{OutboundMessage, SendError, SendReceipt, Sender};

/// A sender whose behavior is scripted per address.
///
/// Records every message it is asked to deliver; failures and artificial
/// latency are configured up front by the test.
#[derive(Debug, Default)]
pub struct MockSender {
    messages: parking_lot::Mutex<Vec<OutboundMessage>>,
    permanent_failures: parking_lot::Mutex<Vec<String>>,
    temporary_failures: parking_lot::Mutex<HashMap<String, u32>>,
    send_delay: parking_lot::Mutex<Option<Duration>>,
    counter: AtomicU64,
}

impl MockSender {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every attempt to this address fails permanently.
    pub fn fail_permanently(&self, email: &str) {
        self.permanent_failures.lock().push(email.to_string());
    }

    /// The next `times` attempts to this address fail temporarily, then
    /// succeed.
    pub fn fail_times(&self, email: &str, times: u32) {
        self.temporary_failures
            .lock()
            .insert(email.to_string(), times);
    }

    /// Artificial per-delivery latency, for pause and timeout tests.
    pub fn set_delay(&self, delay: Duration) {
        *self.send_delay.lock() = Some(delay);
    }

    pub fn sent_count(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn deliveries_to(&self, email: &str) -> usize {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.to.as_str() == email)
            .count()
    }
}

#[async_trait]
impl Sender for MockSender {
    async fn send(&self, message: &OutboundMessage) -> Result<SendReceipt, SendError> {
        let delay = *self.send_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.messages.lock().push(message.clone());

        if self
            .permanent_failures
            .lock()
            .iter()
            .any(|addr| addr == message.to.as_str())
        {
            return Err(SendError::Permanent("550 mailbox unavailable".to_string()));
        }

        {
            let mut temporary = self.temporary_failures.lock();
            if let Some(remaining) = temporary.get_mut(message.to.as_str()) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(SendError::Temporary("451 try again later".to_string()));
                }
            }
        }

        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        Ok(SendReceipt {
            provider_message_id: format!("mock-{n}"),
        })
    }
}

pub fn recipient(n: usize) -> Recipient {
    Recipient::new(
        format!("r-{n}"),
        EmailAddress::parse(&format!("user{n}@example.com")).expect("test address parses"),
    )
}

pub fn test_settings() -> CampaignSettings {
    CampaignSettings {
        batch_size: 50,
        batch_delay_secs: 0,
        send_timeout_secs: 5,
        ..Default::default()
    }
}

pub fn campaign_with(recipients: usize, settings: CampaignSettings) -> Campaign {
    Campaign::new(
        "ws-test",
        "Integration campaign",
        Template::new("Hello {{firstName}}", "<p>Hi {{firstName}}</p>"),
        (0..recipients).map(recipient).collect(),
        EmailAddress::parse("sender@cadence.example.com").expect("test address parses"),
        "Cadence Test",
        settings,
        0,
    )
}

pub async fn store_with(campaign: Campaign) -> (Arc<MemoryCampaignStore>, cadence_campaign::CampaignId) {
    let store = Arc::new(MemoryCampaignStore::new());
    let id = campaign.id.clone();
    store.insert(campaign).await.expect("insert succeeds");
    (store, id)
}

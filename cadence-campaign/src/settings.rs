//! Campaign pacing and tracking settings.

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

const fn default_batch_size() -> usize {
    50
}

const fn default_batch_delay_secs() -> u64 {
    60
}

const fn default_hourly_limit() -> u32 {
    1000
}

const fn default_daily_limit() -> u32 {
    10000
}

const fn default_track_opens() -> bool {
    true
}

const fn default_track_clicks() -> bool {
    true
}

const fn default_include_unsubscribe() -> bool {
    true
}

const fn default_warmup_day() -> u32 {
    1
}

const fn default_send_timeout_secs() -> u64 {
    30
}

fn default_tracking_base_url() -> String {
    "https://track.cadence.email".to_string()
}

/// Per-campaign pacing, tracking, and warm-up configuration.
///
/// Every field is serde-defaulted so callers can supply a partial
/// document; [`CampaignSettings::validate`] is the creation-time gate —
/// a campaign never reaches `draft` with settings that fail it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSettings {
    /// Recipients attempted per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pacing delay between batches, in seconds.
    #[serde(default = "default_batch_delay_secs")]
    pub batch_delay_secs: u64,

    /// Unrestricted per-hour ceiling when warm-up is off or finished.
    #[serde(default = "default_hourly_limit")]
    pub hourly_limit: u32,

    /// Unrestricted per-day ceiling when warm-up is off or finished.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,

    /// Embed an open-tracking pixel in rendered HTML.
    #[serde(default = "default_track_opens")]
    pub track_opens: bool,

    /// Rewrite links for click tracking (recorded, not enforced here).
    #[serde(default = "default_track_clicks")]
    pub track_clicks: bool,

    /// Append the unsubscribe footer to rendered bodies.
    #[serde(default = "default_include_unsubscribe")]
    pub include_unsubscribe: bool,

    /// Apply the warm-up rate ramp instead of the unrestricted ceiling.
    #[serde(default)]
    pub warmup_enabled: bool,

    /// Current warm-up day (1-based) when warm-up is enabled.
    #[serde(default = "default_warmup_day")]
    pub warmup_day: u32,

    /// Upper bound on a single delivery attempt before it is recorded as
    /// failed.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    /// Base URL for open-pixel and unsubscribe links.
    #[serde(default = "default_tracking_base_url")]
    pub tracking_base_url: String,
}

impl Default for CampaignSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_delay_secs: default_batch_delay_secs(),
            hourly_limit: default_hourly_limit(),
            daily_limit: default_daily_limit(),
            track_opens: default_track_opens(),
            track_clicks: default_track_clicks(),
            include_unsubscribe: default_include_unsubscribe(),
            warmup_enabled: false,
            warmup_day: default_warmup_day(),
            send_timeout_secs: default_send_timeout_secs(),
            tracking_base_url: default_tracking_base_url(),
        }
    }
}

impl CampaignSettings {
    /// Check the invariants a campaign cannot be created without.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub const fn validate(&self) -> Result<(), SettingsError> {
        if self.batch_size == 0 {
            return Err(SettingsError::ZeroBatchSize);
        }
        if self.hourly_limit == 0 {
            return Err(SettingsError::ZeroHourlyLimit);
        }
        if self.daily_limit < self.hourly_limit {
            return Err(SettingsError::DailyBelowHourly);
        }
        if self.warmup_enabled && self.warmup_day == 0 {
            return Err(SettingsError::ZeroWarmupDay);
        }
        if self.send_timeout_secs == 0 {
            return Err(SettingsError::ZeroSendTimeout);
        }
        Ok(())
    }
}

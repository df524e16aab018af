//! Send-rate governance: warm-up ramp plus hard enforcement.
//!
//! Two layers cooperate here. [`current_quota`] computes what a campaign
//! is *allowed* to send right now (the warm-up step function or the
//! unrestricted ceiling), and [`RateLimiter`] *enforces* it with a token
//! bucket per campaign refilled at the hourly rate, plus a rolling
//! 24-hour window for the daily cap. The scheduler consults the limiter
//! before every delivery and sleeps out whatever wait it reports.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use cadence_campaign::{CampaignId, CampaignSettings};

/// The currently allowed send rate for a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendQuota {
    pub per_hour: u32,
    pub per_day: u32,
}

/// Warm-up ramp, days 1 through 7: `(per_hour, per_day)`.
///
/// Monotonically non-decreasing in both columns; day 8 onward uses the
/// unrestricted ceiling from the campaign settings.
const WARMUP_SCHEDULE: [(u32, u32); 7] = [
    (10, 50),
    (20, 100),
    (40, 200),
    (80, 400),
    (150, 750),
    (250, 1250),
    (400, 2000),
];

/// Compute the quota a campaign may send at right now.
///
/// Warm-up off: the settings' ceiling. Warm-up on: the step table entry
/// for the warm-up day, clamped to the nearest defined entry for
/// out-of-range days and additionally capped at the ceiling (a tenant
/// with a low configured limit never exceeds it during warm-up). Day 8
/// and beyond return the ceiling.
#[must_use]
pub fn current_quota(settings: &CampaignSettings) -> SendQuota {
    let ceiling = SendQuota {
        per_hour: settings.hourly_limit,
        per_day: settings.daily_limit,
    };

    if !settings.warmup_enabled {
        return ceiling;
    }

    let day = settings.warmup_day.max(1);
    if day as usize > WARMUP_SCHEDULE.len() {
        return ceiling;
    }

    let (per_hour, per_day) = WARMUP_SCHEDULE[day as usize - 1];
    SendQuota {
        per_hour: per_hour.min(ceiling.per_hour),
        per_day: per_day.min(ceiling.per_day),
    }
}

/// Token bucket for a single campaign.
#[derive(Debug)]
struct TokenBucket {
    /// Current number of tokens.
    tokens: f64,
    /// Maximum tokens (the hourly quota; permits a burst up to it).
    capacity: f64,
    /// Tokens added per second.
    refill_rate: f64,
    /// Last time tokens were added.
    last_refill: Instant,
    /// Quota this bucket was built for; a warm-up day change rebuilds it.
    quota_per_hour: u32,
}

impl TokenBucket {
    fn new(per_hour: u32) -> Self {
        let capacity = f64::from(per_hour);
        Self {
            tokens: capacity,
            capacity,
            refill_rate: capacity / 3600.0,
            last_refill: Instant::now(),
            quota_per_hour: per_hour,
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    fn try_consume(&mut self) -> bool {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn time_until_available(&mut self) -> Duration {
        self.refill();

        if self.tokens >= 1.0 {
            return Duration::ZERO;
        }

        Duration::from_secs_f64((1.0 - self.tokens) / self.refill_rate)
    }
}

/// Rolling 24-hour counter for the daily cap.
#[derive(Debug)]
struct DayWindow {
    window_start: Instant,
    count: u32,
}

const DAY: Duration = Duration::from_secs(86_400);

impl DayWindow {
    fn new() -> Self {
        Self {
            window_start: Instant::now(),
            count: 0,
        }
    }

    fn roll(&mut self) {
        if self.window_start.elapsed() >= DAY {
            self.window_start = Instant::now();
            self.count = 0;
        }
    }

    fn remaining_window(&self) -> Duration {
        DAY.saturating_sub(self.window_start.elapsed())
    }
}

/// Per-campaign send-rate enforcement.
#[derive(Debug, Default)]
pub struct RateLimiter {
    buckets: DashMap<CampaignId, Arc<parking_lot::Mutex<TokenBucket>>>,
    windows: DashMap<CampaignId, Arc<parking_lot::Mutex<DayWindow>>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to take one send permit for a campaign under the given quota.
    ///
    /// Returns `Ok(())` if the send may proceed now, `Err(wait)` with the
    /// duration until the next permit otherwise.
    ///
    /// # Errors
    ///
    /// The `Err` value is the suggested wait, not a failure.
    pub fn try_acquire(&self, campaign: &CampaignId, quota: SendQuota) -> Result<(), Duration> {
        // Daily cap first: when it is exhausted the hourly bucket's wait
        // hint would be misleadingly short.
        let window = self
            .windows
            .entry(campaign.clone())
            .or_insert_with(|| Arc::new(parking_lot::Mutex::new(DayWindow::new())))
            .clone();

        {
            let mut window = window.lock();
            window.roll();
            if window.count >= quota.per_day {
                let wait = window.remaining_window();
                drop(window);
                tracing::debug!(
                    campaign = %campaign,
                    per_day = quota.per_day,
                    wait_secs = wait.as_secs(),
                    "Daily quota exhausted"
                );
                return Err(wait);
            }
        }

        let bucket = self
            .buckets
            .entry(campaign.clone())
            .or_insert_with(|| Arc::new(parking_lot::Mutex::new(TokenBucket::new(quota.per_hour))))
            .clone();

        let mut bucket = bucket.lock();

        // Warm-up advanced (or settings changed) since the bucket was
        // built: rebuild at the new rate.
        if bucket.quota_per_hour != quota.per_hour {
            *bucket = TokenBucket::new(quota.per_hour);
        }

        if bucket.try_consume() {
            drop(bucket);
            window.lock().count += 1;
            Ok(())
        } else {
            let wait = bucket.time_until_available();
            drop(bucket);
            tracing::debug!(
                campaign = %campaign,
                per_hour = quota.per_hour,
                wait_secs = wait.as_secs_f64(),
                "Hourly quota exhausted, must wait"
            );
            Err(wait)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn warmup_settings(day: u32) -> CampaignSettings {
        CampaignSettings {
            warmup_enabled: true,
            warmup_day: day,
            hourly_limit: 1000,
            daily_limit: 10_000,
            ..Default::default()
        }
    }

    #[test]
    fn warmup_off_returns_ceiling() {
        let settings = CampaignSettings {
            hourly_limit: 777,
            daily_limit: 7770,
            ..Default::default()
        };
        assert_eq!(
            current_quota(&settings),
            SendQuota {
                per_hour: 777,
                per_day: 7770
            }
        );
    }

    #[test]
    fn warmup_is_monotonic_over_days_one_through_seven() {
        let mut previous = SendQuota {
            per_hour: 0,
            per_day: 0,
        };
        for day in 1..=7 {
            let quota = current_quota(&warmup_settings(day));
            assert!(quota.per_hour >= previous.per_hour, "day {day} regressed");
            assert!(quota.per_day >= previous.per_day, "day {day} regressed");
            previous = quota;
        }
    }

    #[test]
    fn day_eight_returns_ceiling() {
        let quota = current_quota(&warmup_settings(8));
        assert_eq!(quota.per_hour, 1000);
        assert_eq!(quota.per_day, 10_000);
    }

    #[test]
    fn out_of_range_days_clamp() {
        // Day 0 clamps to day 1.
        assert_eq!(
            current_quota(&warmup_settings(0)),
            current_quota(&warmup_settings(1))
        );
        // A very large day behaves like day 8+.
        assert_eq!(
            current_quota(&warmup_settings(400)),
            current_quota(&warmup_settings(8))
        );
    }

    #[test]
    fn warmup_never_exceeds_configured_ceiling() {
        let settings = CampaignSettings {
            warmup_enabled: true,
            warmup_day: 7,
            hourly_limit: 100,
            daily_limit: 500,
            ..Default::default()
        };
        let quota = current_quota(&settings);
        assert_eq!(quota.per_hour, 100);
        assert_eq!(quota.per_day, 500);
    }

    #[test]
    fn bucket_allows_burst_then_limits() {
        let limiter = RateLimiter::new();
        let id = CampaignId::generate();
        let quota = SendQuota {
            per_hour: 20,
            per_day: 100,
        };

        for _ in 0..20 {
            assert!(limiter.try_acquire(&id, quota).is_ok());
        }

        let wait = limiter.try_acquire(&id, quota).unwrap_err();
        assert!(wait > Duration::ZERO);
    }

    #[test]
    fn daily_cap_blocks_even_with_tokens() {
        let limiter = RateLimiter::new();
        let id = CampaignId::generate();
        let quota = SendQuota {
            per_hour: 100,
            per_day: 3,
        };

        for _ in 0..3 {
            assert!(limiter.try_acquire(&id, quota).is_ok());
        }

        let wait = limiter.try_acquire(&id, quota).unwrap_err();
        // The wait is until the daily window resets, not a sub-second
        // token refill.
        assert!(wait > Duration::from_secs(3600));
    }

    #[test]
    fn quota_change_rebuilds_bucket() {
        let limiter = RateLimiter::new();
        let id = CampaignId::generate();

        let day1 = SendQuota {
            per_hour: 10,
            per_day: 1000,
        };
        for _ in 0..10 {
            assert!(limiter.try_acquire(&id, day1).is_ok());
        }
        assert!(limiter.try_acquire(&id, day1).is_err());

        // Warm-up advances: the fresh bucket opens up immediately.
        let day2 = SendQuota {
            per_hour: 20,
            per_day: 1000,
        };
        assert!(limiter.try_acquire(&id, day2).is_ok());
    }

    #[test]
    fn campaigns_are_independent() {
        let limiter = RateLimiter::new();
        let first = CampaignId::generate();
        let second = CampaignId::generate();
        let quota = SendQuota {
            per_hour: 5,
            per_day: 100,
        };

        for _ in 0..5 {
            assert!(limiter.try_acquire(&first, quota).is_ok());
        }
        assert!(limiter.try_acquire(&first, quota).is_err());
        assert!(limiter.try_acquire(&second, quota).is_ok());
    }
}

//! Fixed-window rate limiting primitives.
//!
//! A counter holds `(count, reset_at)` per `scope:identity` key. Recording a
//! request after `reset_at` opens a new window; otherwise the count grows.
//! Admission is checked separately so a replayed request can be vetted
//! without consuming a slot. Bursts of up to twice the limit across a window
//! boundary are accepted in exchange for O(1) state per key.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// Request budget for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    scope: &'static str,
    limit: u32,
    window: Duration,
}

impl RateLimitPolicy {
    /// `POST /offers/{id}/accept`.
    pub const OFFER_ACCEPT: Self = Self::new("offer-accept", 10, Duration::from_secs(60));
    /// `POST /qr/verify`.
    pub const QR_VERIFY: Self = Self::new("qr-verify", 30, Duration::from_secs(60));
    /// `POST /wallet/vouchers/{id}/qr`.
    pub const QR_ISSUE: Self = Self::new("qr-issue", 10, Duration::from_secs(60));
    /// `GET /wallet/ledger`.
    pub const WALLET_LEDGER: Self = Self::new("wallet-ledger", 30, Duration::from_secs(60));
    /// `GET /wallet/vouchers`.
    pub const WALLET_VOUCHERS: Self = Self::new("wallet-vouchers", 30, Duration::from_secs(60));
    /// `GET /wallet/summary`.
    pub const WALLET_SUMMARY: Self = Self::new("wallet-summary", 30, Duration::from_secs(60));

    /// Build a policy allowing `limit` requests per `window`.
    #[must_use]
    pub const fn new(scope: &'static str, limit: u32, window: Duration) -> Self {
        Self {
            scope,
            limit,
            window,
        }
    }

    /// Counter namespace.
    #[must_use]
    pub const fn scope(&self) -> &'static str {
        self.scope
    }

    /// Requests allowed per window.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Window length.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Counter key for `identity` under this policy.
    #[must_use]
    pub fn key_for(&self, identity: &str) -> RateLimitKey {
        RateLimitKey(format!("{}:{identity}", self.scope))
    }
}

/// Storage key of a counter, `scope:identity`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey(String);

impl RateLimitKey {
    /// Key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Requests counted in the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitCounter {
    /// Requests recorded since the window opened.
    pub count: u32,
    /// Instant after which the window is over.
    pub reset_at: DateTime<Utc>,
}

impl RateLimitCounter {
    /// Counter state after recording one request at `now`.
    #[must_use]
    pub fn recorded(existing: Option<Self>, now: DateTime<Utc>, window: Duration) -> Self {
        match existing {
            Some(counter) if !counter.is_expired(now) => Self {
                count: counter.count.saturating_add(1),
                reset_at: counter.reset_at,
            },
            _ => Self {
                count: 1,
                reset_at: now
                    .checked_add_signed(window_delta(window))
                    .unwrap_or(DateTime::<Utc>::MAX_UTC),
            },
        }
    }

    /// Whether the window has elapsed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.reset_at
    }

    /// Whole seconds until the window resets, never less than one.
    #[must_use]
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> u64 {
        let millis = (self.reset_at - now).num_milliseconds();
        u64::try_from(millis).map_or(1, |ms| ms.div_ceil(1000).max(1))
    }
}

/// Admission verdict for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// The request may proceed.
    Allowed,
    /// The budget is exhausted until the window resets.
    Limited {
        /// Seconds until a retry can succeed.
        retry_after_secs: u64,
    },
}

impl RateLimitDecision {
    /// Decide admission from the stored counter.
    #[must_use]
    pub fn evaluate(
        counter: Option<&RateLimitCounter>,
        policy: &RateLimitPolicy,
        now: DateTime<Utc>,
    ) -> Self {
        match counter {
            Some(counter) if !counter.is_expired(now) && counter.count >= policy.limit() => {
                Self::Limited {
                    retry_after_secs: counter.retry_after_secs(now),
                }
            }
            _ => Self::Allowed,
        }
    }

    /// Whether the request may proceed.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

fn window_delta(window: Duration) -> TimeDelta {
    TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    #[fixture]
    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .single()
            .expect("valid time")
    }

    fn policy() -> RateLimitPolicy {
        RateLimitPolicy::new("test", 3, Duration::from_secs(60))
    }

    fn record_n(n: u32, now: DateTime<Utc>) -> Option<RateLimitCounter> {
        (0..n).fold(None, |counter, _| {
            Some(RateLimitCounter::recorded(counter, now, policy().window()))
        })
    }

    #[rstest]
    fn first_request_is_allowed(start: DateTime<Utc>) {
        assert!(RateLimitDecision::evaluate(None, &policy(), start).is_allowed());
    }

    #[rstest]
    fn limit_is_enforced_after_recording(start: DateTime<Utc>) {
        let counter = record_n(3, start);
        let decision = RateLimitDecision::evaluate(counter.as_ref(), &policy(), start);
        assert_eq!(
            decision,
            RateLimitDecision::Limited {
                retry_after_secs: 60
            }
        );
    }

    #[rstest]
    fn window_reset_readmits(start: DateTime<Utc>) {
        let counter = record_n(3, start);
        let later = start + TimeDelta::seconds(61);
        assert!(RateLimitDecision::evaluate(counter.as_ref(), &policy(), later).is_allowed());
    }

    #[rstest]
    fn window_end_is_inclusive(start: DateTime<Utc>) {
        let counter = record_n(3, start);
        let at_reset = start + TimeDelta::seconds(60);
        assert!(!RateLimitDecision::evaluate(counter.as_ref(), &policy(), at_reset).is_allowed());
    }

    #[rstest]
    fn recording_after_expiry_opens_new_window(start: DateTime<Utc>) {
        let stale = record_n(3, start);
        let later = start + TimeDelta::seconds(90);
        let fresh = RateLimitCounter::recorded(stale, later, policy().window());
        assert_eq!(fresh.count, 1);
        assert_eq!(fresh.reset_at, later + TimeDelta::seconds(60));
    }

    #[rstest]
    #[case(TimeDelta::milliseconds(59_001), 60)]
    #[case(TimeDelta::milliseconds(1), 1)]
    #[case(TimeDelta::zero(), 1)]
    #[case(TimeDelta::seconds(-5), 1)]
    fn retry_after_rounds_up(
        start: DateTime<Utc>,
        #[case] remaining: TimeDelta,
        #[case] secs: u64,
    ) {
        let counter = RateLimitCounter {
            count: 3,
            reset_at: start + remaining,
        };
        assert_eq!(counter.retry_after_secs(start), secs);
    }

    #[rstest]
    fn keys_are_scoped_by_policy() {
        assert_eq!(
            RateLimitPolicy::QR_VERIFY.key_for("user-1").as_str(),
            "qr-verify:user-1"
        );
    }
}

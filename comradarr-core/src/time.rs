//! Pure time and backoff functions, parameterized over an explicit `now` so
//! callers (and tests) never reach for the wall clock implicitly.
//!
//! Grounded on `spec.md` §4.A.

use chrono::{DateTime, Datelike, Duration as ChronoDuration, TimeZone, Utc};
use rand::Rng;

/// Truncates `t` to UTC midnight.
#[must_use]
pub fn start_of_day_utc(t: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(t.year(), t.month(), t.day(), 0, 0, 0)
        .single()
        .expect("valid calendar date always maps to exactly one UTC instant")
}

/// The following UTC midnight after `t` (midnight itself maps to the *next* day).
#[must_use]
pub fn start_of_next_day_utc(t: DateTime<Utc>) -> DateTime<Utc> {
    start_of_day_utc(t) + ChronoDuration::days(1)
}

/// `start == null || now >= start + 60s`.
#[must_use]
pub fn is_minute_window_expired(start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match start {
        None => true,
        Some(start) => now >= start + ChronoDuration::seconds(60),
    }
}

/// `start == null || start_of_day_utc(now) > start`.
#[must_use]
pub fn is_day_window_expired(start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match start {
        None => true,
        Some(start) => start_of_day_utc(now) > start,
    }
}

/// `max(0, start + 60s - now)`, in milliseconds.
#[must_use]
pub fn ms_until_minute_window_expires(start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u64 {
    let Some(start) = start else { return 0 };
    let expires_at = start + ChronoDuration::seconds(60);
    let remaining = expires_at - now;
    remaining.num_milliseconds().max(0) as u64
}

/// `start_of_next_day_utc(now) - now`, in milliseconds.
#[must_use]
pub fn ms_until_midnight_utc(now: DateTime<Utc>) -> u64 {
    let remaining = start_of_next_day_utc(now) - now;
    remaining.num_milliseconds().max(0) as u64
}

/// Shape of an exponential backoff curve, shared by reconnect and HTTP retry.
#[derive(Debug, Clone, Copy)]
pub struct BackoffShape {
    pub base_ms: u64,
    pub max_ms: u64,
    pub multiplier: f64,
    /// Symmetric jitter fraction, e.g. `0.25` for ±25%.
    pub jitter: f64,
}

impl BackoffShape {
    /// Reconnect backoff: base 30s, max 600s, ×2, ±25% jitter (`spec.md` §4.A, §6 config table).
    #[must_use]
    pub const fn reconnect() -> Self {
        Self {
            base_ms: 30_000,
            max_ms: 600_000,
            multiplier: 2.0,
            jitter: 0.25,
        }
    }

    /// HTTP retry backoff: base 1s, max 30s, ×2, ±25% jitter (`spec.md` §4.A, §4.B).
    #[must_use]
    pub const fn http_retry() -> Self {
        Self {
            base_ms: 1_000,
            max_ms: 30_000,
            multiplier: 2.0,
            jitter: 0.25,
        }
    }

    /// `floor(min(base * multiplier^attempt, max) * (1 + U(-jitter, +jitter)))`.
    ///
    /// `rng` is passed in so callers (and property tests) can supply a
    /// deterministic source; production call sites use `rand::rng()`.
    #[must_use]
    pub fn delay_ms(&self, attempt: u32, rng: &mut impl Rng) -> u64 {
        let unjittered = (self.base_ms as f64 * self.multiplier.powi(attempt as i32)).min(self.max_ms as f64);
        let jitter_factor = 1.0 + rng.random_range(-self.jitter..=self.jitter);
        (unjittered * jitter_factor).floor().max(0.0) as u64
    }

    /// The jitter-free bounds `[lo, hi]` a `delay_ms` result must fall within,
    /// used by property tests (`spec.md` §8 P-BACKOFF-RECONNECT).
    #[must_use]
    pub fn bounds_ms(&self, attempt: u32) -> (u64, u64) {
        let unjittered = (self.base_ms as f64 * self.multiplier.powi(attempt as i32)).min(self.max_ms as f64);
        let lo = (unjittered * (1.0 - self.jitter)).floor().max(0.0) as u64;
        let hi = (unjittered * (1.0 + self.jitter)).ceil() as u64;
        (lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    #[test]
    fn minute_window_expiry() {
        assert!(is_minute_window_expired(None, ts(0)));
        assert!(!is_minute_window_expired(Some(ts(0)), ts(59)));
        assert!(is_minute_window_expired(Some(ts(0)), ts(60)));
    }

    #[test]
    fn day_window_expiry_crosses_midnight() {
        let start = ts(0); // 1970-01-01 00:00:00
        let same_day = ts(3600);
        let next_day = ts(90_000); // > 86400
        assert!(!is_day_window_expired(Some(start), same_day));
        assert!(is_day_window_expired(Some(start), next_day));
    }

    #[test]
    fn ms_until_midnight_is_nonnegative_and_bounded() {
        let now = ts(12 * 3600);
        let ms = ms_until_midnight_utc(now);
        assert!(ms <= 24 * 3600 * 1000);
    }

    proptest! {
        #[test]
        fn reconnect_backoff_matches_p_backoff_reconnect(attempt in 0u32..20) {
            let shape = BackoffShape::reconnect();
            let (lo, hi) = shape.bounds_ms(attempt);
            let mut rng = rand::rng();
            let delay = shape.delay_ms(attempt, &mut rng);
            prop_assert!(delay >= lo && delay <= hi);
        }
    }
}

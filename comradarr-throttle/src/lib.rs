//! comradarr-throttle
//!
//! Per-connector dispatch gating: minute/day rate windows, pause handling for
//! rate-limit and daily-budget exhaustion, and operator pause/resume.
//!
//! A thin decision layer over guarded counters, with the counters
//! themselves owned by the persistence adapter (`comradarr_core::Store`)
//! rather than an in-process `Mutex`, since they must survive process
//! restarts.

use chrono::{DateTime, Utc};
use comradarr_core::{time, Store, StoreError};
use comradarr_types::{Connector, PauseReason, ThrottleProfile, ThrottleState};
use thiserror::Error;

/// Failure surfaced by the throttle enforcer.
#[derive(Debug, Error)]
pub enum ThrottleError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a `can_dispatch` call was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    RateLimit,
    DailyBudgetExhausted,
    Manual,
}

impl From<PauseReason> for DenyReason {
    fn from(reason: PauseReason) -> Self {
        match reason {
            PauseReason::RateLimit => Self::RateLimit,
            PauseReason::DailyBudgetExhausted => Self::DailyBudgetExhausted,
            PauseReason::Manual => Self::Manual,
        }
    }
}

/// Outcome of [`ThrottleEnforcer::can_dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchDecision {
    /// A minute-window slot was reserved; the caller may issue one request.
    Allowed,
    /// Denied; `retry_after_ms` is the caller's best estimate of when to retry.
    Denied { reason: DenyReason, retry_after_ms: u64 },
}

impl DispatchDecision {
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// A point-in-time snapshot of a connector's throttle accounting.
#[derive(Debug, Clone)]
pub struct ThrottleStatus {
    pub requests_this_minute: u32,
    pub requests_today: u32,
    pub requests_per_minute: u32,
    pub daily_budget: Option<u32>,
    pub paused_until: Option<DateTime<Utc>>,
    pub pause_reason: Option<PauseReason>,
    pub profile: ThrottleProfile,
}

/// Gates outgoing upstream calls per connector.
///
/// All operations take a connector id; all state reads/writes go through the
/// `Store` this enforcer was built over.
pub struct ThrottleEnforcer<S> {
    store: S,
}

impl<S: Store> ThrottleEnforcer<S> {
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// The effective profile for a connector: its explicit profile, else the
    /// store's default (`is_default = true`), else the process-level
    /// "Moderate" fallback.
    pub async fn resolve_profile(&self, connector: &Connector) -> Result<ThrottleProfile, ThrottleError> {
        if let Some(profile_id) = connector.throttle_profile_id {
            if let Some(profile) = self.store.get_throttle_profile(profile_id).await? {
                return Ok(profile);
            }
        }
        if let Some(profile) = self.store.get_default_throttle_profile().await? {
            return Ok(profile);
        }
        Ok(ThrottleProfile::moderate_fallback())
    }

    /// Evaluation order, short-circuiting on first denial: pause window, then
    /// daily budget, then the atomic minute-slot acquisition.
    pub async fn can_dispatch(
        &self,
        connector: &Connector,
        now: DateTime<Utc>,
    ) -> Result<DispatchDecision, ThrottleError> {
        let profile = self.resolve_profile(connector).await?;
        let state = self.store.get_or_create_throttle_state(connector.id).await?;

        if let Some(paused_until) = state.paused_until {
            if paused_until > now {
                let reason = state.pause_reason.map_or(DenyReason::Manual, DenyReason::from);
                let retry_after_ms = (paused_until - now).num_milliseconds().max(0) as u64;
                return Ok(DispatchDecision::Denied { reason, retry_after_ms });
            }
        }

        if let Some(daily_budget) = profile.daily_budget {
            if time::is_day_window_expired(state.day_window_start, now) {
                self.store.reset_expired_windows(now).await?;
            }
            let refreshed = self.store.get_or_create_throttle_state(connector.id).await?;
            if refreshed.requests_today >= daily_budget {
                let until = time::start_of_next_day_utc(now);
                self.store
                    .set_pause(connector.id, until, PauseReason::DailyBudgetExhausted)
                    .await?;
                return Ok(DispatchDecision::Denied {
                    reason: DenyReason::DailyBudgetExhausted,
                    retry_after_ms: time::ms_until_midnight_utc(now),
                });
            }
        }

        match self
            .store
            .try_acquire_minute_slot(connector.id, profile.requests_per_minute, now)
            .await?
        {
            comradarr_core::SlotOutcome::Acquired => Ok(DispatchDecision::Allowed),
            comradarr_core::SlotOutcome::Exhausted => Ok(DispatchDecision::Denied {
                reason: DenyReason::RateLimit,
                retry_after_ms: time::ms_until_minute_window_expires(state.minute_window_start, now),
            }),
        }
    }

    /// Bumps `requests_today` and `last_request_at`; the per-minute counter
    /// is already bumped by [`Store::try_acquire_minute_slot`].
    pub async fn record_request(
        &self,
        connector_id: comradarr_types::ConnectorId,
        now: DateTime<Utc>,
    ) -> Result<(), ThrottleError> {
        self.store.record_request(connector_id, now).await?;
        Ok(())
    }

    /// `retry_after_seconds = Some(0)` is treated as "use the profile
    /// fallback", matching the upstream source's observed behavior.
    pub async fn handle_rate_limit_response(
        &self,
        connector: &Connector,
        retry_after_seconds: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<(), ThrottleError> {
        let profile = self.resolve_profile(connector).await?;
        let seconds = match retry_after_seconds {
            Some(s) if s > 0 => s,
            _ => u64::from(profile.rate_limit_pause_seconds),
        };
        let until = now + chrono::Duration::seconds(seconds as i64);
        self.store.set_pause(connector.id, until, PauseReason::RateLimit).await?;
        Ok(())
    }

    /// `-1` if paused, else the per-minute capacity remaining in the current window.
    pub async fn get_available_capacity(
        &self,
        connector: &Connector,
        now: DateTime<Utc>,
    ) -> Result<i64, ThrottleError> {
        let profile = self.resolve_profile(connector).await?;
        let state = self.store.get_or_create_throttle_state(connector.id).await?;
        if let Some(paused_until) = state.paused_until {
            if paused_until > now {
                return Ok(-1);
            }
        }
        if time::is_minute_window_expired(state.minute_window_start, now) {
            return Ok(i64::from(profile.requests_per_minute));
        }
        Ok(i64::from(profile.requests_per_minute) - i64::from(state.requests_this_minute))
    }

    /// A snapshot with remaining per-minute/day counts, pause state, and effective profile.
    pub async fn get_status(&self, connector: &Connector) -> Result<ThrottleStatus, ThrottleError> {
        let profile = self.resolve_profile(connector).await?;
        let state: ThrottleState = self.store.get_or_create_throttle_state(connector.id).await?;
        Ok(ThrottleStatus {
            requests_this_minute: state.requests_this_minute,
            requests_today: state.requests_today,
            requests_per_minute: profile.requests_per_minute,
            daily_budget: profile.daily_budget,
            paused_until: state.paused_until,
            pause_reason: state.pause_reason,
            profile,
        })
    }

    /// Operator control: pauses dispatch for `seconds`, reason `manual`.
    pub async fn pause_dispatch(
        &self,
        connector_id: comradarr_types::ConnectorId,
        seconds: u64,
        now: DateTime<Utc>,
    ) -> Result<(), ThrottleError> {
        let until = now + chrono::Duration::seconds(seconds as i64);
        self.store.set_pause(connector_id, until, PauseReason::Manual).await?;
        Ok(())
    }

    /// Operator control: clears any pause, manual or otherwise.
    pub async fn resume_dispatch(
        &self,
        connector_id: comradarr_types::ConnectorId,
    ) -> Result<(), ThrottleError> {
        self.store.clear_pause(connector_id).await?;
        Ok(())
    }

    /// Bulk tick: zeroes expired minute/day windows, clears expired pauses.
    /// Returns the number of rows touched.
    pub async fn reset_expired_windows(&self, now: DateTime<Utc>) -> Result<u64, ThrottleError> {
        Ok(self.store.reset_expired_windows(now).await?)
    }
}

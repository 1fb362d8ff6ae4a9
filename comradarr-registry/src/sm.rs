//! The per-(connector, content) search lifecycle state machine.
//!
//! Pure `(SearchRegistry, Event) -> (SearchRegistry, HistoryRecord)`
//! transitions: no I/O, no clock reads, every timestamp supplied by the caller.

use chrono::{DateTime, Duration, Utc};
use comradarr_types::{FailureCategory, Outcome, RegistryState, SearchRegistry, SearchType, MAX_ATTEMPTS, MAX_BACKLOG_TIER};

/// Base cooldown duration for backlog tier 0..=5. Illustrative values,
/// exposed as configuration per the tiering policy's own admission.
pub const COOLDOWN_TIERS_HOURS: [i64; 6] = [6, 12, 24, 72, 168, 720];

/// Short, untiered backoff applied after a transient error/timeout that
/// doesn't bypass the retry ceiling.
pub const TRANSIENT_ERROR_BACKOFF_MINUTES: i64 = 15;

/// Cooldown duration for a given backlog tier, clamped to the table's range.
#[must_use]
pub fn cooldown_for_tier(tier: u8) -> Duration {
    let idx = (tier as usize).min(COOLDOWN_TIERS_HOURS.len() - 1);
    Duration::hours(COOLDOWN_TIERS_HOURS[idx])
}

/// The result of a completed search attempt, as reported by the dispatcher.
#[derive(Debug, Clone)]
pub enum SearchEvent {
    Success,
    /// `was_season_pack` is true when the just-completed command was a
    /// `SeasonSearch` against a `gap` row; a `no_results` outcome on such a
    /// row sets `season_pack_failed` so the batcher forces episode-granular
    /// search on the next pass.
    NoResults { was_season_pack: bool },
    Error(FailureCategory),
    Timeout,
    /// `paused_until` is the connector's throttle pause deadline at the
    /// moment of the 429, used as the row's `next_eligible`.
    RateLimited { paused_until: Option<DateTime<Utc>> },
}

/// What the transition wants recorded in the append-only history log.
#[derive(Debug, Clone)]
pub struct HistoryRecord {
    pub outcome: Outcome,
    pub category: Option<FailureCategory>,
}

/// Applies a completed search attempt's outcome to a registry row.
///
/// `row` must already be in `searching` (the caller claimed it via
/// `Store::claim_for_search` before dispatching); this function doesn't
/// re-check that precondition since it has no store access.
#[must_use]
pub fn apply_outcome(row: &SearchRegistry, event: SearchEvent, now: DateTime<Utc>) -> (SearchRegistry, HistoryRecord) {
    let mut next = row.clone();

    // Every outcome except rate_limited advances the attempt counter
    // (`SPEC_FULL.md` §4.D "outcome: rate_limited — special: do not advance attemptCount").
    if !matches!(event, SearchEvent::RateLimited { .. }) {
        next.attempt_count = row.attempt_count + 1;
    }

    let history = match event {
        SearchEvent::Success => {
            next.state = RegistryState::Cooldown;
            next.next_eligible = Some(now + cooldown_for_tier(0));
            next.backlog_tier = 0;
            next.failure_category = None;
            HistoryRecord { outcome: Outcome::Success, category: None }
        }
        SearchEvent::NoResults { was_season_pack } => {
            if was_season_pack && row.search_type == SearchType::Gap {
                next.season_pack_failed = true;
            }
            let candidate_tier = (row.backlog_tier + 1).min(MAX_BACKLOG_TIER);
            if next.attempt_count >= MAX_ATTEMPTS && candidate_tier >= MAX_BACKLOG_TIER {
                next.state = RegistryState::Exhausted;
                next.backlog_tier = MAX_BACKLOG_TIER;
                next.next_eligible = None;
            } else {
                next.state = RegistryState::Cooldown;
                next.backlog_tier = candidate_tier;
                next.next_eligible = Some(now + cooldown_for_tier(candidate_tier));
            }
            next.failure_category = None;
            HistoryRecord { outcome: Outcome::NoResults, category: None }
        }
        SearchEvent::Error(category) => {
            next.failure_category = Some(category);
            if category.bypasses_retry() {
                // Force invariant 4 (`state = exhausted ⇒ attemptCount ≥ MAX_ATTEMPTS ∧
                // backlogTier at max`) to hold even on this early-exit path.
                next.state = RegistryState::Exhausted;
                next.attempt_count = MAX_ATTEMPTS;
                next.backlog_tier = MAX_BACKLOG_TIER;
                next.next_eligible = None;
            } else {
                next.state = RegistryState::Cooldown;
                next.next_eligible = Some(now + Duration::minutes(TRANSIENT_ERROR_BACKOFF_MINUTES));
            }
            HistoryRecord { outcome: Outcome::Error, category: Some(category) }
        }
        SearchEvent::Timeout => {
            next.failure_category = Some(FailureCategory::Timeout);
            next.state = RegistryState::Cooldown;
            next.next_eligible = Some(now + Duration::minutes(TRANSIENT_ERROR_BACKOFF_MINUTES));
            HistoryRecord { outcome: Outcome::Timeout, category: Some(FailureCategory::Timeout) }
        }
        SearchEvent::RateLimited { paused_until } => {
            next.state = RegistryState::Pending;
            next.next_eligible = paused_until;
            HistoryRecord { outcome: Outcome::RateLimited, category: Some(FailureCategory::RateLimit) }
        }
    };

    (next, history)
}

/// `exhausted ──manual reset──▶ pending`. Operator-triggered; clears every
/// field the retry ceiling had accumulated.
#[must_use]
pub fn manual_reset(row: &SearchRegistry) -> SearchRegistry {
    let mut next = row.clone();
    next.state = RegistryState::Pending;
    next.attempt_count = 0;
    next.backlog_tier = 0;
    next.next_eligible = None;
    next.failure_category = None;
    next.season_pack_failed = false;
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use comradarr_types::{ConnectorId, ContentRef, EpisodeId, RegistryId, SeasonId};

    fn row(state: RegistryState, attempt_count: u32, backlog_tier: u8, search_type: SearchType) -> SearchRegistry {
        SearchRegistry {
            id: RegistryId::new(1),
            connector_id: ConnectorId::new(1),
            content: ContentRef::Episode { episode_id: EpisodeId::new(1), season_id: SeasonId::new(1) },
            search_type,
            state,
            attempt_count,
            last_searched: None,
            next_eligible: None,
            failure_category: None,
            season_pack_failed: false,
            backlog_tier,
            priority: 1000,
            discovered_at: Utc.timestamp_opt(0, 0).single().unwrap(),
        }
    }

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    #[test]
    fn success_resets_tier_and_enters_cooldown() {
        let r = row(RegistryState::Searching, 3, 2, SearchType::Gap);
        let (next, history) = apply_outcome(&r, SearchEvent::Success, ts(0));
        assert_eq!(next.state, RegistryState::Cooldown);
        assert_eq!(next.backlog_tier, 0);
        assert_eq!(next.attempt_count, 4);
        assert_eq!(next.next_eligible, Some(ts(0) + Duration::hours(6)));
        assert!(matches!(history.outcome, Outcome::Success));
    }

    #[test]
    fn no_results_advances_tier_until_exhausted() {
        let r = row(RegistryState::Searching, MAX_ATTEMPTS - 1, MAX_BACKLOG_TIER - 1, SearchType::Gap);
        let (next, _) = apply_outcome(&r, SearchEvent::NoResults { was_season_pack: false }, ts(0));
        assert_eq!(next.state, RegistryState::Exhausted);
        assert!(next.satisfies_exhausted_invariant());
    }

    #[test]
    fn season_pack_no_results_marks_fallback_flag() {
        let r = row(RegistryState::Searching, 0, 0, SearchType::Gap);
        let (next, _) = apply_outcome(&r, SearchEvent::NoResults { was_season_pack: true }, ts(0));
        assert!(next.season_pack_failed);
    }

    #[test]
    fn auth_failure_bypasses_attempt_ceiling_and_still_satisfies_invariant() {
        let r = row(RegistryState::Searching, 0, 0, SearchType::Gap);
        let (next, history) = apply_outcome(&r, SearchEvent::Error(FailureCategory::Authentication), ts(0));
        assert_eq!(next.state, RegistryState::Exhausted);
        assert!(next.satisfies_exhausted_invariant());
        assert_eq!(history.category, Some(FailureCategory::Authentication));
    }

    #[test]
    fn rate_limited_does_not_advance_attempt_count() {
        let r = row(RegistryState::Searching, 2, 0, SearchType::Gap);
        let (next, _) = apply_outcome(&r, SearchEvent::RateLimited { paused_until: Some(ts(120)) }, ts(0));
        assert_eq!(next.attempt_count, 2);
        assert_eq!(next.state, RegistryState::Pending);
        assert_eq!(next.next_eligible, Some(ts(120)));
    }

    #[test]
    fn manual_reset_clears_exhausted_row() {
        let mut r = row(RegistryState::Exhausted, MAX_ATTEMPTS, MAX_BACKLOG_TIER, SearchType::Upgrade);
        r.failure_category = Some(FailureCategory::Authentication);
        let next = manual_reset(&r);
        assert_eq!(next.state, RegistryState::Pending);
        assert_eq!(next.attempt_count, 0);
        assert!(next.failure_category.is_none());
    }
}

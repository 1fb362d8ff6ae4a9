//! Pure, deterministic priority scoring (`SPEC_FULL.md` §4.D).
//!
//! Ordering is total: `priority DESC, scheduled_at ASC`, ties broken by
//! registry id — callers own the tiebreak since this module only computes
//! the integer score.

use chrono::{DateTime, Utc};
use comradarr_types::SearchType;

pub const BASE_PRIORITY: i64 = 1000;
pub const AGE_BONUS_PER_DAY: i64 = 5;
pub const MAX_AGE_BONUS: i64 = 200;
pub const AIRING_BONUS: i64 = 150;
pub const GAP_BONUS: i64 = 100;
pub const ATTEMPT_PENALTY: i64 = 10;

/// Everything the scoring function needs about a single registry row.
#[derive(Debug, Clone, Copy)]
pub struct PriorityInputs {
    pub discovered_at: DateTime<Utc>,
    pub search_type: SearchType,
    /// True for an episode whose parent season is currently airing
    /// (`SeasonStatistics.next_airing.is_some()`); always false for movies.
    pub currently_airing: bool,
    pub attempt_count: u32,
}

/// `base + age_bonus(capped) + airing_bonus + type_bonus - attempt_penalty`.
#[must_use]
pub fn priority_score(inputs: PriorityInputs, now: DateTime<Utc>) -> i64 {
    let age_days = (now - inputs.discovered_at).num_days().max(0);
    let age_bonus = (age_days * AGE_BONUS_PER_DAY).min(MAX_AGE_BONUS);
    let airing_bonus = if inputs.currently_airing { AIRING_BONUS } else { 0 };
    let type_bonus = match inputs.search_type {
        SearchType::Gap => GAP_BONUS,
        SearchType::Upgrade => 0,
    };
    let penalty = i64::from(inputs.attempt_count) * ATTEMPT_PENALTY;
    BASE_PRIORITY + age_bonus + airing_bonus + type_bonus - penalty
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    #[test]
    fn gap_outranks_upgrade_at_same_tier() {
        let now = ts(0);
        let gap = priority_score(
            PriorityInputs { discovered_at: now, search_type: SearchType::Gap, currently_airing: false, attempt_count: 0 },
            now,
        );
        let upgrade = priority_score(
            PriorityInputs { discovered_at: now, search_type: SearchType::Upgrade, currently_airing: false, attempt_count: 0 },
            now,
        );
        assert!(gap > upgrade);
    }

    #[test]
    fn older_discovery_scores_at_least_as_high() {
        let now = ts(0);
        let old = priority_score(
            PriorityInputs { discovered_at: now - Duration::days(10), search_type: SearchType::Gap, currently_airing: false, attempt_count: 0 },
            now,
        );
        let fresh = priority_score(
            PriorityInputs { discovered_at: now, search_type: SearchType::Gap, currently_airing: false, attempt_count: 0 },
            now,
        );
        assert!(old >= fresh);
    }

    proptest! {
        #[test]
        fn score_is_pure_and_deterministic(
            age_secs in 0i64..10_000_000,
            is_gap in any::<bool>(),
            airing in any::<bool>(),
            attempts in 0u32..50,
        ) {
            let now = ts(10_000_000);
            let inputs = PriorityInputs {
                discovered_at: now - Duration::seconds(age_secs),
                search_type: if is_gap { SearchType::Gap } else { SearchType::Upgrade },
                currently_airing: airing,
                attempt_count: attempts,
            };
            let a = priority_score(inputs, now);
            let b = priority_score(inputs, now);
            prop_assert_eq!(a, b);
        }
    }
}

//! Progress computation.
//!
//! `on_challenge_completed` is invoked by the challenge write path once per
//! incomplete-to-complete transition. Each achievement family recomputes its
//! current value from completion history rather than incrementing, so a
//! duplicate invocation converges on the same value instead of
//! double-counting.

use std::sync::Arc;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Timelike, Utc, Weekday};
use tracing::{debug, warn};
use uuid::Uuid;

use super::catalog::Catalog;
use super::family::AchievementFamily;
use super::manager::ProgressManager;
use super::{AchievementDefinition, AchievementError, CompletionFact};
use crate::storage::{Database, EngineConfig};

/// Local hour before which a completion counts as "early riser".
const EARLY_HOUR_END: u32 = 8;
/// Local hour from which a completion counts as "night owl".
const NIGHT_HOUR_START: u32 = 21;

/// Recomputes achievement progress values after each challenge completion.
pub struct ProgressCalculator {
    db: Arc<Database>,
    catalog: Arc<Catalog>,
    config: EngineConfig,
    manager: ProgressManager,
}

impl ProgressCalculator {
    /// Create a calculator over the given store and catalog.
    pub fn new(db: Arc<Database>, catalog: Arc<Catalog>, config: EngineConfig) -> Self {
        let manager = ProgressManager::new(Arc::clone(&db));
        Self {
            db,
            catalog,
            config,
            manager,
        }
    }

    /// The manager used for persistence, for callers that also serve the
    /// read path.
    pub fn manager(&self) -> &ProgressManager {
        &self.manager
    }

    /// Handle a challenge completion for a user.
    ///
    /// Evaluates every catalog achievement. A failure computing or storing
    /// one achievement is logged and skipped; only a failure to read the
    /// completion history at all fails the whole call, in which case the
    /// event counts as undelivered.
    pub fn on_challenge_completed(
        &self,
        user_id: Uuid,
        fact: &CompletionFact,
    ) -> Result<(), AchievementError> {
        let Some(trigger) = fact.completed_date else {
            debug!(user = %user_id, "Ignoring completion event for incomplete fact");
            return Ok(());
        };

        let history = self.db.completed_facts(user_id)?;

        for definition in self.catalog.definitions() {
            if let Err(e) = self.evaluate(definition, user_id, trigger, &history) {
                let e = AchievementError::Computation {
                    key: definition.key.clone(),
                    user_id,
                    message: e.to_string(),
                };
                warn!(
                    achievement = %definition.key,
                    user = %user_id,
                    error = %e,
                    "Achievement evaluation failed, continuing with the rest"
                );
            }
        }

        Ok(())
    }

    /// Recompute one achievement and persist the new value.
    fn evaluate(
        &self,
        definition: &AchievementDefinition,
        user_id: Uuid,
        trigger: DateTime<Utc>,
        history: &[CompletionFact],
    ) -> Result<(), AchievementError> {
        let family = AchievementFamily::classify(&definition.key)?;
        let offset = self.config.offset();

        let value = match family {
            AchievementFamily::Cumulative => history.len() as u32,
            AchievementFamily::Streak => streak_length(history, offset),
            AchievementFamily::BadgeCollection => self.db.count_distinct_badges(user_id)?,
            AchievementFamily::Weekend => {
                // Only worth recomputing when the trigger itself qualifies
                if !is_weekend(local_date(trigger, offset)) {
                    return Ok(());
                }
                count_matching(history, offset, |dt| is_weekend(dt.date_naive()))
            }
            AchievementFamily::EarlyRiser => {
                if local_hour(trigger, offset) >= EARLY_HOUR_END {
                    return Ok(());
                }
                count_matching(history, offset, |dt| dt.hour() < EARLY_HOUR_END)
            }
            AchievementFamily::NightOwl => {
                if local_hour(trigger, offset) < NIGHT_HOUR_START {
                    return Ok(());
                }
                count_matching(history, offset, |dt| dt.hour() >= NIGHT_HOUR_START)
            }
            AchievementFamily::SameDay => {
                let today = local_date(trigger, offset);
                count_matching(history, offset, |dt| dt.date_naive() == today)
            }
        };

        self.manager
            .update_progress(&definition.key, user_id, value)?;

        Ok(())
    }
}

/// Count completed facts whose local completion time satisfies a predicate.
fn count_matching<F>(history: &[CompletionFact], offset: FixedOffset, predicate: F) -> u32
where
    F: Fn(&DateTime<FixedOffset>) -> bool,
{
    history
        .iter()
        .filter_map(|fact| fact.completed_date)
        .map(|dt| dt.with_timezone(&offset))
        .filter(|dt| predicate(dt))
        .count() as u32
}

/// Length of the run of consecutive local calendar days ending at the most
/// recent completion. Multiple completions on the same day collapse to one
/// day: a repeat neither extends nor breaks the streak.
pub(crate) fn streak_length(history: &[CompletionFact], offset: FixedOffset) -> u32 {
    let mut days: Vec<NaiveDate> = history
        .iter()
        .filter_map(|fact| fact.completed_date)
        .map(|dt| local_date(dt, offset))
        .collect();

    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();

    let mut iter = days.into_iter();
    let Some(mut last) = iter.next() else {
        return 0;
    };

    let mut streak = 1;
    for day in iter {
        if last.signed_duration_since(day).num_days() == 1 {
            streak += 1;
            last = day;
        } else {
            break;
        }
    }

    streak
}

fn local_date(dt: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    dt.with_timezone(&offset).date_naive()
}

fn local_hour(dt: DateTime<Utc>, offset: FixedOffset) -> u32 {
    dt.with_timezone(&offset).hour()
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn completed(when: DateTime<Utc>) -> CompletionFact {
        CompletionFact::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), 3).completed_at(when)
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn utc_offset() -> FixedOffset {
        EngineConfig::default().offset()
    }

    #[test]
    fn test_streak_empty_history() {
        assert_eq!(streak_length(&[], utc_offset()), 0);
    }

    #[test]
    fn test_streak_consecutive_days() {
        let history = vec![
            completed(at(2024, 1, 3, 9, 0)),
            completed(at(2024, 1, 2, 18, 0)),
            completed(at(2024, 1, 1, 12, 0)),
        ];
        assert_eq!(streak_length(&history, utc_offset()), 3);
    }

    #[test]
    fn test_streak_resets_on_gap() {
        // 01-01..01-03 then a gap to 01-05: the run ending at the latest
        // date is length 1
        let history = vec![
            completed(at(2024, 1, 5, 9, 0)),
            completed(at(2024, 1, 3, 9, 0)),
            completed(at(2024, 1, 2, 9, 0)),
            completed(at(2024, 1, 1, 9, 0)),
        ];
        assert_eq!(streak_length(&history, utc_offset()), 1);
    }

    #[test]
    fn test_streak_same_day_repeat_counts_once() {
        let history = vec![
            completed(at(2024, 1, 2, 20, 0)),
            completed(at(2024, 1, 2, 9, 0)),
            completed(at(2024, 1, 1, 9, 0)),
        ];
        assert_eq!(streak_length(&history, utc_offset()), 2);
    }

    #[test]
    fn test_streak_unsorted_input() {
        let history = vec![
            completed(at(2024, 1, 1, 9, 0)),
            completed(at(2024, 1, 3, 9, 0)),
            completed(at(2024, 1, 2, 9, 0)),
        ];
        assert_eq!(streak_length(&history, utc_offset()), 3);
    }

    #[test]
    fn test_streak_respects_local_midnight() {
        // 23:30 UTC on the 1st is already the 2nd at UTC+2, so both
        // completions land on consecutive local days only under UTC
        let history = vec![
            completed(at(2024, 1, 2, 23, 30)),
            completed(at(2024, 1, 1, 23, 30)),
        ];
        assert_eq!(streak_length(&history, utc_offset()), 2);

        let plus_two = EngineConfig::new(120).offset();
        // Locally these are 01:30 on the 3rd and 01:30 on the 2nd
        assert_eq!(streak_length(&history, plus_two), 2);

        let same_local_day = vec![
            completed(at(2024, 1, 1, 23, 30)), // 2nd, 01:30 local
            completed(at(2024, 1, 2, 10, 0)),  // 2nd, 12:00 local
        ];
        assert_eq!(streak_length(&same_local_day, plus_two), 1);
    }

    #[test]
    fn test_weekend_predicate() {
        // 2024-01-06 is a Saturday, 2024-01-09 a Tuesday
        assert!(is_weekend(at(2024, 1, 6, 10, 0).date_naive()));
        assert!(is_weekend(at(2024, 1, 7, 10, 0).date_naive()));
        assert!(!is_weekend(at(2024, 1, 9, 10, 0).date_naive()));
    }

    #[test]
    fn test_count_matching_hour_window() {
        let history = vec![
            completed(at(2024, 1, 1, 7, 30)),  // early
            completed(at(2024, 1, 2, 7, 59)),  // early
            completed(at(2024, 1, 3, 8, 0)),   // not early
            completed(at(2024, 1, 4, 21, 0)),  // night
            completed(at(2024, 1, 5, 20, 59)), // not night
        ];
        let offset = utc_offset();
        assert_eq!(
            count_matching(&history, offset, |dt| dt.hour() < EARLY_HOUR_END),
            2
        );
        assert_eq!(
            count_matching(&history, offset, |dt| dt.hour() >= NIGHT_HOUR_START),
            1
        );
    }

    #[test]
    fn test_hour_window_uses_configured_offset() {
        // 06:30 UTC is 08:30 at UTC+2: early under UTC, not under UTC+2
        let history = vec![completed(at(2024, 1, 1, 6, 30))];
        assert_eq!(
            count_matching(&history, utc_offset(), |dt| dt.hour() < EARLY_HOUR_END),
            1
        );
        let plus_two = EngineConfig::new(120).offset();
        assert_eq!(
            count_matching(&history, plus_two, |dt| dt.hour() < EARLY_HOUR_END),
            0
        );
    }
}

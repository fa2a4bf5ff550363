//! Achievement family classification.
//!
//! Every catalog key maps to exactly one computation family. Classification
//! happens by key pattern and is validated at catalog load, so an
//! unrecognized key fails fast instead of being silently skipped at
//! event time.

use super::AchievementError;

/// The computation strategy an achievement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AchievementFamily {
    /// Total count of completed challenges (`COMPLETE_*`)
    Cumulative,
    /// Consecutive calendar days with a completion (`STREAK_*`)
    Streak,
    /// Distinct badge icons ever awarded (`COLLECT_*`)
    BadgeCollection,
    /// Completions on Saturday or Sunday (`WEEKEND_*`)
    Weekend,
    /// Completions before 08:00 local (`EARLY_RISER_*`)
    EarlyRiser,
    /// Completions at or after 21:00 local (`NIGHT_OWL_*`)
    NightOwl,
    /// Completions within the current local day (`TWO_CHALLENGES_ONE_DAY`)
    SameDay,
}

impl AchievementFamily {
    /// Classify an achievement key into its family.
    pub fn classify(key: &str) -> Result<Self, AchievementError> {
        if key == "TWO_CHALLENGES_ONE_DAY" {
            return Ok(Self::SameDay);
        }
        if key.starts_with("COMPLETE_") {
            return Ok(Self::Cumulative);
        }
        if key.starts_with("STREAK_") {
            return Ok(Self::Streak);
        }
        if key.starts_with("COLLECT_") {
            return Ok(Self::BadgeCollection);
        }
        if key.starts_with("WEEKEND_") {
            return Ok(Self::Weekend);
        }
        if key.starts_with("EARLY_RISER_") {
            return Ok(Self::EarlyRiser);
        }
        if key.starts_with("NIGHT_OWL_") {
            return Ok(Self::NightOwl);
        }
        Err(AchievementError::UnknownFamily(key.to_string()))
    }
}

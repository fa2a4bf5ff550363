//! Achievement progress engine.
//!
//! Turns "challenge completed" facts into per-user, per-achievement progress
//! counters. The calculator recomputes each achievement's current value from
//! history, and the manager owns the persistence invariants.

pub mod calculator;
pub mod catalog;
pub mod family;
pub mod manager;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::storage::DatabaseError;

/// An achievement definition from the catalog.
///
/// Loaded once at startup and immutable afterward. The `reward_icon` and
/// `reward` fields are opaque payout metadata the calculator never inspects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementDefinition {
    /// Stable uppercase identifier, unique (e.g. `STREAK_7_DAYS`)
    pub key: String,
    /// Display name
    pub name: String,
    /// Description
    pub description: String,
    /// Progress at or above this value means completed
    pub target: u32,
    /// Icon shown next to the reward
    pub reward_icon: String,
    /// Reward text
    pub reward: String,
}

impl AchievementDefinition {
    /// Create a new definition.
    pub fn new(key: &str, name: &str, description: &str, target: u32) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            target,
            reward_icon: String::new(),
            reward: String::new(),
        }
    }

    /// Attach reward metadata.
    pub fn with_reward(mut self, icon: &str, reward: &str) -> Self {
        self.reward_icon = icon.to_string();
        self.reward = reward.to_string();
        self
    }
}

/// Denormalized copy of an achievement definition, frozen onto a progress
/// record at creation time.
///
/// Deliberately a copy, not a reference: editing the catalog later must not
/// retroactively change what a user already sees on their progress cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementSnapshot {
    pub key: String,
    pub name: String,
    pub description: String,
    pub target: u32,
    pub reward_icon: String,
    pub reward: String,
}

impl From<&AchievementDefinition> for AchievementSnapshot {
    fn from(def: &AchievementDefinition) -> Self {
        Self {
            key: def.key.clone(),
            name: def.name.clone(),
            description: def.description.clone(),
            target: def.target,
            reward_icon: def.reward_icon.clone(),
            reward: def.reward.clone(),
        }
    }
}

/// A user's progress toward one achievement.
///
/// Exactly one record exists per `(user_id, achievement.key)` pair for the
/// lifetime of the account, enforced by a unique index in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAchievementProgress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub achievement: AchievementSnapshot,
    /// Current computed value, overwritten absolutely on each recomputation
    pub progress: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserAchievementProgress {
    /// Create a fresh zero-progress record for a user.
    pub fn new(user_id: Uuid, definition: &AchievementDefinition) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            achievement: definition.into(),
            progress: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the target threshold has been crossed.
    pub fn is_completed(&self) -> bool {
        self.progress >= self.achievement.target
    }

    /// Progress percentage (0..100) for display.
    pub fn percentage(&self) -> f32 {
        if self.achievement.target == 0 {
            return 100.0;
        }
        ((self.progress as f32 / self.achievement.target as f32) * 100.0).min(100.0)
    }
}

/// The immutable fact that a user finished one dog's instance of a challenge.
///
/// Read-only to this subsystem: the challenge write path sets
/// `completed_date` exactly once, and there is no un-completion path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionFact {
    pub id: Uuid,
    pub user_id: Uuid,
    pub dog_id: Uuid,
    pub challenge_id: Uuid,
    /// Set the moment progress reaches goal; `None` while in progress
    pub completed_date: Option<DateTime<Utc>>,
    pub progress_current: u32,
    pub progress_goal: u32,
}

impl CompletionFact {
    /// Create an in-progress fact.
    pub fn new(user_id: Uuid, dog_id: Uuid, challenge_id: Uuid, goal: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            dog_id,
            challenge_id,
            completed_date: None,
            progress_current: 0,
            progress_goal: goal,
        }
    }

    /// Mark the fact completed at the given moment.
    pub fn completed_at(mut self, when: DateTime<Utc>) -> Self {
        self.progress_current = self.progress_goal;
        self.completed_date = Some(when);
        self
    }

    /// A fact is complete iff its completion date has been set.
    pub fn is_complete(&self) -> bool {
        self.completed_date.is_some()
    }
}

/// Achievement engine errors.
#[derive(Debug, Error)]
pub enum AchievementError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Progress record already exists: {0}")]
    Conflict(String),

    #[error("Unrecognized achievement key: {0}")]
    UnknownFamily(String),

    #[error("Computing {key} for user {user_id} failed: {message}")]
    Computation {
        key: String,
        user_id: Uuid,
        message: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_progress_completion_threshold() {
        let def = AchievementDefinition::new("COMPLETE_5_CHALLENGES", "High Five", "x", 5);
        let mut record = UserAchievementProgress::new(Uuid::new_v4(), &def);

        assert!(!record.is_completed());
        assert_eq!(record.percentage(), 0.0);

        record.progress = 4;
        assert!(!record.is_completed());
        assert_eq!(record.percentage(), 80.0);

        record.progress = 5;
        assert!(record.is_completed());

        record.progress = 9;
        assert_eq!(record.percentage(), 100.0);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut def = AchievementDefinition::new("STREAK_3_DAYS", "On a Roll", "x", 3)
            .with_reward("🔥", "Free treat bag");
        let record = UserAchievementProgress::new(Uuid::new_v4(), &def);

        def.name = "Renamed Later".to_string();
        def.target = 30;

        assert_eq!(record.achievement.name, "On a Roll");
        assert_eq!(record.achievement.target, 3);
        assert_eq!(record.achievement.reward_icon, "🔥");
    }

    #[test]
    fn test_completion_fact_lifecycle() {
        let fact = CompletionFact::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), 7);
        assert!(!fact.is_complete());

        let when = Utc.with_ymd_and_hms(2024, 1, 6, 7, 30, 0).unwrap();
        let fact = fact.completed_at(when);
        assert!(fact.is_complete());
        assert_eq!(fact.progress_current, fact.progress_goal);
        assert_eq!(fact.completed_date, Some(when));
    }

    #[test]
    fn test_progress_wire_shape() {
        let def = AchievementDefinition::new("COLLECT_5_BADGES", "Collector", "x", 5)
            .with_reward("🏆", "Sticker pack");
        let record = UserAchievementProgress::new(Uuid::new_v4(), &def);

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("userId").is_some());
        assert_eq!(json["achievement"]["key"], "COLLECT_5_BADGES");
        assert_eq!(json["achievement"]["rewardIcon"], "🏆");
        assert_eq!(json["progress"], 0);
    }
}

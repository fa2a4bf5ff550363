//! Achievement catalog.
//!
//! The catalog is a static, validated list of achievement definitions.
//! Seeding the database from it is an explicit idempotent step run once at
//! deployment, decoupled from request handling.

use std::collections::HashSet;

use super::family::AchievementFamily;
use super::{AchievementDefinition, AchievementError};
use crate::storage::Database;

/// Validated, immutable collection of achievement definitions.
#[derive(Debug)]
pub struct Catalog {
    definitions: Vec<AchievementDefinition>,
}

impl Catalog {
    /// Build a catalog, validating that every key is unique and classifies
    /// into a known family. Fails fast on the first bad definition.
    pub fn new(definitions: Vec<AchievementDefinition>) -> Result<Self, AchievementError> {
        let mut seen = HashSet::new();
        for def in &definitions {
            AchievementFamily::classify(&def.key)?;
            if !seen.insert(def.key.clone()) {
                return Err(AchievementError::Conflict(format!(
                    "Duplicate catalog key: {}",
                    def.key
                )));
            }
        }
        Ok(Self { definitions })
    }

    /// Build the catalog from what is already seeded in the database.
    pub fn load(db: &Database) -> Result<Self, AchievementError> {
        Self::new(db.list_achievements()?)
    }

    /// All definitions.
    pub fn definitions(&self) -> &[AchievementDefinition] {
        &self.definitions
    }

    /// Look up a definition by key.
    pub fn get(&self, key: &str) -> Option<&AchievementDefinition> {
        self.definitions.iter().find(|d| d.key == key)
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Seed the catalog table if it is empty. Returns the number of
    /// definitions inserted (zero when already seeded).
    pub fn seed(&self, db: &Database) -> Result<usize, AchievementError> {
        if db.count_achievements()? > 0 {
            tracing::debug!("Achievement catalog already seeded, skipping");
            return Ok(0);
        }

        for def in &self.definitions {
            db.insert_achievement(def)?;
        }

        tracing::info!("Seeded achievement catalog with {} definitions", self.len());
        Ok(self.len())
    }
}

/// The standard PawQuest achievement catalog.
pub fn default_definitions() -> Vec<AchievementDefinition> {
    let mut definitions = Vec::new();

    definitions.extend(cumulative_achievements());
    definitions.extend(streak_achievements());
    definitions.extend(badge_achievements());
    definitions.extend(windowed_achievements());

    definitions
}

fn cumulative_achievements() -> Vec<AchievementDefinition> {
    vec![
        AchievementDefinition::new(
            "COMPLETE_1_CHALLENGES",
            "First Fetch",
            "Complete your first challenge with any of your dogs",
            1,
        )
        .with_reward("🐾", "Welcome sticker"),
        AchievementDefinition::new(
            "COMPLETE_5_CHALLENGES",
            "Warming Up",
            "Complete 5 challenges",
            5,
        )
        .with_reward("🦴", "5% off chew toys"),
        AchievementDefinition::new(
            "COMPLETE_10_CHALLENGES",
            "Pack Leader",
            "Complete 10 challenges",
            10,
        )
        .with_reward("🎖️", "10% off treats"),
        AchievementDefinition::new(
            "COMPLETE_25_CHALLENGES",
            "Top Dog",
            "Complete 25 challenges",
            25,
        )
        .with_reward("👑", "Free grooming session"),
    ]
}

fn streak_achievements() -> Vec<AchievementDefinition> {
    vec![
        AchievementDefinition::new(
            "STREAK_3_DAYS",
            "On a Roll",
            "Complete a challenge 3 days in a row",
            3,
        )
        .with_reward("🔥", "Bonus treat sample"),
        AchievementDefinition::new(
            "STREAK_7_DAYS",
            "Week of Walkies",
            "Complete a challenge 7 days in a row",
            7,
        )
        .with_reward("🌟", "Free leash upgrade"),
    ]
}

fn badge_achievements() -> Vec<AchievementDefinition> {
    vec![
        AchievementDefinition::new(
            "COLLECT_5_BADGES",
            "Badge Collector",
            "Collect 5 different badges",
            5,
        )
        .with_reward("🏆", "Sticker pack"),
        AchievementDefinition::new(
            "COLLECT_10_BADGES",
            "Trophy Case",
            "Collect 10 different badges",
            10,
        )
        .with_reward("🥇", "Premium month on us"),
    ]
}

fn windowed_achievements() -> Vec<AchievementDefinition> {
    vec![
        AchievementDefinition::new(
            "WEEKEND_5_EXPLORE",
            "Weekend Explorer",
            "Complete 5 challenges on weekends",
            5,
        )
        .with_reward("🗺️", "Trail map bundle"),
        AchievementDefinition::new(
            "EARLY_RISER_5_DAYS",
            "Early Riser",
            "Complete 5 challenges before 8 in the morning",
            5,
        )
        .with_reward("🌅", "Morning walk kit"),
        AchievementDefinition::new(
            "NIGHT_OWL_5_NIGHTS",
            "Night Owl",
            "Complete 5 challenges after 9 in the evening",
            5,
        )
        .with_reward("🦉", "Reflective collar tag"),
        AchievementDefinition::new(
            "TWO_CHALLENGES_ONE_DAY",
            "Double Trouble",
            "Complete 2 challenges in a single day",
            2,
        )
        .with_reward("⚡", "Energy treat duo"),
    ]
}

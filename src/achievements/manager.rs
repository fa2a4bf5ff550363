//! Progress record persistence.
//!
//! The manager is a stateless façade over the progress store. It owns the
//! provisioning and uniqueness invariants: one record per
//! `(user_id, achievement key)` pair, created once and never deleted.

use std::sync::Arc;

use tracing::{debug, error, warn};
use uuid::Uuid;

use super::{AchievementError, UserAchievementProgress};
use crate::storage::{Database, DatabaseError};

/// Manager for user achievement progress records.
pub struct ProgressManager {
    db: Arc<Database>,
}

impl ProgressManager {
    /// Create a new progress manager.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a zero-progress record for one achievement.
    ///
    /// Fails with `NotFound` if the key is not in the seeded catalog, and
    /// with `Conflict` if the record already exists. The conflict comes from
    /// the store's unique index, not a pre-check, so two racing creates
    /// cannot both succeed.
    pub fn create_progress(
        &self,
        achievement_key: &str,
        user_id: Uuid,
    ) -> Result<UserAchievementProgress, AchievementError> {
        let definition = self
            .db
            .get_achievement(achievement_key)?
            .ok_or_else(|| AchievementError::NotFound(format!("Achievement {}", achievement_key)))?;

        let record = UserAchievementProgress::new(user_id, &definition);

        self.db.insert_progress(&record).map_err(|e| match e {
            DatabaseError::ConstraintViolation(_) => AchievementError::Conflict(format!(
                "Progress for {} / {}",
                user_id, achievement_key
            )),
            other => AchievementError::Database(other),
        })?;

        Ok(record)
    }

    /// Overwrite the progress value for one achievement.
    ///
    /// Every user is provisioned with a record per catalog entry, so a
    /// missing record here is an invariant violation upstream. It is
    /// surfaced as `NotFound` and never auto-created, which would only mask
    /// the missing provisioning step.
    pub fn update_progress(
        &self,
        achievement_key: &str,
        user_id: Uuid,
        value: u32,
    ) -> Result<UserAchievementProgress, AchievementError> {
        let rows = self
            .db
            .update_progress_value(user_id, achievement_key, value)?;

        if rows == 0 {
            error!(
                achievement = achievement_key,
                user = %user_id,
                "No progress record to update; user was never provisioned for this achievement"
            );
            return Err(AchievementError::NotFound(format!(
                "Progress for {} / {}",
                user_id, achievement_key
            )));
        }

        self.db
            .get_progress(user_id, achievement_key)?
            .ok_or_else(|| {
                AchievementError::NotFound(format!(
                    "Progress for {} / {}",
                    user_id, achievement_key
                ))
            })
    }

    /// All progress records for a user. No ordering is guaranteed; callers
    /// sort by need.
    pub fn list_progress(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<UserAchievementProgress>, AchievementError> {
        Ok(self.db.list_progress(user_id)?)
    }

    /// Provision a new user with one record per catalog entry.
    ///
    /// Per-definition failures are absorbed: `Conflict` means the record
    /// already exists (idempotent re-invocation), anything else is logged
    /// and skipped. A result list shorter than the catalog means "partially
    /// provisioned, retry later", not success.
    pub fn provision_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<UserAchievementProgress>, AchievementError> {
        let definitions = self.db.list_achievements()?;
        let mut records = Vec::with_capacity(definitions.len());

        for definition in &definitions {
            match self.create_progress(&definition.key, user_id) {
                Ok(record) => records.push(record),
                Err(AchievementError::Conflict(_)) => {
                    debug!(
                        achievement = %definition.key,
                        user = %user_id,
                        "Progress record already exists, skipping"
                    );
                }
                Err(e) => {
                    warn!(
                        achievement = %definition.key,
                        user = %user_id,
                        error = %e,
                        "Failed to provision progress record, skipping"
                    );
                }
            }
        }

        Ok(records)
    }
}

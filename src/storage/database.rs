//! Database operations using rusqlite.
//!
//! Single point of access to the four tables: the achievement catalog, the
//! per-user progress records, the challenge completion facts, and the badge
//! award ledger. The `(user_id, achievement_key)` uniqueness invariant is
//! enforced here by the store's unique index, not by application locking.

use crate::achievements::{
    AchievementDefinition, AchievementSnapshot, CompletionFact, UserAchievementProgress,
};
use crate::storage::schema::{CURRENT_VERSION, SCHEMA, SCHEMA_VERSION_TABLE};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, Result as SqliteResult};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Database wrapper for SQLite operations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create a database at the given path.
    pub fn open(path: &PathBuf) -> Result<Self, DatabaseError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::IoError(e.to_string()))?;
        }

        let conn =
            Connection::open(path).map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        let db = Self { conn };
        db.initialize()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        let db = Self { conn };
        db.initialize()?;

        Ok(db)
    }

    /// Initialize the database schema.
    fn initialize(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(SCHEMA_VERSION_TABLE)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

        let current_version = self.get_schema_version()?;

        if current_version < CURRENT_VERSION {
            self.migrate(current_version)?;
        }

        Ok(())
    }

    /// Get the current schema version.
    fn get_schema_version(&self) -> Result<i32, DatabaseError> {
        let result: SqliteResult<i32> = self.conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        );

        match result {
            Ok(version) => Ok(version),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
            Err(e) => Err(DatabaseError::QueryFailed(e.to_string())),
        }
    }

    /// Run database migrations.
    fn migrate(&self, from_version: i32) -> Result<(), DatabaseError> {
        if from_version < 1 {
            self.conn
                .execute_batch(SCHEMA)
                .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

            self.conn
                .execute(
                    "INSERT INTO schema_version (version, applied_at) VALUES (?, datetime('now'))",
                    [CURRENT_VERSION],
                )
                .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

            tracing::info!("Database migrated to version {}", CURRENT_VERSION);
        }

        // Future migrations would go here:
        // if from_version < 2 { ... }

        Ok(())
    }

    /// Get a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    // ========== Achievement Catalog Operations ==========

    /// Insert an achievement definition into the catalog table.
    pub fn insert_achievement(&self, def: &AchievementDefinition) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                "INSERT INTO achievements (key, name, description, target, reward_icon, reward)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    def.key,
                    def.name,
                    def.description,
                    def.target,
                    def.reward_icon,
                    def.reward,
                ],
            )
            .map_err(map_sqlite_error)?;

        Ok(())
    }

    /// Get an achievement definition by key.
    pub fn get_achievement(&self, key: &str) -> Result<Option<AchievementDefinition>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT key, name, description, target, reward_icon, reward
                 FROM achievements WHERE key = ?1",
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let result = stmt.query_row(params![key], map_achievement_row);

        match result {
            Ok(def) => Ok(Some(def)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::QueryFailed(e.to_string())),
        }
    }

    /// Get all achievement definitions, ordered by key.
    pub fn list_achievements(&self) -> Result<Vec<AchievementDefinition>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT key, name, description, target, reward_icon, reward
                 FROM achievements ORDER BY key",
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map([], map_achievement_row)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let mut definitions = Vec::new();
        for row in rows {
            definitions.push(row.map_err(|e| DatabaseError::QueryFailed(e.to_string()))?);
        }

        Ok(definitions)
    }

    /// Count achievement definitions in the catalog.
    pub fn count_achievements(&self) -> Result<usize, DatabaseError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM achievements", [], |row| row.get(0))
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(count as usize)
    }

    // ========== Progress Record Operations ==========

    /// Insert a new progress record.
    ///
    /// A second insert for the same `(user_id, achievement_key)` pair fails
    /// with `ConstraintViolation` from the unique index; callers rely on that
    /// rather than a check-then-insert race.
    pub fn insert_progress(&self, record: &UserAchievementProgress) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                "INSERT INTO user_achievement_progress
                 (id, user_id, achievement_key, achievement_name, achievement_description,
                  achievement_target, achievement_reward_icon, achievement_reward,
                  progress, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.id.to_string(),
                    record.user_id.to_string(),
                    record.achievement.key,
                    record.achievement.name,
                    record.achievement.description,
                    record.achievement.target,
                    record.achievement.reward_icon,
                    record.achievement.reward,
                    record.progress,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )
            .map_err(map_sqlite_error)?;

        Ok(())
    }

    /// Get a user's progress record for one achievement.
    pub fn get_progress(
        &self,
        user_id: Uuid,
        achievement_key: &str,
    ) -> Result<Option<UserAchievementProgress>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, user_id, achievement_key, achievement_name, achievement_description,
                 achievement_target, achievement_reward_icon, achievement_reward,
                 progress, created_at, updated_at
                 FROM user_achievement_progress WHERE user_id = ?1 AND achievement_key = ?2",
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let result = stmt.query_row(params![user_id.to_string(), achievement_key], map_progress_row);

        match result {
            Ok(row) => Ok(Some(row.into_progress()?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::QueryFailed(e.to_string())),
        }
    }

    /// Get all progress records for a user. No ordering is guaranteed.
    pub fn list_progress(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<UserAchievementProgress>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, user_id, achievement_key, achievement_name, achievement_description,
                 achievement_target, achievement_reward_icon, achievement_reward,
                 progress, created_at, updated_at
                 FROM user_achievement_progress WHERE user_id = ?1",
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map(params![user_id.to_string()], map_progress_row)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let mut records = Vec::new();
        for row in rows {
            let row = row.map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            records.push(row.into_progress()?);
        }

        Ok(records)
    }

    /// Overwrite the progress value for a `(user_id, achievement_key)` pair.
    ///
    /// Absolute set, not increment: concurrent recomputations resolve as
    /// last-write-wins. Returns the number of rows updated; zero means the
    /// record was never provisioned.
    pub fn update_progress_value(
        &self,
        user_id: Uuid,
        achievement_key: &str,
        value: u32,
    ) -> Result<usize, DatabaseError> {
        let rows_affected = self
            .conn
            .execute(
                "UPDATE user_achievement_progress SET progress = ?3, updated_at = ?4
                 WHERE user_id = ?1 AND achievement_key = ?2",
                params![
                    user_id.to_string(),
                    achievement_key,
                    value,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(rows_affected)
    }

    // ========== Completion Fact Operations ==========

    /// Record a challenge completion fact.
    ///
    /// Called by the challenge write path; this subsystem otherwise only
    /// reads these rows.
    pub fn record_completion(&self, fact: &CompletionFact) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                "INSERT INTO challenge_completions
                 (id, user_id, dog_id, challenge_id, completed_date, progress_current, progress_goal)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    fact.id.to_string(),
                    fact.user_id.to_string(),
                    fact.dog_id.to_string(),
                    fact.challenge_id.to_string(),
                    fact.completed_date.map(|dt| dt.to_rfc3339()),
                    fact.progress_current,
                    fact.progress_goal,
                ],
            )
            .map_err(map_sqlite_error)?;

        Ok(())
    }

    /// Get all of a user's *completed* facts, most recent completion first.
    pub fn completed_facts(&self, user_id: Uuid) -> Result<Vec<CompletionFact>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, user_id, dog_id, challenge_id, completed_date, progress_current, progress_goal
                 FROM challenge_completions
                 WHERE user_id = ?1 AND completed_date IS NOT NULL
                 ORDER BY completed_date DESC",
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map(params![user_id.to_string()], |row| {
                Ok(CompletionRow {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    dog_id: row.get(2)?,
                    challenge_id: row.get(3)?,
                    completed_date: row.get(4)?,
                    progress_current: row.get(5)?,
                    progress_goal: row.get(6)?,
                })
            })
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let mut facts = Vec::new();
        for row in rows {
            let row = row.map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            facts.push(row.into_fact()?);
        }

        Ok(facts)
    }

    // ========== Badge Ledger Operations ==========

    /// Record a badge award. Written by the badge collaborator on completion.
    pub fn record_badge_award(
        &self,
        user_id: Uuid,
        icon: &str,
        awarded_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                "INSERT INTO badge_awards (id, user_id, icon, awarded_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    Uuid::new_v4().to_string(),
                    user_id.to_string(),
                    icon,
                    awarded_at.to_rfc3339(),
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    /// Count the distinct badge icons ever awarded to a user.
    pub fn count_distinct_badges(&self, user_id: Uuid) -> Result<u32, DatabaseError> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(DISTINCT icon) FROM badge_awards WHERE user_id = ?1",
                params![user_id.to_string()],
                |row| row.get(0),
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(count as u32)
    }
}

/// Map a rusqlite error, surfacing unique-index violations distinctly.
fn map_sqlite_error(e: rusqlite::Error) -> DatabaseError {
    match &e {
        rusqlite::Error::SqliteFailure(err, msg)
            if err.code == ErrorCode::ConstraintViolation =>
        {
            DatabaseError::ConstraintViolation(msg.clone().unwrap_or_else(|| e.to_string()))
        }
        _ => DatabaseError::QueryFailed(e.to_string()),
    }
}

fn map_achievement_row(row: &rusqlite::Row) -> rusqlite::Result<AchievementDefinition> {
    Ok(AchievementDefinition {
        key: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        target: row.get(3)?,
        reward_icon: row.get(4)?,
        reward: row.get(5)?,
    })
}

fn map_progress_row(row: &rusqlite::Row) -> rusqlite::Result<ProgressRow> {
    Ok(ProgressRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        achievement_key: row.get(2)?,
        achievement_name: row.get(3)?,
        achievement_description: row.get(4)?,
        achievement_target: row.get(5)?,
        achievement_reward_icon: row.get(6)?,
        achievement_reward: row.get(7)?,
        progress: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Intermediate struct for reading progress rows from the database.
struct ProgressRow {
    id: String,
    user_id: String,
    achievement_key: String,
    achievement_name: String,
    achievement_description: String,
    achievement_target: u32,
    achievement_reward_icon: String,
    achievement_reward: String,
    progress: u32,
    created_at: String,
    updated_at: String,
}

impl ProgressRow {
    fn into_progress(self) -> Result<UserAchievementProgress, DatabaseError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| DatabaseError::DeserializationError(format!("Invalid UUID: {}", e)))?;

        let user_id = Uuid::parse_str(&self.user_id).map_err(|e| {
            DatabaseError::DeserializationError(format!("Invalid user UUID: {}", e))
        })?;

        let created_at = parse_rfc3339(&self.created_at, "created_at")?;
        let updated_at = parse_rfc3339(&self.updated_at, "updated_at")?;

        Ok(UserAchievementProgress {
            id,
            user_id,
            achievement: AchievementSnapshot {
                key: self.achievement_key,
                name: self.achievement_name,
                description: self.achievement_description,
                target: self.achievement_target,
                reward_icon: self.achievement_reward_icon,
                reward: self.achievement_reward,
            },
            progress: self.progress,
            created_at,
            updated_at,
        })
    }
}

/// Intermediate struct for reading completion fact rows from the database.
struct CompletionRow {
    id: String,
    user_id: String,
    dog_id: String,
    challenge_id: String,
    completed_date: Option<String>,
    progress_current: u32,
    progress_goal: u32,
}

impl CompletionRow {
    fn into_fact(self) -> Result<CompletionFact, DatabaseError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| DatabaseError::DeserializationError(format!("Invalid UUID: {}", e)))?;

        let user_id = Uuid::parse_str(&self.user_id).map_err(|e| {
            DatabaseError::DeserializationError(format!("Invalid user UUID: {}", e))
        })?;

        let dog_id = Uuid::parse_str(&self.dog_id)
            .map_err(|e| DatabaseError::DeserializationError(format!("Invalid dog UUID: {}", e)))?;

        let challenge_id = Uuid::parse_str(&self.challenge_id).map_err(|e| {
            DatabaseError::DeserializationError(format!("Invalid challenge UUID: {}", e))
        })?;

        let completed_date = self
            .completed_date
            .map(|s| parse_rfc3339(&s, "completed_date"))
            .transpose()?;

        Ok(CompletionFact {
            id,
            user_id,
            dog_id,
            challenge_id,
            completed_date,
            progress_current: self.progress_current,
            progress_goal: self.progress_goal,
        })
    }
}

fn parse_rfc3339(value: &str, field: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::DeserializationError(format!("Invalid {}: {}", field, e)))
}

/// Database errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

//! Database schema definitions for the PawQuest progress engine.

/// SQL schema for creating all database tables.
pub const SCHEMA: &str = r#"
-- Achievement catalog table (seeded once, read-only afterward)
CREATE TABLE IF NOT EXISTS achievements (
    key TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    target INTEGER NOT NULL,
    reward_icon TEXT NOT NULL,
    reward TEXT NOT NULL
);

-- Per-user achievement progress table.
-- Achievement fields are a denormalized copy taken at provisioning time so
-- that later catalog edits never change what a user already sees.
CREATE TABLE IF NOT EXISTS user_achievement_progress (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    achievement_key TEXT NOT NULL,
    achievement_name TEXT NOT NULL,
    achievement_description TEXT NOT NULL,
    achievement_target INTEGER NOT NULL,
    achievement_reward_icon TEXT NOT NULL,
    achievement_reward TEXT NOT NULL,
    progress INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(user_id, achievement_key)
);

CREATE INDEX IF NOT EXISTS idx_progress_user_id ON user_achievement_progress(user_id);

-- Challenge completion facts, written by the challenge write path.
-- completed_date is set exactly once, when progress reaches goal.
CREATE TABLE IF NOT EXISTS challenge_completions (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    dog_id TEXT NOT NULL,
    challenge_id TEXT NOT NULL,
    completed_date TEXT,
    progress_current INTEGER NOT NULL,
    progress_goal INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_completions_user_id ON challenge_completions(user_id);
CREATE INDEX IF NOT EXISTS idx_completions_completed ON challenge_completions(user_id, completed_date);

-- Badge award ledger, written by the badge collaborator on completion.
CREATE TABLE IF NOT EXISTS badge_awards (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    icon TEXT NOT NULL,
    awarded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_badge_awards_user_id ON badge_awards(user_id);
"#;

/// SQL for schema version tracking (migrations)
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;

/// Current schema version
pub const CURRENT_VERSION: i32 = 1;

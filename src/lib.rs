//! PawQuest - Achievement Progress Engine
//!
//! Turns "dog challenge completed" events into per-user, per-achievement
//! progress counters backed by SQLite. Streaks, time-of-day windows, weekend
//! windows, same-day multiplicities and distinct badge counts are recomputed
//! from completion history on every qualifying event.

pub mod achievements;
pub mod storage;

// Re-export commonly used types
pub use achievements::calculator::ProgressCalculator;
pub use achievements::catalog::{default_definitions, Catalog};
pub use achievements::family::AchievementFamily;
pub use achievements::manager::ProgressManager;
pub use achievements::{
    AchievementDefinition, AchievementError, AchievementSnapshot, CompletionFact,
    UserAchievementProgress,
};
pub use storage::{Database, DatabaseError, EngineConfig};

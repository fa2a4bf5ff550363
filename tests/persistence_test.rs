//! Integration tests for on-disk persistence across reopen.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use pawquest::{
    default_definitions, Catalog, CompletionFact, Database, EngineConfig, ProgressCalculator,
    ProgressManager,
};

#[test]
fn test_progress_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("data").join("pawquest.db");
    let user_id = Uuid::new_v4();

    let catalog_size = {
        let db = Arc::new(Database::open(&path).expect("open creates parent dirs"));
        let catalog = Catalog::new(default_definitions()).expect("catalog");
        catalog.seed(&db).expect("seed");

        let calculator =
            ProgressCalculator::new(Arc::clone(&db), Arc::new(catalog), EngineConfig::default());
        calculator.manager().provision_user(user_id).expect("provision");

        let when = Utc.with_ymd_and_hms(2024, 1, 6, 7, 30, 0).unwrap();
        let fact =
            CompletionFact::new(user_id, Uuid::new_v4(), Uuid::new_v4(), 3).completed_at(when);
        db.record_completion(&fact).expect("record");
        calculator.on_challenge_completed(user_id, &fact).expect("trigger");

        db.count_achievements().expect("count")
    };

    // Reopen: seed must be a no-op and progress must be intact
    let db = Arc::new(Database::open(&path).expect("reopen"));
    let catalog = Catalog::load(&db).expect("load seeded catalog");
    assert_eq!(catalog.seed(&db).expect("reseed"), 0);
    assert_eq!(catalog.len(), catalog_size);

    let manager = ProgressManager::new(Arc::clone(&db));
    let records = manager.list_progress(user_id).expect("list");
    assert_eq!(records.len(), catalog_size);

    let cumulative = records
        .iter()
        .find(|r| r.achievement.key == "COMPLETE_1_CHALLENGES")
        .expect("record exists");
    assert_eq!(cumulative.progress, 1);
    assert!(cumulative.is_completed());

    // Completion history also survives
    assert_eq!(db.completed_facts(user_id).expect("facts").len(), 1);
}

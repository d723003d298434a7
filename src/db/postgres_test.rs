//! Live PostgreSQL tests.
//!
//! Run with `--features postgres-tests` and `TEST_DATABASE_URL` pointing at a
//! scratch database. The tables in that database are dropped.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::db::{
    ChoreFilter, ChorePatch, Database, ErrorKind, FixedClock, NewChore, PostgresBackend,
    QueryBackend, RepeatType, SEED_MEMBERS, SqlValue, Timeframe,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
}

async fn setup() -> Database<PostgresBackend> {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    let backend = PostgresBackend::connect(&url)
        .await
        .expect("Failed to connect to PostgreSQL");

    backend
        .execute(
            "DROP TABLE IF EXISTS chore_assignments, chores, family_members",
            &[],
        )
        .await
        .expect("Drop should succeed");

    let db = Database::with_clock(backend, Arc::new(FixedClock::on(today())));
    db.initialize().await.expect("Initialization should succeed");
    db
}

// One test so runs never race on the shared tables.
#[tokio::test(flavor = "multi_thread")]
async fn postgres_backend_behaves_like_sqlite() {
    let db = setup().await;

    // Seeding is idempotent
    db.initialize().await.unwrap();
    let family = db.family().list().await.unwrap();
    assert_eq!(family.len(), SEED_MEMBERS.len());

    // Native booleans and RETURNING ids
    let created = db
        .chores()
        .create(NewChore {
            name: "Dishes".to_string(),
            details: Some("After dinner".to_string()),
            due_date: today(),
            repeat_type: RepeatType::Daily,
            assignee_ids: vec![family[2].id, family[0].id],
        })
        .await
        .unwrap();
    assert!(created.id > 0);
    let ids: Vec<i64> = created.assigned_to.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![family[0].id, family[2].id]);

    let raw = db
        .backend()
        .execute("SELECT completed FROM chores WHERE id = ?", &[created.id.into()])
        .await
        .unwrap();
    assert_eq!(raw.rows[0].get("completed"), Some(&SqlValue::Bool(false)));

    // Completion invariant
    let first = db
        .completion()
        .set_completion(created.id, family[0].id, true)
        .await
        .unwrap();
    assert!(!first.chore_completed);
    let second = db
        .completion()
        .set_completion(created.id, family[2].id, true)
        .await
        .unwrap();
    assert!(second.chore_completed);

    // Filtering
    let week = ChoreFilter {
        include_completed: true,
        timeframe: Timeframe::Week,
        ..Default::default()
    };
    assert_eq!(db.chores().list(&week).await.unwrap().len(), 1);
    assert!(db.chores().list(&ChoreFilter::default()).await.unwrap().is_empty());

    // Idempotent assignee diff
    let updated = db
        .chores()
        .update(
            created.id,
            ChorePatch {
                details: Some(None),
                ..Default::default()
            },
            Some(vec![family[0].id, family[2].id]),
        )
        .await
        .unwrap();
    assert!(updated.completed);
    assert_eq!(updated.details, None);
    assert!(!db.chores().assign(created.id, family[0].id).await.unwrap());

    // Report
    let report = db.reports().weekly_report(family[0].id).await.unwrap();
    assert_eq!(report.report.completion_percentage, 100);

    // Cascade
    db.chores().delete(created.id).await.unwrap();
    let remaining = db
        .backend()
        .execute(
            "SELECT id FROM chore_assignments WHERE chore_id = ?",
            &[created.id.into()],
        )
        .await
        .unwrap();
    assert_eq!(remaining.row_count, 0);
    assert_eq!(
        db.chores().get(created.id).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );

    db.close().await;
}

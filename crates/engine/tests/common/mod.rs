#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use sea_orm::{Database, DatabaseConnection};

use engine::{Engine, FeePolicy, NewProjectCmd, Project, RecordingSink};
use migration::MigratorTrait;

pub const OPERATOR: &str = "operator";
pub const UNIT_PRICE: i64 = 100;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

pub fn day(n: i64) -> DateTime<Utc> {
    t0() + Duration::days(n)
}

pub async fn database() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = database().await;
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

/// Engine wired to a recording sink and the given fee policy.
pub async fn recording_engine(fees: FeePolicy) -> (Engine, Arc<RecordingSink>, DatabaseConnection) {
    let db = database().await;
    let sink = Arc::new(RecordingSink::new());
    let engine = Engine::builder()
        .database(db.clone())
        .fee_policy(fees)
        .event_sink(sink.clone())
        .build()
        .await
        .unwrap();
    (engine, sink, db)
}

/// A fundraising project selling `total_shares` at `UNIT_PRICE`, open for 30 days.
pub async fn fundraising_project(engine: &Engine, total_shares: i64) -> Project {
    engine
        .create_project(NewProjectCmd::new(
            "Camper Van #1",
            OPERATOR,
            total_shares,
            UNIT_PRICE,
            t0(),
            day(30),
        ))
        .await
        .unwrap()
}

/// An active project whose shares are fully allocated to `holders`.
pub async fn active_project(engine: &Engine, holders: &[(&str, i64)]) -> Project {
    let total: i64 = holders.iter().map(|(_, n)| n).sum();
    let project = fundraising_project(engine, total).await;
    for (owner, count) in holders {
        engine
            .allocate(project.id, owner, *count, day(1))
            .await
            .unwrap();
    }
    engine.activate(project.id, day(2)).await.unwrap()
}

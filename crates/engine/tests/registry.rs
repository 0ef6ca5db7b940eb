mod common;

use engine::{EngineError, MarketFilter};

use common::{UNIT_PRICE, active_project, day, engine_with_db, fundraising_project};

#[tokio::test]
async fn allocation_never_exceeds_total_shares() {
    let (engine, _db) = engine_with_db().await;
    let project = fundraising_project(&engine, 1000).await;

    assert_eq!(
        engine.allocate(project.id, "alice", 600, day(1)).await.unwrap(),
        600
    );
    let err = engine
        .allocate(project.id, "bob", 401, day(1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::OverAllocation(_)));
    assert_eq!(engine.total_allocated(project.id).await.unwrap(), 600);

    engine.allocate(project.id, "bob", 400, day(1)).await.unwrap();
    let err = engine
        .allocate(project.id, "carol", 1, day(1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::OverAllocation(_)));

    let project = engine.project(project.id).await.unwrap();
    assert_eq!(engine.total_allocated(project.id).await.unwrap(), 1000);
    assert_eq!(project.raised_amount_minor, 1000 * UNIT_PRICE);
    assert!(project.target_met());
}

#[tokio::test]
async fn repeated_allocations_accumulate() {
    let (engine, _db) = engine_with_db().await;
    let project = fundraising_project(&engine, 100).await;

    engine.allocate(project.id, "alice", 10, day(1)).await.unwrap();
    assert_eq!(
        engine.allocate(project.id, "alice", 15, day(2)).await.unwrap(),
        25
    );
    assert_eq!(engine.holding_of(project.id, "alice").await.unwrap(), 25);
    assert_eq!(engine.holding_of(project.id, "nobody").await.unwrap(), 0);
}

#[tokio::test]
async fn allocation_requires_open_fundraising() {
    let (engine, _db) = engine_with_db().await;
    let project = fundraising_project(&engine, 100).await;

    let err = engine
        .allocate(project.id, "alice", 10, project.closes_at)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidProject(_)));

    let err = engine
        .allocate(project.id, "alice", 0, day(1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let active = active_project(&engine, &[("alice", 10)]).await;
    let err = engine
        .allocate(active.id, "bob", 1, day(3))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidProject(_)));
}

#[tokio::test]
async fn unknown_project_is_not_found() {
    let (engine, _db) = engine_with_db().await;
    let err = engine
        .holding_of(uuid::Uuid::new_v4(), "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn transfer_never_leaves_negative_holdings() {
    let (engine, _db) = engine_with_db().await;
    let project = active_project(&engine, &[("alice", 600), ("bob", 400)]).await;

    let err = engine
        .transfer(project.id, "alice", "bob", 601, day(3))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientShares(_)));
    assert_eq!(engine.holding_of(project.id, "alice").await.unwrap(), 600);
    assert_eq!(engine.holding_of(project.id, "bob").await.unwrap(), 400);

    let err = engine
        .transfer(project.id, "carol", "bob", 1, day(3))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientShares(_)));

    assert_eq!(
        engine
            .transfer(project.id, "alice", "bob", 600, day(3))
            .await
            .unwrap(),
        1000
    );
    assert_eq!(engine.holding_of(project.id, "alice").await.unwrap(), 0);

    let holdings = engine.holdings(project.id).await.unwrap();
    assert_eq!(holdings.len(), 1);
    assert_eq!(holdings[0].owner_id, "bob");
    assert_eq!(engine.total_allocated(project.id).await.unwrap(), 1000);
}

#[tokio::test]
async fn transfer_rejects_self_and_non_tradable_projects() {
    let (engine, _db) = engine_with_db().await;
    let project = active_project(&engine, &[("alice", 10)]).await;

    let err = engine
        .transfer(project.id, "alice", "alice", 1, day(3))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let fundraising = fundraising_project(&engine, 10).await;
    engine
        .allocate(fundraising.id, "alice", 5, day(1))
        .await
        .unwrap();
    let err = engine
        .transfer(fundraising.id, "alice", "bob", 1, day(2))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidProject(_)));
}

#[tokio::test]
async fn reserved_shares_cannot_be_transferred() {
    let (engine, _db) = engine_with_db().await;
    let project = active_project(&engine, &[("alice", 600), ("bob", 400)]).await;

    let listing = engine
        .list(project.id, "alice", 600, 120, day(3))
        .await
        .unwrap();
    engine.match_buyer(listing.id, "carol", day(3)).await.unwrap();

    let err = engine
        .transfer(project.id, "alice", "dave", 1, day(4))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientShares(_)));

    let holdings = engine.holdings(project.id).await.unwrap();
    let alice = holdings.iter().find(|h| h.owner_id == "alice").unwrap();
    assert_eq!(alice.share_count, 600);
    assert_eq!(alice.reserved, 600);
    assert!(
        engine
            .market(&MarketFilter::default().project(project.id))
            .await
            .unwrap()
            .is_empty()
    );
}

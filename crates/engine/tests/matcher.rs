mod common;

use std::sync::Arc;

use sea_orm::{ConnectionTrait, Statement};

use engine::{
    Engine, EngineError, FeePolicy, LedgerEvent, MarketFilter, MarketSort, TransactionStatus,
};
use uuid::Uuid;

use common::{OPERATOR, active_project, day, engine_with_db, recording_engine};

async fn market_ids(engine: &Engine, filter: MarketFilter) -> Vec<Uuid> {
    engine
        .market(&filter)
        .await
        .unwrap()
        .into_iter()
        .map(|tx| tx.id)
        .collect()
}

#[tokio::test]
async fn listing_more_than_holding_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let project = active_project(&engine, &[("alice", 50), ("bob", 950)]).await;

    let err = engine
        .list(project.id, "alice", 100, 150, day(3))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientShares(_)));

    let err = engine
        .list(project.id, "alice", 10, 0, day(3))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test]
async fn listing_requires_an_active_project() {
    let (engine, _db) = engine_with_db().await;
    let project = common::fundraising_project(&engine, 100).await;
    engine.allocate(project.id, "alice", 50, day(1)).await.unwrap();

    let err = engine
        .list(project.id, "alice", 10, 150, day(2))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidProject(_)));
}

#[tokio::test]
async fn repeated_cancel_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let project = active_project(&engine, &[("alice", 600), ("bob", 400)]).await;

    let listing = engine
        .list(project.id, "alice", 100, 150, day(3))
        .await
        .unwrap();
    let cancelled = engine.cancel(listing.id, day(4)).await.unwrap();
    assert_eq!(cancelled.status, TransactionStatus::Cancelled);
    assert_eq!(cancelled.cancelled_at, Some(day(4)));

    let err = engine.cancel(listing.id, day(5)).await.unwrap_err();
    assert!(matches!(err, EngineError::TransactionNotListed(_)));
}

#[tokio::test]
async fn matched_listing_cannot_be_cancelled_or_rematched() {
    let (engine, _db) = engine_with_db().await;
    let project = active_project(&engine, &[("alice", 600), ("bob", 400)]).await;

    let listing = engine
        .list(project.id, "alice", 100, 150, day(3))
        .await
        .unwrap();

    let err = engine
        .match_buyer(listing.id, "alice", day(3))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SelfTrade(_)));

    let err = engine.complete(listing.id, day(3)).await.unwrap_err();
    assert!(matches!(err, EngineError::TransactionNotMatched(_)));

    let matched = engine.match_buyer(listing.id, "bob", day(3)).await.unwrap();
    assert_eq!(matched.status, TransactionStatus::Matched);
    assert_eq!(matched.buyer_id.as_deref(), Some("bob"));

    let err = engine
        .match_buyer(listing.id, "carol", day(3))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::TransactionNotListed(_)));
    let err = engine.cancel(listing.id, day(3)).await.unwrap_err();
    assert!(matches!(err, EngineError::TransactionNotListed(_)));
}

#[tokio::test]
async fn match_fails_when_holding_no_longer_covers_listing() {
    let (engine, _db) = engine_with_db().await;
    let project = active_project(&engine, &[("alice", 600), ("bob", 400)]).await;

    let listing = engine
        .list(project.id, "alice", 500, 150, day(3))
        .await
        .unwrap();
    engine
        .transfer(project.id, "alice", "bob", 200, day(3))
        .await
        .unwrap();

    let err = engine
        .match_buyer(listing.id, "carol", day(4))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientShares(_)));
    assert_eq!(
        engine.transaction(listing.id).await.unwrap().status,
        TransactionStatus::Listed
    );
}

#[tokio::test]
async fn completed_trade_moves_shares_and_publishes_events() {
    let (engine, sink, _db) = recording_engine(FeePolicy::default()).await;
    let project = active_project(&engine, &[("alice", 600), ("bob", 400)]).await;

    let listing = engine
        .list(project.id, "alice", 100, 150, day(3))
        .await
        .unwrap();
    engine.match_buyer(listing.id, "carol", day(4)).await.unwrap();
    let done = engine.complete(listing.id, day(5)).await.unwrap();

    assert_eq!(done.status, TransactionStatus::Completed);
    assert_eq!(done.completed_at, Some(day(5)));
    let settlement = done.settlement.unwrap();
    assert_eq!(settlement.gross_minor, 15_000);
    assert_eq!(settlement.seller_net_minor, 15_000);

    assert_eq!(engine.holding_of(project.id, "alice").await.unwrap(), 500);
    assert_eq!(engine.holding_of(project.id, "carol").await.unwrap(), 100);
    assert_eq!(engine.total_allocated(project.id).await.unwrap(), 1000);

    let names: Vec<&str> = sink
        .events()
        .iter()
        .map(LedgerEvent::name)
        .filter(|name| *name != "status_changed")
        .collect();
    assert_eq!(names, vec!["matched", "completed"]);
}

#[tokio::test]
async fn completion_applies_fee_policy() {
    let fees = FeePolicy::new(250, 100).unwrap();
    let (engine, sink, _db) = recording_engine(fees).await;
    let project = active_project(&engine, &[("alice", 600), ("bob", 400)]).await;

    let listing = engine
        .list(project.id, "alice", 100, 150, day(3))
        .await
        .unwrap();
    engine.match_buyer(listing.id, "bob", day(4)).await.unwrap();
    let done = engine.complete(listing.id, day(5)).await.unwrap();

    let settlement = done.settlement.unwrap();
    assert_eq!(settlement.gross_minor, 15_000);
    assert_eq!(settlement.platform_fee_minor, 375);
    assert_eq!(settlement.operator_fee_minor, 150);
    assert_eq!(settlement.seller_net_minor, 14_475);

    let stored = engine.transaction(listing.id).await.unwrap();
    assert_eq!(stored.settlement, Some(settlement));

    let completed = sink
        .events()
        .into_iter()
        .find(|event| event.name() == "completed")
        .unwrap();
    match completed {
        LedgerEvent::Completed { operator_id, .. } => assert_eq!(operator_id, OPERATOR),
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn failed_completion_rolls_back_and_relists() {
    let (engine, db) = engine_with_db().await;
    let project = active_project(&engine, &[("alice", 600), ("bob", 400)]).await;

    let listing = engine
        .list(project.id, "alice", 100, 150, day(3))
        .await
        .unwrap();
    engine.match_buyer(listing.id, "carol", day(4)).await.unwrap();

    // Break the reservation behind the engine's back.
    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "UPDATE holdings SET reserved = 0 WHERE owner_id = ?",
        vec!["alice".into()],
    ))
    .await
    .unwrap();

    let err = engine.complete(listing.id, day(5)).await.unwrap_err();
    assert!(matches!(err, EngineError::TransactionFailed(_)));
    assert!(err.is_retryable());

    let tx = engine.transaction(listing.id).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Listed);
    assert!(tx.buyer_id.is_none());
    assert!(tx.failure_reason.is_some());
    assert!(tx.settlement.is_none());

    assert_eq!(engine.holding_of(project.id, "alice").await.unwrap(), 600);
    assert_eq!(engine.holding_of(project.id, "carol").await.unwrap(), 0);
    let holdings = engine.holdings(project.id).await.unwrap();
    assert!(holdings.iter().all(|h| h.reserved == 0));

    // The listing is back on the market and can settle normally.
    engine.match_buyer(listing.id, "carol", day(6)).await.unwrap();
    let done = engine.complete(listing.id, day(6)).await.unwrap();
    assert_eq!(done.status, TransactionStatus::Completed);
    assert!(done.failure_reason.is_none());
    assert_eq!(engine.holding_of(project.id, "carol").await.unwrap(), 100);
}

#[tokio::test]
async fn concurrent_matches_have_exactly_one_winner() {
    let (engine, _db) = engine_with_db().await;
    let engine = Arc::new(engine);
    let project = active_project(&engine, &[("alice", 600), ("bob", 400)]).await;

    let listing = engine
        .list(project.id, "alice", 100, 150, day(3))
        .await
        .unwrap();

    let listing_id = listing.id;
    let mut handles = Vec::new();
    for i in 0..8 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            let buyer = format!("buyer-{i}");
            engine
                .match_buyer(listing_id, &buyer, day(4))
                .await
                .map(|_| buyer)
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(buyer) => winners.push(buyer),
            Err(err) => assert!(matches!(err, EngineError::TransactionNotListed(_))),
        }
    }
    assert_eq!(winners.len(), 1);

    let tx = engine.transaction(listing.id).await.unwrap();
    assert_eq!(tx.buyer_id.as_deref(), Some(winners[0].as_str()));
    let holdings = engine.holdings(project.id).await.unwrap();
    let alice = holdings.iter().find(|h| h.owner_id == "alice").unwrap();
    assert_eq!(alice.reserved, 100);
}

#[tokio::test]
async fn market_lists_open_listings_in_requested_order() {
    let (engine, _db) = engine_with_db().await;
    let project = active_project(&engine, &[("alice", 600), ("bob", 400)]).await;
    let other = active_project(&engine, &[("carol", 10)]).await;

    let cheap = engine
        .list(project.id, "alice", 10, 110, day(3))
        .await
        .unwrap();
    let pricey = engine
        .list(project.id, "bob", 10, 190, day(4))
        .await
        .unwrap();
    let middle = engine
        .list(project.id, "alice", 10, 150, day(5))
        .await
        .unwrap();
    let withdrawn = engine
        .list(project.id, "bob", 10, 100, day(6))
        .await
        .unwrap();
    engine.cancel(withdrawn.id, day(6)).await.unwrap();
    engine.list(other.id, "carol", 5, 100, day(7)).await.unwrap();

    let base = MarketFilter::default().project(project.id);
    assert_eq!(
        market_ids(&engine, base.clone()).await,
        vec![middle.id, pricey.id, cheap.id]
    );
    assert_eq!(
        market_ids(&engine, base.clone().sort(MarketSort::PriceAsc)).await,
        vec![cheap.id, middle.id, pricey.id]
    );
    assert_eq!(
        market_ids(&engine, base.clone().sort(MarketSort::PriceDesc).limit(2)).await,
        vec![pricey.id, middle.id]
    );
    let second_cheapest = base.clone().sort(MarketSort::PriceAsc).offset(1).limit(1);
    assert_eq!(market_ids(&engine, second_cheapest).await, vec![middle.id]);
    assert!(market_ids(&engine, base.offset(3)).await.is_empty());
    assert_eq!(market_ids(&engine, MarketFilter::default()).await.len(), 4);

    let alice_txs = engine.user_transactions(project.id, "alice").await.unwrap();
    assert_eq!(alice_txs.len(), 2);
    let padded = engine
        .user_transactions(project.id, " alice ")
        .await
        .unwrap();
    assert_eq!(padded.len(), 2);
}

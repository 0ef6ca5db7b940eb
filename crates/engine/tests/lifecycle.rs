mod common;

use chrono::Duration;

use engine::{
    EngineError, FeePolicy, LedgerEvent, NewProjectCmd, ParticipantRole, ProjectFilter,
    ProjectStatus, Refund, SweepReport, TransactionStatus,
};

use common::{
    OPERATOR, UNIT_PRICE, active_project, day, engine_with_db, fundraising_project,
    recording_engine, t0,
};

#[tokio::test]
async fn create_project_validates_input() {
    let (engine, _db) = engine_with_db().await;

    let cases = [
        NewProjectCmd::new("  ", OPERATOR, 100, 100, t0(), day(30)),
        NewProjectCmd::new("Van", OPERATOR, 0, 100, t0(), day(30)),
        NewProjectCmd::new("Van", OPERATOR, 100, -1, t0(), day(30)),
        NewProjectCmd::new("Van", OPERATOR, 100, 100, t0(), t0()),
        NewProjectCmd::new("Van", OPERATOR, i64::MAX, 2, t0(), day(30)),
    ];
    for cmd in cases {
        let err = engine.create_project(cmd).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)), "{err:?}");
    }

    let err = engine
        .create_project(NewProjectCmd::new("Van", " ", 100, 100, t0(), day(30)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidId(_)));

    let project = engine
        .create_project(
            NewProjectCmd::new(" Camper ", OPERATOR, 200, 250, t0(), day(30))
                .vehicle_model_id("model-7"),
        )
        .await
        .unwrap();
    assert_eq!(project.title, "Camper");
    assert_eq!(project.status, ProjectStatus::Fundraising);
    assert_eq!(project.target_amount_minor, 50_000);
    assert_eq!(project.raised_amount_minor, 0);
    assert_eq!(engine.project(project.id).await.unwrap(), project);
}

#[tokio::test]
async fn activation_requires_full_funding() {
    let (engine, sink, _db) = recording_engine(FeePolicy::default()).await;
    let project = fundraising_project(&engine, 100).await;

    engine.allocate(project.id, "alice", 99, day(1)).await.unwrap();
    let err = engine.activate(project.id, day(2)).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidProject(_)));

    engine.allocate(project.id, "bob", 1, day(1)).await.unwrap();
    let active = engine.activate(project.id, day(2)).await.unwrap();
    assert_eq!(active.status, ProjectStatus::Active);

    assert_eq!(
        sink.events(),
        vec![LedgerEvent::StatusChanged {
            project_id: project.id,
            from: ProjectStatus::Fundraising,
            to: ProjectStatus::Active,
        }]
    );
}

#[tokio::test]
async fn only_forward_transitions_are_allowed() {
    let (engine, _db) = engine_with_db().await;
    let project = active_project(&engine, &[("alice", 10)]).await;

    let err = engine.activate(project.id, day(3)).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition(_)));
    let err = engine.refund(project.id, day(40)).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition(_)));

    let closed = engine.close(project.id, day(40)).await.unwrap();
    assert_eq!(closed.status, ProjectStatus::Closed);
    let err = engine.close(project.id, day(41)).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition(_)));

    let fundraising = fundraising_project(&engine, 10).await;
    let err = engine.close(fundraising.id, day(3)).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition(_)));
}

#[tokio::test]
async fn close_cancels_open_listings_and_releases_reservations() {
    let (engine, sink, _db) = recording_engine(FeePolicy::default()).await;
    let project = active_project(&engine, &[("alice", 600), ("bob", 400)]).await;

    let listed = engine
        .list(project.id, "alice", 100, 150, day(3))
        .await
        .unwrap();
    let matched = engine
        .list(project.id, "alice", 50, 150, day(3))
        .await
        .unwrap();
    engine.match_buyer(matched.id, "bob", day(4)).await.unwrap();

    engine.close(project.id, day(40)).await.unwrap();

    for id in [listed.id, matched.id] {
        let tx = engine.transaction(id).await.unwrap();
        assert_eq!(tx.status, TransactionStatus::Cancelled);
        assert_eq!(tx.cancelled_at, Some(day(40)));
    }
    let holdings = engine.holdings(project.id).await.unwrap();
    assert!(holdings.iter().all(|h| h.reserved == 0));
    assert_eq!(engine.holding_of(project.id, "alice").await.unwrap(), 600);

    let cancelled = sink
        .events()
        .iter()
        .filter(|event| event.name() == "cancelled")
        .count();
    assert_eq!(cancelled, 2);

    let err = engine
        .list(project.id, "alice", 1, 150, day(41))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidProject(_)));
}

#[tokio::test]
async fn refund_needs_closed_window_and_missed_target() {
    let (engine, sink, _db) = recording_engine(FeePolicy::default()).await;
    let project = fundraising_project(&engine, 1000).await;
    engine.allocate(project.id, "alice", 300, day(1)).await.unwrap();
    engine.allocate(project.id, "bob", 200, day(1)).await.unwrap();

    let err = engine.refund(project.id, day(29)).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidProject(_)));

    let (refunded, refunds) = engine.refund(project.id, day(30)).await.unwrap();
    assert_eq!(refunded.status, ProjectStatus::Refunded);
    assert_eq!(
        refunds,
        vec![
            Refund {
                owner_id: "alice".to_string(),
                share_count: 300,
                amount_minor: 300 * UNIT_PRICE,
            },
            Refund {
                owner_id: "bob".to_string(),
                share_count: 200,
                amount_minor: 200 * UNIT_PRICE,
            },
        ]
    );
    // Holdings stay until the payment collaborator has paid back.
    assert_eq!(engine.holding_of(project.id, "alice").await.unwrap(), 300);
    assert!(
        sink.events()
            .contains(&LedgerEvent::Refunded {
                project_id: project.id,
                refunds,
            })
    );
}

#[tokio::test]
async fn funded_project_is_not_refundable() {
    let (engine, _db) = engine_with_db().await;
    let project = fundraising_project(&engine, 10).await;
    engine.allocate(project.id, "alice", 10, day(1)).await.unwrap();

    let err = engine.refund(project.id, day(31)).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidProject(_)));
}

#[tokio::test]
async fn sweep_expires_stale_listings_and_refunds_overdue_projects() {
    let (engine, _db) = engine_with_db().await;
    let active = active_project(&engine, &[("alice", 600), ("bob", 400)]).await;
    let stale = engine
        .list(active.id, "alice", 10, 150, day(3))
        .await
        .unwrap();
    let fresh = engine
        .list(active.id, "bob", 10, 150, day(9))
        .await
        .unwrap();
    let matched = engine
        .list(active.id, "alice", 10, 150, day(3))
        .await
        .unwrap();
    engine.match_buyer(matched.id, "carol", day(3)).await.unwrap();

    let underfunded = fundraising_project(&engine, 100).await;
    engine
        .allocate(underfunded.id, "alice", 10, day(1))
        .await
        .unwrap();
    let funded = fundraising_project(&engine, 100).await;
    engine.allocate(funded.id, "bob", 100, day(1)).await.unwrap();

    let report = engine.sweep(day(10), Duration::days(7)).await.unwrap();
    assert_eq!(report.cancelled, vec![stale.id]);
    assert!(report.refunded.is_empty());

    let report = engine.sweep(day(30), Duration::days(30)).await.unwrap();
    assert!(report.cancelled.is_empty());
    assert_eq!(report.refunded, vec![underfunded.id]);

    assert_eq!(
        engine.transaction(fresh.id).await.unwrap().status,
        TransactionStatus::Listed
    );
    assert_eq!(
        engine.transaction(matched.id).await.unwrap().status,
        TransactionStatus::Matched
    );
    assert_eq!(
        engine.project(funded.id).await.unwrap().status,
        ProjectStatus::Fundraising
    );
    assert_eq!(
        engine.sweep(day(30), Duration::days(30)).await.unwrap(),
        SweepReport::default()
    );
}

#[tokio::test]
async fn participants_track_roles_and_holdings() {
    let (engine, _db) = engine_with_db().await;
    let project = active_project(&engine, &[("alice", 600), ("bob", 400)]).await;
    engine
        .transfer(project.id, "bob", "carol", 400, day(3))
        .await
        .unwrap();

    let participants = engine.participants(project.id).await.unwrap();
    let rows: Vec<(&str, ParticipantRole, i64)> = participants
        .iter()
        .map(|p| (p.user_id.as_str(), p.role, p.share_count))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("alice", ParticipantRole::Investor, 600),
            ("bob", ParticipantRole::Investor, 0),
            ("carol", ParticipantRole::Investor, 400),
            (OPERATOR, ParticipantRole::Operator, 0),
        ]
    );

    assert_eq!(
        engine.participant_role(project.id, OPERATOR).await.unwrap(),
        Some(ParticipantRole::Operator)
    );
    assert_eq!(
        engine.participant_role(project.id, "dave").await.unwrap(),
        None
    );
}

#[tokio::test]
async fn platform_role_can_be_granted_once_per_user() {
    let (engine, _db) = engine_with_db().await;
    let project = active_project(&engine, &[("alice", 10)]).await;

    engine.grant_platform(project.id, "alice").await.unwrap();
    engine.grant_platform(project.id, "market").await.unwrap();
    assert_eq!(
        engine.participant_role(project.id, "alice").await.unwrap(),
        Some(ParticipantRole::Platform)
    );
    assert_eq!(
        engine.participant_role(project.id, "market").await.unwrap(),
        Some(ParticipantRole::Platform)
    );
    // promotion keeps the holding
    assert_eq!(engine.holding_of(project.id, "alice").await.unwrap(), 10);

    assert!(matches!(
        engine.grant_platform(project.id, OPERATOR).await,
        Err(EngineError::Forbidden(_))
    ));

    engine.close(project.id, day(10)).await.unwrap();
    assert!(matches!(
        engine.grant_platform(project.id, "bob").await,
        Err(EngineError::InvalidProject(_))
    ));
}

#[tokio::test]
async fn projects_filter_by_status_and_operator() {
    let (engine, _db) = engine_with_db().await;
    let active = active_project(&engine, &[("alice", 10)]).await;
    let fundraising = fundraising_project(&engine, 10).await;
    engine
        .create_project(NewProjectCmd::new("Other", "someone", 5, 100, t0(), day(30)))
        .await
        .unwrap();

    let all = engine.projects(&ProjectFilter::default()).await.unwrap();
    assert_eq!(all.len(), 3);

    let only_active = engine
        .projects(&ProjectFilter {
            status: Some(ProjectStatus::Active),
            ..ProjectFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(only_active.len(), 1);
    assert_eq!(only_active[0].id, active.id);

    let mine = engine
        .projects(&ProjectFilter {
            status: Some(ProjectStatus::Fundraising),
            operator_id: Some(OPERATOR.to_string()),
            ..ProjectFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, fundraising.id);
}

#[tokio::test]
async fn projects_filter_by_participant_and_page() {
    let (engine, _db) = engine_with_db().await;
    let first = active_project(&engine, &[("alice", 10)]).await;
    let second = fundraising_project(&engine, 10).await;
    engine.allocate(second.id, "alice", 3, day(1)).await.unwrap();
    fundraising_project(&engine, 10).await;

    let mut joined: Vec<_> = engine
        .projects(&ProjectFilter {
            participant_id: Some("alice".to_string()),
            ..ProjectFilter::default()
        })
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    joined.sort();
    let mut expected = vec![first.id, second.id];
    expected.sort();
    assert_eq!(joined, expected);

    let none = engine
        .projects(&ProjectFilter {
            participant_id: Some("dave".to_string()),
            ..ProjectFilter::default()
        })
        .await
        .unwrap();
    assert!(none.is_empty());

    let all = engine.projects(&ProjectFilter::default()).await.unwrap();
    let mut paged = Vec::new();
    for offset in [0, 2] {
        let page = engine
            .projects(&ProjectFilter {
                limit: Some(2),
                offset,
                ..ProjectFilter::default()
            })
            .await
            .unwrap();
        paged.extend(page.into_iter().map(|p| p.id));
    }
    assert_eq!(paged, all.into_iter().map(|p| p.id).collect::<Vec<_>>());
}

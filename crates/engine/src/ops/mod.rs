use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::{
    EngineError, EventSink, FeePolicy, Holding, LedgerEvent, ParticipantRole, Project,
    ResultEngine, TracingSink, holdings, locks::ProjectLocks, participants, projects,
};

mod distributor;
mod lifecycle;
mod matcher;
mod portfolio;
mod registry;

pub use lifecycle::SweepReport;
pub use portfolio::{OwnerHolding, Portfolio};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: crate::ResultEngine<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

pub struct Engine {
    database: DatabaseConnection,
    locks: ProjectLocks,
    fees: FeePolicy,
    events: Arc<dyn EventSink>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("database", &self.database)
            .field("fees", &self.fees)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Fee policy applied when share transactions complete.
    pub fn fee_policy(&self) -> FeePolicy {
        self.fees
    }

    fn publish(&self, events: &[LedgerEvent]) {
        for event in events {
            self.events.publish(event);
        }
    }
}

pub(super) async fn load_project(
    db: &DatabaseTransaction,
    project_id: Uuid,
) -> ResultEngine<Project> {
    let model = projects::Entity::find_by_id(project_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("project not exists".to_string()))?;
    Project::try_from(model)
}

/// Fails with `InvalidProject` unless the project is open for secondary trading.
pub(super) fn ensure_tradable(project: &Project) -> ResultEngine<()> {
    if !project.status.is_tradable() {
        return Err(EngineError::InvalidProject(format!(
            "project {} is {}, shares are not tradable",
            project.id,
            project.status.as_str()
        )));
    }
    Ok(())
}

pub(super) async fn find_holding(
    db: &DatabaseTransaction,
    project_id: Uuid,
    owner_id: &str,
) -> ResultEngine<Option<Holding>> {
    holdings::Entity::find()
        .filter(holdings::Column::ProjectId.eq(project_id.to_string()))
        .filter(holdings::Column::OwnerId.eq(owner_id.to_string()))
        .one(db)
        .await?
        .map(Holding::try_from)
        .transpose()
}

pub(super) async fn require_holding(
    db: &DatabaseTransaction,
    project_id: Uuid,
    owner_id: &str,
) -> ResultEngine<Holding> {
    find_holding(db, project_id, owner_id).await?.ok_or_else(|| {
        EngineError::InsufficientShares(format!("{owner_id} holds no shares in {project_id}"))
    })
}

/// All holdings of a project, reservations included, ordered by owner id.
pub(super) async fn load_holdings(
    db: &DatabaseTransaction,
    project_id: Uuid,
) -> ResultEngine<Vec<Holding>> {
    holdings::Entity::find()
        .filter(holdings::Column::ProjectId.eq(project_id.to_string()))
        .order_by_asc(holdings::Column::OwnerId)
        .all(db)
        .await?
        .into_iter()
        .map(Holding::try_from)
        .collect()
}

/// Persists `holding`, inserting it when `existed` is false.
pub(super) async fn save_holding(
    db: &DatabaseTransaction,
    holding: &Holding,
    existed: bool,
) -> ResultEngine<()> {
    let model = holdings::ActiveModel::from(holding);
    if existed {
        model.update(db).await?;
    } else {
        model.insert(db).await?;
    }
    Ok(())
}

/// Adds `count` shares to `owner_id`, creating the holding on first receipt.
pub(super) async fn credit_shares(
    db: &DatabaseTransaction,
    project_id: Uuid,
    owner_id: &str,
    count: i64,
    at: DateTime<Utc>,
) -> ResultEngine<i64> {
    let existing = find_holding(db, project_id, owner_id).await?;
    let existed = existing.is_some();
    let mut holding =
        existing.unwrap_or_else(|| Holding::new(project_id, owner_id.to_string(), at));
    holding.credit(count);
    save_holding(db, &holding, existed).await?;
    ensure_participant(db, project_id, owner_id, ParticipantRole::Investor).await?;
    Ok(holding.share_count)
}

/// Registers `user_id` on the project unless already present.
pub(super) async fn ensure_participant(
    db: &DatabaseTransaction,
    project_id: Uuid,
    user_id: &str,
    role: ParticipantRole,
) -> ResultEngine<()> {
    let exists = participants::Entity::find_by_id((project_id.to_string(), user_id.to_string()))
        .one(db)
        .await?
        .is_some();
    if !exists {
        participants::ActiveModel {
            project_id: ActiveValue::Set(project_id.to_string()),
            user_id: ActiveValue::Set(user_id.to_string()),
            role: ActiveValue::Set(role.as_str().to_string()),
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    fees: FeePolicy,
    events: Option<Arc<dyn EventSink>>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Fee policy for completed trades (defaults to no fees).
    pub fn fee_policy(mut self, fees: FeePolicy) -> EngineBuilder {
        self.fees = fees;
        self
    }

    /// Where ledger events go (defaults to [`TracingSink`]).
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> EngineBuilder {
        self.events = Some(sink);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            locks: ProjectLocks::default(),
            fees: self.fees,
            events: self.events.unwrap_or_else(|| Arc::new(TracingSink)),
        })
    }
}

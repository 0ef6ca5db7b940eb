//! Share holdings.
//!
//! One row per `(project, owner)`. `share_count` is everything the owner
//! holds; `reserved` is the part soft-locked by matched share transactions
//! and waiting for settlement.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub id: Uuid,
    pub project_id: Uuid,
    pub owner_id: String,
    pub share_count: i64,
    pub reserved: i64,
    pub acquired_at: DateTime<Utc>,
}

impl Holding {
    pub fn new(project_id: Uuid, owner_id: String, acquired_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            owner_id,
            share_count: 0,
            reserved: 0,
            acquired_at,
        }
    }

    /// Shares the owner can still list, reserve or transfer.
    pub fn tradable(&self) -> i64 {
        self.share_count - self.reserved
    }

    pub fn credit(&mut self, count: i64) {
        self.share_count += count;
    }

    /// Removes `count` unreserved shares.
    pub fn debit(&mut self, count: i64) -> ResultEngine<()> {
        if count > self.tradable() {
            return Err(self.insufficient(count));
        }
        self.share_count -= count;
        Ok(())
    }

    /// Soft-locks `count` unreserved shares.
    pub fn reserve(&mut self, count: i64) -> ResultEngine<()> {
        if count > self.tradable() {
            return Err(self.insufficient(count));
        }
        self.reserved += count;
        Ok(())
    }

    /// Releases a soft-lock without moving shares.
    pub fn release(&mut self, count: i64) {
        self.reserved = (self.reserved - count).max(0);
    }

    /// Removes `count` shares out of the reservation.
    pub fn settle_reserved(&mut self, count: i64) -> ResultEngine<()> {
        if count > self.reserved || count > self.share_count {
            return Err(EngineError::InsufficientShares(format!(
                "{} holds {} shares with {} reserved, cannot settle {count}",
                self.owner_id, self.share_count, self.reserved
            )));
        }
        self.reserved -= count;
        self.share_count -= count;
        Ok(())
    }

    fn insufficient(&self, count: i64) -> EngineError {
        EngineError::InsufficientShares(format!(
            "{} can trade {} shares, requested {count}",
            self.owner_id,
            self.tradable()
        ))
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "holdings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub project_id: String,
    pub owner_id: String,
    pub share_count: i64,
    pub reserved: i64,
    pub acquired_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::projects::Entity",
        from = "Column::ProjectId",
        to = "super::projects::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Projects,
}

impl Related<super::projects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Projects.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Holding> for ActiveModel {
    fn from(holding: &Holding) -> Self {
        Self {
            id: ActiveValue::Set(holding.id.to_string()),
            project_id: ActiveValue::Set(holding.project_id.to_string()),
            owner_id: ActiveValue::Set(holding.owner_id.clone()),
            share_count: ActiveValue::Set(holding.share_count),
            reserved: ActiveValue::Set(holding.reserved),
            acquired_at: ActiveValue::Set(holding.acquired_at),
        }
    }
}

impl TryFrom<Model> for Holding {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "holding")?,
            project_id: parse_uuid(&model.project_id, "project")?,
            owner_id: model.owner_id,
            share_count: model.share_count,
            reserved: model.reserved,
            acquired_at: model.acquired_at,
        })
    }
}

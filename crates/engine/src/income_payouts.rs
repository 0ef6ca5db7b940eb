//! Per-owner payouts of an [`IncomeRecord`](crate::IncomeRecord).

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub id: Uuid,
    pub income_record_id: Uuid,
    pub owner_id: String,
    /// Holding at distribution time.
    pub share_count: i64,
    pub amount_minor: i64,
}

/// A payout seen from its owner, with the period it pays for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerPayout {
    pub project_id: Uuid,
    pub income_record_id: Uuid,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub distributed_at: DateTime<Utc>,
    pub share_count: i64,
    pub amount_minor: i64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "income_payouts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub income_record_id: String,
    pub owner_id: String,
    pub share_count: i64,
    pub amount_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::income_records::Entity",
        from = "Column::IncomeRecordId",
        to = "super::income_records::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    IncomeRecords,
}

impl Related<super::income_records::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IncomeRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Payout> for ActiveModel {
    fn from(payout: &Payout) -> Self {
        Self {
            id: ActiveValue::Set(payout.id.to_string()),
            income_record_id: ActiveValue::Set(payout.income_record_id.to_string()),
            owner_id: ActiveValue::Set(payout.owner_id.clone()),
            share_count: ActiveValue::Set(payout.share_count),
            amount_minor: ActiveValue::Set(payout.amount_minor),
        }
    }
}

impl TryFrom<Model> for Payout {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "payout")?,
            income_record_id: parse_uuid(&model.income_record_id, "income record")?,
            owner_id: model.owner_id,
            share_count: model.share_count,
            amount_minor: model.amount_minor,
        })
    }
}

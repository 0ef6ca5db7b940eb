//! Crowdfunding projects and their lifecycle.
//!
//! A project sells a fixed number of shares of one vehicle. Its status moves
//! one way only:
//!
//! ```text
//! fundraising ──► active ──► closed
//!      │
//!      └────────► refunded
//! ```

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Fundraising,
    Active,
    Closed,
    Refunded,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fundraising => "fundraising",
            Self::Active => "active",
            Self::Closed => "closed",
            Self::Refunded => "refunded",
        }
    }

    /// Shares change hands on the secondary market only while the vehicle
    /// operates.
    pub fn is_tradable(self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Refunded)
    }

    pub fn can_transition_to(self, next: ProjectStatus) -> bool {
        matches!(
            (self, next),
            (Self::Fundraising, Self::Active)
                | (Self::Fundraising, Self::Refunded)
                | (Self::Active, Self::Closed)
        )
    }

    /// Validates `self -> next` and returns `next`.
    pub fn transition(self, next: ProjectStatus) -> ResultEngine<ProjectStatus> {
        if !self.can_transition_to(next) {
            return Err(EngineError::InvalidTransition(format!(
                "{} -> {}",
                self.as_str(),
                next.as_str()
            )));
        }
        Ok(next)
    }
}

impl TryFrom<&str> for ProjectStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "fundraising" => Ok(Self::Fundraising),
            "active" => Ok(Self::Active),
            "closed" => Ok(Self::Closed),
            "refunded" => Ok(Self::Refunded),
            other => Err(EngineError::InvalidProject(format!(
                "invalid project status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub vehicle_model_id: String,
    pub operator_id: String,
    pub currency: Currency,
    pub target_amount_minor: i64,
    pub raised_amount_minor: i64,
    pub share_unit_price_minor: i64,
    pub total_shares: i64,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub closes_at: DateTime<Utc>,
}

impl Project {
    /// Number of shares sold so far, derived from the raised amount.
    pub fn allocated_shares(&self) -> i64 {
        self.raised_amount_minor / self.share_unit_price_minor
    }

    pub fn remaining_shares(&self) -> i64 {
        self.total_shares - self.allocated_shares()
    }

    pub fn target_met(&self) -> bool {
        self.raised_amount_minor >= self.target_amount_minor
    }

    /// Funding progress in basis points (10 000 = fully funded).
    pub fn progress_bps(&self) -> i64 {
        if self.target_amount_minor == 0 {
            return 0;
        }
        ((self.raised_amount_minor as i128 * 10_000) / self.target_amount_minor as i128) as i64
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub title: String,
    pub vehicle_model_id: String,
    pub operator_id: String,
    pub currency: String,
    pub target_amount_minor: i64,
    pub raised_amount_minor: i64,
    pub share_unit_price_minor: i64,
    pub total_shares: i64,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub closes_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::holdings::Entity")]
    Holdings,
    #[sea_orm(has_many = "super::share_transactions::Entity")]
    ShareTransactions,
    #[sea_orm(has_many = "super::income_records::Entity")]
    IncomeRecords,
    #[sea_orm(has_many = "super::participants::Entity")]
    Participants,
}

impl Related<super::holdings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Holdings.def()
    }
}

impl Related<super::share_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShareTransactions.def()
    }
}

impl Related<super::income_records::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IncomeRecords.def()
    }
}

impl Related<super::participants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Participants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Project> for ActiveModel {
    fn from(project: &Project) -> Self {
        Self {
            id: ActiveValue::Set(project.id.to_string()),
            title: ActiveValue::Set(project.title.clone()),
            vehicle_model_id: ActiveValue::Set(project.vehicle_model_id.clone()),
            operator_id: ActiveValue::Set(project.operator_id.clone()),
            currency: ActiveValue::Set(project.currency.code().to_string()),
            target_amount_minor: ActiveValue::Set(project.target_amount_minor),
            raised_amount_minor: ActiveValue::Set(project.raised_amount_minor),
            share_unit_price_minor: ActiveValue::Set(project.share_unit_price_minor),
            total_shares: ActiveValue::Set(project.total_shares),
            status: ActiveValue::Set(project.status.as_str().to_string()),
            created_at: ActiveValue::Set(project.created_at),
            closes_at: ActiveValue::Set(project.closes_at),
        }
    }
}

impl TryFrom<Model> for Project {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "project")?,
            title: model.title,
            vehicle_model_id: model.vehicle_model_id,
            operator_id: model.operator_id,
            currency: Currency::try_from(model.currency.as_str())?,
            target_amount_minor: model.target_amount_minor,
            raised_amount_minor: model.raised_amount_minor,
            share_unit_price_minor: model.share_unit_price_minor,
            total_shares: model.total_shares,
            status: ProjectStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
            closes_at: model.closes_at,
        })
    }
}

//! Secondary-market share transactions.
//!
//! A `ShareTransaction` starts as a seller's listing and either settles
//! (`listed → matched → completed`) or is withdrawn (`listed → cancelled`).
//! A failed settlement rolls a `matched` transaction back to `listed`.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Listed,
    Matched,
    Completed,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Listed => "listed",
            Self::Matched => "matched",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_open(self) -> bool {
        matches!(self, Self::Listed | Self::Matched)
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "listed" => Ok(Self::Listed),
            "matched" => Ok(Self::Matched),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid share transaction status: {other}"
            ))),
        }
    }
}

/// Money movements computed when a transaction completes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub gross_minor: i64,
    pub platform_fee_minor: i64,
    pub operator_fee_minor: i64,
    pub seller_net_minor: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareTransaction {
    pub id: Uuid,
    pub project_id: Uuid,
    pub seller_id: String,
    pub buyer_id: Option<String>,
    pub share_count: i64,
    pub price_per_share_minor: i64,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub matched_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub settlement: Option<Settlement>,
}

impl ShareTransaction {
    pub fn new(
        project_id: Uuid,
        seller_id: String,
        share_count: i64,
        price_per_share_minor: i64,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if share_count <= 0 {
            return Err(EngineError::InvalidAmount(
                "share_count must be > 0".to_string(),
            ));
        }
        if price_per_share_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "price_per_share_minor must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            project_id,
            seller_id,
            buyer_id: None,
            share_count,
            price_per_share_minor,
            status: TransactionStatus::Listed,
            created_at,
            matched_at: None,
            completed_at: None,
            cancelled_at: None,
            failure_reason: None,
            settlement: None,
        })
    }

    /// Total price of the listing (checked).
    pub fn gross_minor(&self) -> ResultEngine<i64> {
        self.share_count
            .checked_mul(self.price_per_share_minor)
            .ok_or_else(|| EngineError::InvalidAmount("listing value too large".to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "share_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub project_id: String,
    pub seller_id: String,
    pub buyer_id: Option<String>,
    pub share_count: i64,
    pub price_per_share_minor: i64,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub matched_at: Option<DateTimeUtc>,
    pub completed_at: Option<DateTimeUtc>,
    pub cancelled_at: Option<DateTimeUtc>,
    pub failure_reason: Option<String>,
    pub gross_minor: Option<i64>,
    pub platform_fee_minor: Option<i64>,
    pub operator_fee_minor: Option<i64>,
    pub seller_net_minor: Option<i64>,
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

impl From<&ShareTransaction> for ActiveModel {
    fn from(tx: &ShareTransaction) -> Self {
        let settlement = tx.settlement;
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            project_id: ActiveValue::Set(tx.project_id.to_string()),
            seller_id: ActiveValue::Set(tx.seller_id.clone()),
            buyer_id: ActiveValue::Set(tx.buyer_id.clone()),
            share_count: ActiveValue::Set(tx.share_count),
            price_per_share_minor: ActiveValue::Set(tx.price_per_share_minor),
            status: ActiveValue::Set(tx.status.as_str().to_string()),
            created_at: ActiveValue::Set(tx.created_at),
            matched_at: ActiveValue::Set(tx.matched_at),
            completed_at: ActiveValue::Set(tx.completed_at),
            cancelled_at: ActiveValue::Set(tx.cancelled_at),
            failure_reason: ActiveValue::Set(tx.failure_reason.clone()),
            gross_minor: ActiveValue::Set(settlement.map(|s| s.gross_minor)),
            platform_fee_minor: ActiveValue::Set(settlement.map(|s| s.platform_fee_minor)),
            operator_fee_minor: ActiveValue::Set(settlement.map(|s| s.operator_fee_minor)),
            seller_net_minor: ActiveValue::Set(settlement.map(|s| s.seller_net_minor)),
        }
    }
}

impl TryFrom<Model> for ShareTransaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let settlement = match (
            model.gross_minor,
            model.platform_fee_minor,
            model.operator_fee_minor,
            model.seller_net_minor,
        ) {
            (Some(gross_minor), Some(platform_fee_minor), Some(operator_fee_minor), Some(net)) => {
                Some(Settlement {
                    gross_minor,
                    platform_fee_minor,
                    operator_fee_minor,
                    seller_net_minor: net,
                })
            }
            _ => None,
        };
        Ok(Self {
            id: parse_uuid(&model.id, "share transaction")?,
            project_id: parse_uuid(&model.project_id, "project")?,
            seller_id: model.seller_id,
            buyer_id: model.buyer_id,
            share_count: model.share_count,
            price_per_share_minor: model.price_per_share_minor,
            status: TransactionStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
            matched_at: model.matched_at,
            completed_at: model.completed_at,
            cancelled_at: model.cancelled_at,
            failure_reason: model.failure_reason,
            settlement,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_listing_rejects_non_positive_values() {
        let project_id = Uuid::new_v4();
        let now = Utc::now();
        assert!(ShareTransaction::new(project_id, "alice".into(), 0, 100, now).is_err());
        assert!(ShareTransaction::new(project_id, "alice".into(), 10, 0, now).is_err());

        let tx = ShareTransaction::new(project_id, "alice".into(), 10, 250, now).unwrap();
        assert_eq!(tx.status, TransactionStatus::Listed);
        assert_eq!(tx.gross_minor().unwrap(), 2_500);
        assert!(tx.buyer_id.is_none());
    }

    #[test]
    fn open_statuses() {
        assert!(TransactionStatus::Listed.is_open());
        assert!(TransactionStatus::Matched.is_open());
        assert!(!TransactionStatus::Completed.is_open());
        assert!(!TransactionStatus::Cancelled.is_open());
    }
}

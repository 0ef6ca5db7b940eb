//! Income records.
//!
//! An `IncomeRecord` is written once per distributed period and never
//! updated. Periods are half-open: `[period_start, period_end)`.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeRecord {
    pub id: Uuid,
    pub project_id: Uuid,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub total_income_minor: i64,
    pub distributed_at: DateTime<Utc>,
}

impl IncomeRecord {
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.period_start < end && start < self.period_end
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "income_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub project_id: String,
    pub period_start: DateTimeUtc,
    pub period_end: DateTimeUtc,
    pub total_income_minor: i64,
    pub distributed_at: DateTimeUtc,
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
    #[sea_orm(has_many = "super::income_payouts::Entity")]
    Payouts,
}

impl Related<super::projects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Projects.def()
    }
}

impl Related<super::income_payouts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payouts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&IncomeRecord> for ActiveModel {
    fn from(record: &IncomeRecord) -> Self {
        Self {
            id: ActiveValue::Set(record.id.to_string()),
            project_id: ActiveValue::Set(record.project_id.to_string()),
            period_start: ActiveValue::Set(record.period_start),
            period_end: ActiveValue::Set(record.period_end),
            total_income_minor: ActiveValue::Set(record.total_income_minor),
            distributed_at: ActiveValue::Set(record.distributed_at),
        }
    }
}

impl TryFrom<Model> for IncomeRecord {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "income record")?,
            project_id: parse_uuid(&model.project_id, "project")?,
            period_start: model.period_start,
            period_end: model.period_end,
            total_income_minor: model.total_income_minor,
            distributed_at: model.distributed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn adjacent_periods_do_not_overlap() {
        let record = IncomeRecord {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            period_start: day(1),
            period_end: day(10),
            total_income_minor: 100,
            distributed_at: day(10),
        };

        assert!(!record.overlaps(day(10), day(20)));
        assert!(record.overlaps(day(9), day(20)));
        assert!(record.overlaps(day(2), day(3)));
        assert!(record.overlaps(day(1), day(31)));
    }
}

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    EngineError, IncomeRecord, LedgerEvent, OwnerPayout, Payout, ProjectStatus, ResultEngine,
    distribution::split_pro_rata,
    income_payouts, income_records,
    util::{require_positive, require_user_id},
};

use super::{Engine, load_holdings, load_project, with_tx};

impl Engine {
    /// Splits `total_income_minor` earned in `[period_start, period_end)` across
    /// the project's holders, pro rata to their holdings at this instant.
    ///
    /// The payouts sum to `total_income_minor` exactly; the rounding remainder
    /// goes to the largest holder (ties broken by the lowest owner id).
    ///
    /// Errors:
    /// - `ProjectNotActive` unless the project is `active`
    /// - `DuplicatePeriod` when the period overlaps an earlier distribution
    pub async fn distribute(
        &self,
        project_id: Uuid,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        total_income_minor: i64,
        at: DateTime<Utc>,
    ) -> ResultEngine<(IncomeRecord, Vec<Payout>)> {
        if period_start >= period_end {
            return Err(EngineError::InvalidAmount(
                "period_start must be before period_end".to_string(),
            ));
        }
        require_positive(total_income_minor, "total income")?;

        let _guard = self.locks.acquire(project_id).await;
        let (record, payouts) = with_tx!(self, |db_tx| {
            let project = load_project(&db_tx, project_id).await?;
            if project.status != ProjectStatus::Active {
                return Err(EngineError::ProjectNotActive(format!(
                    "project {project_id} is {}",
                    project.status.as_str()
                )));
            }

            let overlapping = income_records::Entity::find()
                .filter(income_records::Column::ProjectId.eq(project_id.to_string()))
                .filter(income_records::Column::PeriodStart.lt(period_end))
                .filter(income_records::Column::PeriodEnd.gt(period_start))
                .one(&db_tx)
                .await?;
            if let Some(existing) = overlapping {
                return Err(EngineError::DuplicatePeriod(format!(
                    "period overlaps distribution {} ({} - {})",
                    existing.id, existing.period_start, existing.period_end
                )));
            }

            let snapshot: Vec<(String, i64)> = load_holdings(&db_tx, project_id)
                .await?
                .into_iter()
                .filter(|h| h.share_count > 0)
                .map(|h| (h.owner_id, h.share_count))
                .collect();
            let shares = split_pro_rata(&snapshot, total_income_minor)?;

            let record = IncomeRecord {
                id: Uuid::new_v4(),
                project_id,
                period_start,
                period_end,
                total_income_minor,
                distributed_at: at,
            };
            income_records::ActiveModel::from(&record)
                .insert(&db_tx)
                .await?;

            let mut payouts = Vec::with_capacity(shares.len());
            for share in shares {
                let payout = Payout {
                    id: Uuid::new_v4(),
                    income_record_id: record.id,
                    owner_id: share.owner_id,
                    share_count: share.share_count,
                    amount_minor: share.amount_minor,
                };
                income_payouts::ActiveModel::from(&payout)
                    .insert(&db_tx)
                    .await?;
                payouts.push(payout);
            }

            tracing::debug!(
                %project_id,
                record_id = %record.id,
                payouts = payouts.len(),
                "income split"
            );
            Ok((record, payouts))
        })?;

        self.publish(&[LedgerEvent::Distributed {
            record: record.clone(),
            payouts: payouts.clone(),
        }]);
        Ok((record, payouts))
    }

    /// Distributions of a project, most recent period first.
    pub async fn income_records(&self, project_id: Uuid) -> ResultEngine<Vec<IncomeRecord>> {
        with_tx!(self, |db_tx| {
            load_project(&db_tx, project_id).await?;
            income_records::Entity::find()
                .filter(income_records::Column::ProjectId.eq(project_id.to_string()))
                .order_by_desc(income_records::Column::PeriodStart)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(IncomeRecord::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Payouts of one distribution, ordered by owner id.
    pub async fn payouts(&self, record_id: Uuid) -> ResultEngine<Vec<Payout>> {
        with_tx!(self, |db_tx| {
            income_records::Entity::find_by_id(record_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("income record not exists".to_string()))?;
            income_payouts::Entity::find()
                .filter(income_payouts::Column::IncomeRecordId.eq(record_id.to_string()))
                .order_by_asc(income_payouts::Column::OwnerId)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Payout::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Payouts made to `owner_id`, most recent period first, optionally
    /// restricted to one project.
    pub async fn owner_payouts(
        &self,
        owner_id: &str,
        project_id: Option<Uuid>,
    ) -> ResultEngine<Vec<OwnerPayout>> {
        let owner_id = require_user_id(owner_id, "owner_id")?;
        with_tx!(self, |db_tx| {
            let mut query = income_payouts::Entity::find()
                .find_also_related(income_records::Entity)
                .filter(income_payouts::Column::OwnerId.eq(owner_id));
            if let Some(project_id) = project_id {
                query =
                    query.filter(income_records::Column::ProjectId.eq(project_id.to_string()));
            }
            let rows = query
                .order_by_desc(income_records::Column::PeriodStart)
                .order_by_asc(income_payouts::Column::Id)
                .all(&db_tx)
                .await?;

            let mut payouts = Vec::with_capacity(rows.len());
            for (payout, record) in rows {
                let record = record.ok_or_else(|| {
                    EngineError::KeyNotFound("income record not exists".to_string())
                })?;
                let record = IncomeRecord::try_from(record)?;
                payouts.push(OwnerPayout {
                    project_id: record.project_id,
                    income_record_id: record.id,
                    period_start: record.period_start,
                    period_end: record.period_end,
                    distributed_at: record.distributed_at,
                    share_count: payout.share_count,
                    amount_minor: payout.amount_minor,
                });
            }
            Ok(payouts)
        })
    }
}

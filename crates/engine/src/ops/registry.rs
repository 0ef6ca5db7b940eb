use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue, TransactionTrait};
use uuid::Uuid;

use crate::{
    EngineError, Holding, ProjectStatus, ResultEngine, projects,
    util::{require_positive, require_user_id},
};

use super::{
    Engine, credit_shares, ensure_tradable, find_holding, load_holdings, load_project,
    require_holding, save_holding, with_tx,
};

impl Engine {
    /// Sells `count` new shares of a fundraising project to `owner_id`.
    ///
    /// Raises the project's `raised_amount` by `count * share_unit_price` and
    /// returns the owner's new holding.
    ///
    /// Errors:
    /// - `OverAllocation` when the project has fewer than `count` unsold shares
    /// - `InvalidProject` when the project is not fundraising or its window
    ///   closed before `acquired_at`
    pub async fn allocate(
        &self,
        project_id: Uuid,
        owner_id: &str,
        count: i64,
        acquired_at: DateTime<Utc>,
    ) -> ResultEngine<i64> {
        let owner_id = require_user_id(owner_id, "owner_id")?;
        require_positive(count, "share count")?;

        let _guard = self.locks.acquire(project_id).await;
        with_tx!(self, |db_tx| {
            let project = load_project(&db_tx, project_id).await?;
            if project.status != ProjectStatus::Fundraising {
                return Err(EngineError::InvalidProject(format!(
                    "project {project_id} is {}, allocation is closed",
                    project.status.as_str()
                )));
            }
            if acquired_at >= project.closes_at {
                return Err(EngineError::InvalidProject(format!(
                    "fundraising of project {project_id} closed at {}",
                    project.closes_at
                )));
            }

            let allocated: i64 = load_holdings(&db_tx, project_id)
                .await?
                .iter()
                .map(|h| h.share_count)
                .sum();
            let requested_total = allocated
                .checked_add(count)
                .ok_or_else(|| EngineError::InvalidAmount("share count too large".to_string()))?;
            if requested_total > project.total_shares {
                return Err(EngineError::OverAllocation(format!(
                    "requested {count} shares, {} of {} left",
                    project.total_shares - allocated,
                    project.total_shares
                )));
            }

            let raised = count
                .checked_mul(project.share_unit_price_minor)
                .and_then(|amount| amount.checked_add(project.raised_amount_minor))
                .ok_or_else(|| EngineError::InvalidAmount("raised amount too large".to_string()))?;
            let holding = credit_shares(&db_tx, project_id, &owner_id, count, acquired_at).await?;

            projects::ActiveModel {
                id: ActiveValue::Set(project_id.to_string()),
                raised_amount_minor: ActiveValue::Set(raised),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;

            tracing::debug!(%project_id, %owner_id, count, "shares allocated");
            Ok(holding)
        })
    }

    /// Moves `count` unreserved shares from `from_id` to `to_id`.
    ///
    /// Returns the receiver's new holding. The project must be `active`.
    pub async fn transfer(
        &self,
        project_id: Uuid,
        from_id: &str,
        to_id: &str,
        count: i64,
        at: DateTime<Utc>,
    ) -> ResultEngine<i64> {
        let from_id = require_user_id(from_id, "from_id")?;
        let to_id = require_user_id(to_id, "to_id")?;
        if from_id == to_id {
            return Err(EngineError::InvalidAmount(
                "from_id and to_id must differ".to_string(),
            ));
        }
        require_positive(count, "share count")?;

        let _guard = self.locks.acquire(project_id).await;
        with_tx!(self, |db_tx| {
            let project = load_project(&db_tx, project_id).await?;
            ensure_tradable(&project)?;

            let mut from = require_holding(&db_tx, project_id, &from_id).await?;
            from.debit(count)?;
            save_holding(&db_tx, &from, true).await?;
            let received = credit_shares(&db_tx, project_id, &to_id, count, at).await?;

            tracing::debug!(%project_id, %from_id, %to_id, count, "shares transferred");
            Ok(received)
        })
    }

    /// Current share count of `owner_id` (0 when the owner holds nothing).
    pub async fn holding_of(&self, project_id: Uuid, owner_id: &str) -> ResultEngine<i64> {
        let owner_id = require_user_id(owner_id, "owner_id")?;
        with_tx!(self, |db_tx| {
            load_project(&db_tx, project_id).await?;
            let holding = find_holding(&db_tx, project_id, &owner_id).await?;
            Ok(holding.map_or(0, |h| h.share_count))
        })
    }

    /// Shares allocated across all owners.
    pub async fn total_allocated(&self, project_id: Uuid) -> ResultEngine<i64> {
        with_tx!(self, |db_tx| {
            load_project(&db_tx, project_id).await?;
            let holdings = load_holdings(&db_tx, project_id).await?;
            Ok(holdings.iter().map(|h| h.share_count).sum())
        })
    }

    /// Non-empty holdings of a project, ordered by owner id.
    pub async fn holdings(&self, project_id: Uuid) -> ResultEngine<Vec<Holding>> {
        with_tx!(self, |db_tx| {
            load_project(&db_tx, project_id).await?;
            let holdings = load_holdings(&db_tx, project_id).await?;
            Ok(holdings.into_iter().filter(|h| h.share_count > 0).collect())
        })
    }
}

use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    EngineError, Holding, Participant, ParticipantRole, ProjectStatus, ResultEngine, holdings,
    income_payouts, income_records, participants,
    util::require_user_id,
};

use super::{Engine, load_holdings, load_project, with_tx};

/// Totals of one owner across every project.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Portfolio {
    pub project_count: u64,
    pub total_shares: i64,
    /// `Σ share_count * share_unit_price` at the primary price.
    pub total_investment_minor: i64,
    /// Income distributed to the owner so far.
    pub total_income_minor: i64,
}

/// One project in an owner's share list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OwnerHolding {
    pub project_id: Uuid,
    pub title: String,
    pub status: ProjectStatus,
    pub share_unit_price_minor: i64,
    pub share_count: i64,
    pub reserved: i64,
    pub acquired_at: DateTime<Utc>,
    /// Income paid out to the owner by this project so far.
    pub income_minor: i64,
}

impl Engine {
    /// Participants of a project with their current holdings, ordered by
    /// user id.
    pub async fn participants(&self, project_id: Uuid) -> ResultEngine<Vec<Participant>> {
        with_tx!(self, |db_tx| {
            load_project(&db_tx, project_id).await?;
            let holdings = load_holdings(&db_tx, project_id).await?;
            let models = participants::Entity::find()
                .filter(participants::Column::ProjectId.eq(project_id.to_string()))
                .order_by_asc(participants::Column::UserId)
                .all(&db_tx)
                .await?;

            let mut result = Vec::with_capacity(models.len());
            for model in models {
                let share_count = holdings
                    .iter()
                    .find(|h| h.owner_id == model.user_id)
                    .map_or(0, |h| h.share_count);
                result.push(Participant {
                    role: ParticipantRole::try_from(model.role.as_str())?,
                    user_id: model.user_id,
                    share_count,
                });
            }
            Ok(result)
        })
    }

    /// Role of `user_id` in the project, `None` if they never took part.
    pub async fn participant_role(
        &self,
        project_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Option<ParticipantRole>> {
        let user_id = require_user_id(user_id, "user_id")?;
        with_tx!(self, |db_tx| {
            load_project(&db_tx, project_id).await?;
            participants::Entity::find_by_id((project_id.to_string(), user_id))
                .one(&db_tx)
                .await?
                .map(|model| ParticipantRole::try_from(model.role.as_str()))
                .transpose()
        })
    }

    /// Gives `user_id` the platform role on a project, which lets them manage
    /// it alongside the operator. Investors are promoted in place.
    pub async fn grant_platform(&self, project_id: Uuid, user_id: &str) -> ResultEngine<()> {
        let user_id = require_user_id(user_id, "user_id")?;
        let _guard = self.locks.acquire(project_id).await;
        with_tx!(self, |db_tx| {
            let project = load_project(&db_tx, project_id).await?;
            if project.status.is_terminal() {
                return Err(EngineError::InvalidProject(format!(
                    "project {project_id} is {}",
                    project.status.as_str()
                )));
            }
            if project.operator_id == user_id {
                return Err(EngineError::Forbidden(format!(
                    "{user_id} already operates project {project_id}"
                )));
            }

            let existing =
                participants::Entity::find_by_id((project_id.to_string(), user_id.clone()))
                    .one(&db_tx)
                    .await?;
            let model = participants::ActiveModel {
                project_id: ActiveValue::Set(project_id.to_string()),
                user_id: ActiveValue::Set(user_id.clone()),
                role: ActiveValue::Set(ParticipantRole::Platform.as_str().to_string()),
            };
            if existing.is_some() {
                model.update(&db_tx).await?;
            } else {
                model.insert(&db_tx).await?;
            }
            tracing::info!(%project_id, %user_id, "platform role granted");
            Ok(())
        })
    }

    /// Projects `owner_id` holds shares in, with the income each has paid
    /// them, newest acquisition first.
    pub async fn owner_holdings(&self, owner_id: &str) -> ResultEngine<Vec<OwnerHolding>> {
        let owner_id = require_user_id(owner_id, "owner_id")?;
        with_tx!(self, |db_tx| {
            let owned = holdings::Entity::find()
                .filter(holdings::Column::OwnerId.eq(owner_id.clone()))
                .filter(holdings::Column::ShareCount.gt(0))
                .order_by_desc(holdings::Column::AcquiredAt)
                .order_by_asc(holdings::Column::ProjectId)
                .all(&db_tx)
                .await?;

            let mut result = Vec::with_capacity(owned.len());
            for model in owned {
                let holding = Holding::try_from(model)?;
                let project = load_project(&db_tx, holding.project_id).await?;
                let income_minor = income_payouts::Entity::find()
                    .find_also_related(income_records::Entity)
                    .filter(income_payouts::Column::OwnerId.eq(owner_id.clone()))
                    .filter(income_records::Column::ProjectId.eq(project.id.to_string()))
                    .all(&db_tx)
                    .await?
                    .iter()
                    .map(|(payout, _)| payout.amount_minor)
                    .sum();
                result.push(OwnerHolding {
                    project_id: project.id,
                    title: project.title,
                    status: project.status,
                    share_unit_price_minor: project.share_unit_price_minor,
                    share_count: holding.share_count,
                    reserved: holding.reserved,
                    acquired_at: holding.acquired_at,
                    income_minor,
                });
            }
            Ok(result)
        })
    }

    pub async fn portfolio(&self, owner_id: &str) -> ResultEngine<Portfolio> {
        let mut portfolio = Portfolio::default();
        for holding in self.owner_holdings(owner_id).await? {
            portfolio.total_investment_minor = holding
                .share_count
                .checked_mul(holding.share_unit_price_minor)
                .and_then(|amount| amount.checked_add(portfolio.total_investment_minor))
                .ok_or_else(|| EngineError::InvalidAmount("investment too large".to_string()))?;
            portfolio.project_count += 1;
            portfolio.total_shares += holding.share_count;
        }

        // Income from projects the owner has since sold out of counts too.
        portfolio.total_income_minor = self
            .owner_payouts(owner_id, None)
            .await?
            .iter()
            .map(|payout| payout.amount_minor)
            .sum();
        Ok(portfolio)
    }
}

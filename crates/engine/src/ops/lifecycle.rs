use chrono::{DateTime, TimeDelta, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    EngineError, LedgerEvent, NewProjectCmd, ParticipantRole, Project, ProjectFilter,
    ProjectStatus, Refund, ResultEngine, ShareTransaction, TransactionStatus, participants,
    projects, share_transactions,
    util::{normalize_required_name, require_positive, require_user_id},
};

use super::{
    Engine, ensure_participant, load_holdings, load_project, matcher::cancel_open, with_tx,
};

/// What a [`Engine::sweep`] pass changed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Listings cancelled for exceeding the listing TTL.
    pub cancelled: Vec<Uuid>,
    /// Under-funded projects refunded after their window closed.
    pub refunded: Vec<Uuid>,
}

async fn set_status(
    db: &DatabaseTransaction,
    project: &mut Project,
    next: ProjectStatus,
) -> ResultEngine<LedgerEvent> {
    let from = project.status;
    project.status = from.transition(next)?;
    projects::ActiveModel {
        id: ActiveValue::Set(project.id.to_string()),
        status: ActiveValue::Set(next.as_str().to_string()),
        ..Default::default()
    }
    .update(db)
    .await?;
    Ok(LedgerEvent::StatusChanged {
        project_id: project.id,
        from,
        to: next,
    })
}

impl Engine {
    /// Opens a new project for fundraising.
    ///
    /// The target amount is `total_shares * share_unit_price_minor`; the
    /// operator is registered as the first participant.
    pub async fn create_project(&self, cmd: NewProjectCmd) -> ResultEngine<Project> {
        let title = normalize_required_name(&cmd.title, "title")?;
        let operator_id = require_user_id(&cmd.operator_id, "operator_id")?;
        require_positive(cmd.total_shares, "total shares")?;
        require_positive(cmd.share_unit_price_minor, "share unit price")?;
        let target_amount_minor = cmd
            .total_shares
            .checked_mul(cmd.share_unit_price_minor)
            .ok_or_else(|| EngineError::InvalidAmount("target amount too large".to_string()))?;
        if cmd.closes_at <= cmd.created_at {
            return Err(EngineError::InvalidAmount(
                "closes_at must be after created_at".to_string(),
            ));
        }

        let project = Project {
            id: Uuid::new_v4(),
            title,
            vehicle_model_id: cmd.vehicle_model_id.trim().to_string(),
            operator_id,
            currency: cmd.currency,
            target_amount_minor,
            raised_amount_minor: 0,
            share_unit_price_minor: cmd.share_unit_price_minor,
            total_shares: cmd.total_shares,
            status: ProjectStatus::Fundraising,
            created_at: cmd.created_at,
            closes_at: cmd.closes_at,
        };

        with_tx!(self, |db_tx| {
            projects::ActiveModel::from(&project).insert(&db_tx).await?;
            ensure_participant(
                &db_tx,
                project.id,
                &project.operator_id,
                ParticipantRole::Operator,
            )
            .await?;
            tracing::info!(project_id = %project.id, title = %project.title, "project created");
            Ok(project)
        })
    }

    /// Return one project.
    pub async fn project(&self, project_id: Uuid) -> ResultEngine<Project> {
        with_tx!(self, |db_tx| load_project(&db_tx, project_id).await)
    }

    /// Projects matching `filter`, newest first.
    pub async fn projects(&self, filter: &ProjectFilter) -> ResultEngine<Vec<Project>> {
        with_tx!(self, |db_tx| {
            let mut query = projects::Entity::find();
            if let Some(status) = filter.status {
                query = query.filter(projects::Column::Status.eq(status.as_str()));
            }
            if let Some(operator_id) = &filter.operator_id {
                query = query.filter(projects::Column::OperatorId.eq(operator_id.trim()));
            }
            if let Some(participant_id) = &filter.participant_id {
                let joined: Vec<String> = participants::Entity::find()
                    .filter(participants::Column::UserId.eq(participant_id.trim()))
                    .all(&db_tx)
                    .await?
                    .into_iter()
                    .map(|model| model.project_id)
                    .collect();
                query = query.filter(projects::Column::Id.is_in(joined));
            }
            query
                .order_by_desc(projects::Column::CreatedAt)
                .order_by_asc(projects::Column::Id)
                .offset(filter.offset)
                .limit(filter.limit)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Project::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Starts operations of a fully funded project.
    pub async fn activate(&self, project_id: Uuid, at: DateTime<Utc>) -> ResultEngine<Project> {
        let _guard = self.locks.acquire(project_id).await;
        let (project, event) = with_tx!(self, |db_tx| {
            let mut project = load_project(&db_tx, project_id).await?;
            project.status.transition(ProjectStatus::Active)?;
            if project.raised_amount_minor != project.target_amount_minor {
                return Err(EngineError::InvalidProject(format!(
                    "project {project_id} raised {} of {}",
                    project.raised_amount_minor, project.target_amount_minor
                )));
            }
            let event = set_status(&db_tx, &mut project, ProjectStatus::Active).await?;
            Ok((project, event))
        })?;

        tracing::info!(%project_id, %at, "project activated");
        self.publish(&[event]);
        Ok(project)
    }

    /// Ends the operating term. Every open listing is cancelled and its
    /// reservation released.
    pub async fn close(&self, project_id: Uuid, at: DateTime<Utc>) -> ResultEngine<Project> {
        let _guard = self.locks.acquire(project_id).await;
        let (project, events) = with_tx!(self, |db_tx| {
            let mut project = load_project(&db_tx, project_id).await?;
            project.status.transition(ProjectStatus::Closed)?;

            let open = share_transactions::Entity::find()
                .filter(share_transactions::Column::ProjectId.eq(project_id.to_string()))
                .filter(share_transactions::Column::Status.is_in([
                    TransactionStatus::Listed.as_str(),
                    TransactionStatus::Matched.as_str(),
                ]))
                .all(&db_tx)
                .await?;

            let mut events = Vec::with_capacity(open.len() + 1);
            for model in open {
                let mut tx = ShareTransaction::try_from(model)?;
                cancel_open(&db_tx, &mut tx, at).await?;
                events.push(LedgerEvent::Cancelled {
                    transaction_id: tx.id,
                    project_id,
                    seller_id: tx.seller_id,
                });
            }
            events.push(set_status(&db_tx, &mut project, ProjectStatus::Closed).await?);
            Ok((project, events))
        })?;

        tracing::info!(%project_id, cancelled = events.len() - 1, "project closed");
        self.publish(&events);
        Ok(project)
    }

    /// Refunds an under-funded project whose window has closed.
    ///
    /// Holdings stay in place; the published [`LedgerEvent::Refunded`] tells
    /// the payment collaborator what each holder is owed.
    pub async fn refund(
        &self,
        project_id: Uuid,
        at: DateTime<Utc>,
    ) -> ResultEngine<(Project, Vec<Refund>)> {
        let _guard = self.locks.acquire(project_id).await;
        let (project, refunds, event) = with_tx!(self, |db_tx| {
            let mut project = load_project(&db_tx, project_id).await?;
            project.status.transition(ProjectStatus::Refunded)?;
            if at < project.closes_at {
                return Err(EngineError::InvalidProject(format!(
                    "project {project_id} raises until {}",
                    project.closes_at
                )));
            }
            if project.target_met() {
                return Err(EngineError::InvalidProject(format!(
                    "project {project_id} reached its target"
                )));
            }

            let mut refunds = Vec::new();
            for holding in load_holdings(&db_tx, project_id).await? {
                if holding.share_count == 0 {
                    continue;
                }
                let amount_minor = holding
                    .share_count
                    .checked_mul(project.share_unit_price_minor)
                    .ok_or_else(|| EngineError::InvalidAmount("refund too large".to_string()))?;
                refunds.push(Refund {
                    owner_id: holding.owner_id,
                    share_count: holding.share_count,
                    amount_minor,
                });
            }
            let event = set_status(&db_tx, &mut project, ProjectStatus::Refunded).await?;
            Ok((project, refunds, event))
        })?;

        tracing::info!(%project_id, refunds = refunds.len(), "project refunded");
        self.publish(&[
            event,
            LedgerEvent::Refunded {
                project_id,
                refunds: refunds.clone(),
            },
        ]);
        Ok((project, refunds))
    }

    /// Periodic housekeeping: expires stale listings and refunds overdue
    /// under-funded projects.
    ///
    /// Each change takes the project lock on its own, so a listing matched or
    /// a project activated concurrently is skipped rather than reported.
    pub async fn sweep(
        &self,
        at: DateTime<Utc>,
        listing_ttl: TimeDelta,
    ) -> ResultEngine<SweepReport> {
        let cutoff = at
            .checked_sub_signed(listing_ttl)
            .ok_or_else(|| EngineError::InvalidAmount("listing ttl too large".to_string()))?;
        let mut report = SweepReport::default();

        let stale: Vec<Uuid> = with_tx!(self, |db_tx| {
            share_transactions::Entity::find()
                .filter(share_transactions::Column::Status.eq(TransactionStatus::Listed.as_str()))
                .filter(share_transactions::Column::CreatedAt.lte(cutoff))
                .order_by_asc(share_transactions::Column::CreatedAt)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|model| ShareTransaction::try_from(model).map(|tx| tx.id))
                .collect::<ResultEngine<Vec<_>>>()
        })?;
        for transaction_id in stale {
            match self.cancel(transaction_id, at).await {
                Ok(_) => report.cancelled.push(transaction_id),
                Err(EngineError::TransactionNotListed(_)) => {}
                Err(err) => return Err(err),
            }
        }

        let overdue = self
            .projects(&ProjectFilter {
                status: Some(ProjectStatus::Fundraising),
                ..ProjectFilter::default()
            })
            .await?;
        for project in overdue {
            if project.closes_at > at || project.target_met() {
                continue;
            }
            match self.refund(project.id, at).await {
                Ok(_) => report.refunded.push(project.id),
                Err(EngineError::InvalidTransition(_) | EngineError::InvalidProject(_)) => {}
                Err(err) => return Err(err),
            }
        }

        if !report.cancelled.is_empty() || !report.refunded.is_empty() {
            tracing::info!(
                cancelled = report.cancelled.len(),
                refunded = report.refunded.len(),
                "sweep finished"
            );
        }
        Ok(report)
    }
}

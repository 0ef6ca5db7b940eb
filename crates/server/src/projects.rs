//! Project API endpoints: creation, lifecycle and the share registry.

use api_types::project::{
    Allocate, HoldingResponse, HoldingsResponse, ParticipantsResponse, ProjectList, ProjectNew,
    ProjectView, ProjectsResponse, RefundResponse, Transfer,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{EngineError, NewProjectCmd, ProjectFilter};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user, views};

/// Lifecycle and distribution calls are reserved to whoever manages the
/// project.
pub(crate) async fn require_manager(
    state: &ServerState,
    project_id: Uuid,
    username: &str,
) -> Result<(), ServerError> {
    let role = state.engine.participant_role(project_id, username).await?;
    if !role.is_some_and(|role| role.can_manage_project()) {
        return Err(EngineError::Forbidden(format!(
            "{username} does not manage project {project_id}"
        ))
        .into());
    }
    Ok(())
}

/// The caller becomes the operator of the new project.
pub async fn project_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ProjectNew>,
) -> Result<(StatusCode, Json<ProjectView>), ServerError> {
    let mut cmd = NewProjectCmd::new(
        payload.title,
        user.username,
        payload.total_shares,
        payload.share_unit_price_minor,
        Utc::now(),
        payload.closes_at.with_timezone(&Utc),
    );
    if let Some(model) = payload.vehicle_model_id {
        cmd = cmd.vehicle_model_id(model);
    }
    if let Some(currency) = payload.currency {
        cmd = cmd.currency(views::engine_currency(currency));
    }

    let project = state.engine.create_project(cmd).await?;
    Ok((StatusCode::CREATED, Json(views::project(project))))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<ProjectList>,
) -> Result<Json<ProjectsResponse>, ServerError> {
    let filter = ProjectFilter {
        status: query.status.map(views::engine_project_status),
        operator_id: query.operator_id,
        participant_id: query.mine.unwrap_or(false).then_some(user.username),
        limit: Some(query.limit.unwrap_or(50).min(200)),
        offset: query.offset.unwrap_or(0),
    };
    let projects = state
        .engine
        .projects(&filter)
        .await?
        .into_iter()
        .map(views::project)
        .collect();

    Ok(Json(ProjectsResponse { projects }))
}

pub async fn get(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ProjectView>, ServerError> {
    let project = state.engine.project(project_id).await?;
    Ok(Json(views::project(project)))
}

pub async fn activate(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ProjectView>, ServerError> {
    require_manager(&state, project_id, &user.username).await?;
    let project = state.engine.activate(project_id, Utc::now()).await?;
    Ok(Json(views::project(project)))
}

pub async fn close(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ProjectView>, ServerError> {
    require_manager(&state, project_id, &user.username).await?;
    let project = state.engine.close(project_id, Utc::now()).await?;
    Ok(Json(views::project(project)))
}

pub async fn refund(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<RefundResponse>, ServerError> {
    require_manager(&state, project_id, &user.username).await?;
    let (project, refunds) = state.engine.refund(project_id, Utc::now()).await?;
    Ok(Json(RefundResponse {
        project: views::project(project),
        refunds: refunds.into_iter().map(views::refund).collect(),
    }))
}

/// Primary sale: the caller buys new shares.
pub async fn allocate(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<Allocate>,
) -> Result<Json<HoldingResponse>, ServerError> {
    let share_count = state
        .engine
        .allocate(project_id, &user.username, payload.share_count, Utc::now())
        .await?;
    Ok(Json(HoldingResponse {
        owner_id: user.username,
        share_count,
    }))
}

pub async fn transfer(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<Transfer>,
) -> Result<Json<HoldingResponse>, ServerError> {
    let share_count = state
        .engine
        .transfer(
            project_id,
            &user.username,
            &payload.to_user,
            payload.share_count,
            Utc::now(),
        )
        .await?;
    Ok(Json(HoldingResponse {
        owner_id: payload.to_user,
        share_count,
    }))
}

pub async fn holdings(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<HoldingsResponse>, ServerError> {
    let holdings = state.engine.holdings(project_id).await?;
    Ok(Json(HoldingsResponse {
        total_allocated: holdings.iter().map(|h| h.share_count).sum(),
        holdings: holdings.into_iter().map(views::holding).collect(),
    }))
}

pub async fn participants(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ParticipantsResponse>, ServerError> {
    let participants = state
        .engine
        .participants(project_id)
        .await?
        .into_iter()
        .map(views::participant)
        .collect();
    Ok(Json(ParticipantsResponse { participants }))
}

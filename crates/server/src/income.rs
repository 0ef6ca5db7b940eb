//! Income distribution endpoints.

use api_types::income::{DistributeNew, IncomeRecordView, IncomeResponse};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{ServerError, projects::require_manager, server::ServerState, user, views};

pub async fn distribute(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<DistributeNew>,
) -> Result<(StatusCode, Json<IncomeRecordView>), ServerError> {
    require_manager(&state, project_id, &user.username).await?;
    let (record, payouts) = state
        .engine
        .distribute(
            project_id,
            payload.period_start.with_timezone(&Utc),
            payload.period_end.with_timezone(&Utc),
            payload.total_income_minor,
            Utc::now(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(views::income_record(record, payouts)),
    ))
}

/// Every distribution of the project with its payouts, most recent first.
pub async fn list(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<IncomeResponse>, ServerError> {
    let mut records = Vec::new();
    for record in state.engine.income_records(project_id).await? {
        let payouts = state.engine.payouts(record.id).await?;
        records.push(views::income_record(record, payouts));
    }
    Ok(Json(IncomeResponse { records }))
}

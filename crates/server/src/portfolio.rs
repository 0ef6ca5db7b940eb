use api_types::portfolio::{IncomeHistoryResponse, IncomeQuery, PortfolioView, SharesResponse};
use axum::{
    Extension, Json,
    extract::{Query, State},
};

use crate::{ServerError, server::ServerState, user, views};

/// Handle requests for the caller's totals across projects
pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<PortfolioView>, ServerError> {
    let portfolio = state.engine.portfolio(&user.username).await?;
    Ok(Json(PortfolioView {
        project_count: portfolio.project_count,
        total_shares: portfolio.total_shares,
        total_investment_minor: portfolio.total_investment_minor,
        total_income_minor: portfolio.total_income_minor,
    }))
}

/// The caller's holdings, one entry per project.
pub async fn shares(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<SharesResponse>, ServerError> {
    let shares = state
        .engine
        .owner_holdings(&user.username)
        .await?
        .into_iter()
        .map(views::share)
        .collect();
    Ok(Json(SharesResponse { shares }))
}

pub async fn income(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<IncomeQuery>,
) -> Result<Json<IncomeHistoryResponse>, ServerError> {
    let entries = state
        .engine
        .owner_payouts(&user.username, query.project_id)
        .await?
        .into_iter()
        .map(views::income_entry)
        .collect();
    Ok(Json(IncomeHistoryResponse { entries }))
}

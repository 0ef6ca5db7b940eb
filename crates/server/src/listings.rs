//! Secondary market endpoints.
//!
//! The authenticated user is the seller when listing and the buyer when
//! matching.

use api_types::listing::{ListingNew, ListingView, MarketQuery, MarketResponse};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{EngineError, MarketFilter};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user, views};

pub async fn listing_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ListingNew>,
) -> Result<(StatusCode, Json<ListingView>), ServerError> {
    let tx = state
        .engine
        .list(
            payload.project_id,
            &user.username,
            payload.share_count,
            payload.price_per_share_minor,
            Utc::now(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(views::listing(tx))))
}

pub async fn market(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<MarketQuery>,
) -> Result<Json<MarketResponse>, ServerError> {
    let mut filter = MarketFilter::default();
    if let Some(project_id) = query.project_id {
        filter = filter.project(project_id);
    }
    if let Some(sort) = query.sort {
        filter = filter.sort(views::engine_market_sort(sort));
    }
    if let Some(limit) = query.limit {
        filter = filter.limit(limit.min(200));
    }
    if let Some(offset) = query.offset {
        filter = filter.offset(offset);
    }

    let listings = state
        .engine
        .market(&filter)
        .await?
        .into_iter()
        .map(views::listing)
        .collect();
    Ok(Json(MarketResponse { listings }))
}

pub async fn get(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<ListingView>, ServerError> {
    let tx = state.engine.transaction(transaction_id).await?;
    Ok(Json(views::listing(tx)))
}

pub async fn match_buyer(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<ListingView>, ServerError> {
    let tx = state
        .engine
        .match_buyer(transaction_id, &user.username, Utc::now())
        .await?;
    Ok(Json(views::listing(tx)))
}

/// Settles the trade. Either party may complete it.
pub async fn complete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<ListingView>, ServerError> {
    let tx = state.engine.transaction(transaction_id).await?;
    if tx.seller_id != user.username && tx.buyer_id.as_deref() != Some(user.username.as_str()) {
        return Err(EngineError::Forbidden("only seller or buyer can complete".to_string()).into());
    }
    let tx = state.engine.complete(transaction_id, Utc::now()).await?;
    Ok(Json(views::listing(tx)))
}

/// Withdraws a listing. Only the seller can cancel.
pub async fn cancel(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<ListingView>, ServerError> {
    let tx = state.engine.transaction(transaction_id).await?;
    if tx.seller_id != user.username {
        return Err(EngineError::Forbidden("only the seller can cancel".to_string()).into());
    }
    let tx = state.engine.cancel(transaction_id, Utc::now()).await?;
    Ok(Json(views::listing(tx)))
}

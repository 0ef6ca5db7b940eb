use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{ServerState, app, run, run_with_listener};

mod income;
mod listings;
mod portfolio;
mod projects;
mod server;
mod user;
mod views;

pub mod types {
    pub mod project {
        pub use api_types::project::{
            Allocate, HoldingResponse, HoldingView, HoldingsResponse, ParticipantRole,
            ParticipantView, ParticipantsResponse, ProjectList, ProjectNew, ProjectStatus,
            ProjectView, ProjectsResponse, RefundResponse, RefundView, Transfer,
        };
    }

    pub mod listing {
        pub use api_types::listing::{
            ListingNew, ListingView, MarketQuery, MarketResponse, MarketSort, SettlementView,
            TransactionStatus,
        };
    }

    pub mod income {
        pub use api_types::income::{DistributeNew, IncomeRecordView, IncomeResponse, PayoutView};
    }

    pub mod portfolio {
        pub use api_types::portfolio::{
            IncomeEntryView, IncomeHistoryResponse, IncomeQuery, PortfolioView, ShareView,
            SharesResponse,
        };
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
    retryable: bool,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::TransactionNotListed(_)
        | EngineError::TransactionNotMatched(_)
        | EngineError::DuplicatePeriod(_)
        | EngineError::InvalidTransition(_) => StatusCode::CONFLICT,
        EngineError::TransactionFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::OverAllocation(_)
        | EngineError::InsufficientShares(_)
        | EngineError::InvalidProject(_)
        | EngineError::SelfTrade(_)
        | EngineError::ProjectNotActive(_)
        | EngineError::InvalidAmount(_)
        | EngineError::InvalidId(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error, retryable) = match self {
            ServerError::Engine(err) => {
                let retryable = err.is_retryable();
                (
                    status_for_engine_error(&err),
                    message_for_engine_error(err),
                    retryable,
                )
            }
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err, false),
        };

        (status, Json(Error { error, retryable })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

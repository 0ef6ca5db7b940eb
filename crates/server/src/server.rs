use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::sync::Arc;

use crate::{income, listings, portfolio, projects, user};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
}

async fn auth(
    auth_header: TypedHeader<Authorization<Basic>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user: Option<user::Model> = user::Entity::find()
        .filter(user::Column::Username.eq(auth_header.username()))
        .filter(user::Column::Password.eq(auth_header.password()))
        .one(&state.db)
        .await
        .map_err(|err| {
            tracing::error!("user lookup failed: {err}");
            StatusCode::UNAUTHORIZED
        })?;

    let Some(user) = user else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/projects", post(projects::project_new).get(projects::list))
        .route("/projects/{id}", get(projects::get))
        .route("/projects/{id}/activate", post(projects::activate))
        .route("/projects/{id}/close", post(projects::close))
        .route("/projects/{id}/refund", post(projects::refund))
        .route("/projects/{id}/allocate", post(projects::allocate))
        .route("/projects/{id}/transfer", post(projects::transfer))
        .route("/projects/{id}/holdings", get(projects::holdings))
        .route("/projects/{id}/participants", get(projects::participants))
        .route("/projects/{id}/distribute", post(income::distribute))
        .route("/projects/{id}/income", get(income::list))
        .route("/listings", post(listings::listing_new))
        .route("/listings/{id}", get(listings::get))
        .route("/listings/{id}/match", post(listings::match_buyer))
        .route("/listings/{id}/complete", post(listings::complete))
        .route("/listings/{id}/cancel", post(listings::cancel))
        .route("/market", get(listings::market))
        .route("/portfolio", get(portfolio::get))
        .route("/portfolio/shares", get(portfolio::shares))
        .route("/portfolio/income", get(portfolio::income))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

/// The full API with authentication, ready to be served or driven in tests.
///
/// The engine is shared so background jobs (the sweep) serialize on the same
/// project locks as requests.
pub fn app(engine: Arc<Engine>, db: DatabaseConnection) -> Router {
    router(ServerState { engine, db })
}

pub async fn run(engine: Arc<Engine>, db: DatabaseConnection, bind: &str, port: u16) {
    let listener = match tokio::net::TcpListener::bind((bind, port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {bind}:{port}: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, db, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Arc<Engine>,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app(engine, db)).await
}

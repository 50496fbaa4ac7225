pub mod auth;
pub mod blog;

use axum::http::header;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full application router with middleware applied.
/// Shared by `main` and the integration tests.
pub fn app(state: AppState) -> Router {
    // Mirrors the frontend's needs: any origin, JSON bodies, bearer auth.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .merge(auth::router())
        .merge(blog::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

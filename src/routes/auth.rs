use axum::routing::{get, post};
use axum::Router;

use crate::auth::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register/", post(handlers::register))
        .route("/login/", post(handlers::login))
        .route("/logout/", post(handlers::logout))
        .route("/token/refresh/", post(handlers::refresh))
        .route("/check/", get(handlers::check))
        .route(
            "/profile/",
            get(handlers::get_profile).put(handlers::update_profile),
        )
}

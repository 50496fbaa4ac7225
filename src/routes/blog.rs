use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::blog::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/post/", post(handlers::create_post))
        .route("/post/{post_id}/details/", get(handlers::get_post_details))
        .route("/blog/post/{post_id}/update/", put(handlers::update_post))
        .route("/blog/post/{post_id}/delete/", delete(handlers::delete_post))
        .route("/post/{post_id}/comment/", post(handlers::create_comment))
        .route(
            "/blog/comment/{comment_id}/update/",
            put(handlers::update_comment),
        )
        .route(
            "/blog/comment/{comment_id}/delete/",
            delete(handlers::delete_comment),
        )
        .route("/comment/{comment_id}/reply/", post(handlers::reply_to_comment))
        .route("/post/{post_id}/like/", post(handlers::like_post))
        .route("/post/{post_id}/unlike/", delete(handlers::unlike_post))
        .route("/comment/{comment_id}/like/", post(handlers::like_comment))
        .route(
            "/comment/{comment_id}/unlike/",
            delete(handlers::unlike_comment),
        )
        .route("/like/", post(handlers::like_by_target))
        .route("/unlike/", post(handlers::unlike_by_target))
}

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::blog::reactions::{self, LikeTarget};
use crate::blog::store;
use crate::blog::thread::{self, AuthorSnapshot, PostDetail};
use crate::db::models::{Comment, Post};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct PostBodyRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    pub content: Option<String>,
    pub parent_comment: Option<i64>,
}

#[derive(Deserialize)]
pub struct CommentContentRequest {
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub struct LikeTargetRequest {
    pub post: Option<i64>,
    pub comment: Option<i64>,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct PostPayload {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author: AuthorSnapshot,
    pub created_at: String,
}

impl PostPayload {
    fn new(post: Post, author: AuthorSnapshot) -> Self {
        PostPayload {
            id: post.id,
            title: post.title,
            content: post.content,
            author,
            created_at: post.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentPayload {
    pub id: i64,
    pub post: i64,
    pub author: AuthorSnapshot,
    pub content: String,
    pub created_at: String,
    pub parent_comment: Option<i64>,
}

impl CommentPayload {
    fn new(comment: Comment, author: AuthorSnapshot) -> Self {
        CommentPayload {
            id: comment.id,
            post: comment.post_id,
            author,
            content: comment.content,
            created_at: comment.created_at,
            parent_comment: comment.parent_id,
        }
    }
}

// -- Post handlers --

/// POST /post/ — create a post.
pub async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<PostBodyRequest>,
) -> AppResult<Response> {
    let (title, content) = validate_post_body(req)?;

    let conn = state.db.get()?;
    let post = store::create_post(&conn, user.id, &title, &content)?;

    let payload = PostPayload::new(post, snapshot(&user));
    Ok((StatusCode::CREATED, Json(payload)).into_response())
}

/// GET /post/{id}/details/ — the assembled post document.
pub async fn get_post_details(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> AppResult<Json<PostDetail>> {
    let conn = state.db.get()?;
    Ok(Json(thread::post_detail(&conn, post_id)?))
}

/// PUT /blog/post/{id}/update/ — full update, author only.
pub async fn update_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
    Json(req): Json<PostBodyRequest>,
) -> AppResult<Json<PostPayload>> {
    let (title, content) = validate_post_body(req)?;

    let conn = state.db.get()?;
    let post = store::get_post(&conn, post_id)?;
    ensure_author(post.author_id, &user)?;

    let updated = store::update_post(&conn, post_id, &title, &content)?;
    Ok(Json(PostPayload::new(updated, snapshot(&user))))
}

/// DELETE /blog/post/{id}/delete/ — author only; cascades to comments and likes.
pub async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let post = store::get_post(&conn, post_id)?;
    ensure_author(post.author_id, &user)?;

    store::delete_post(&conn, post_id)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

// -- Comment handlers --

/// POST /post/{id}/comment/ — comment on a post, optionally under a parent.
pub async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<Response> {
    let content = required_text(req.content, "content")?;

    let conn = state.db.get()?;
    let comment = store::create_comment(&conn, user.id, post_id, &content, req.parent_comment)?;

    let payload = CommentPayload::new(comment, snapshot(&user));
    Ok((StatusCode::CREATED, Json(payload)).into_response())
}

/// PUT /blog/comment/{id}/update/ — author only.
pub async fn update_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(comment_id): Path<i64>,
    Json(req): Json<CommentContentRequest>,
) -> AppResult<Json<CommentPayload>> {
    let content = required_text(req.content, "content")?;

    let conn = state.db.get()?;
    let comment = store::get_comment(&conn, comment_id)?;
    ensure_author(comment.author_id, &user)?;

    let updated = store::update_comment(&conn, comment_id, &content)?;
    Ok(Json(CommentPayload::new(updated, snapshot(&user))))
}

/// DELETE /blog/comment/{id}/delete/ — author only; cascades to replies and likes.
pub async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(comment_id): Path<i64>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let comment = store::get_comment(&conn, comment_id)?;
    ensure_author(comment.author_id, &user)?;

    store::delete_comment(&conn, comment_id)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// POST /comment/{id}/reply/ — reply under an existing comment.
/// The reply lands on the parent's post; clients cannot redirect it.
pub async fn reply_to_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(comment_id): Path<i64>,
    Json(req): Json<CommentContentRequest>,
) -> AppResult<Response> {
    let content = required_text(req.content, "content")?;

    let conn = state.db.get()?;
    let parent = store::get_comment(&conn, comment_id)?;
    let comment = store::create_comment(&conn, user.id, parent.post_id, &content, Some(parent.id))?;

    let payload = CommentPayload::new(comment, snapshot(&user));
    Ok((StatusCode::CREATED, Json(payload)).into_response())
}

// -- Like handlers --

/// POST /post/{id}/like/
pub async fn like_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    reactions::like(&conn, user.id, LikeTarget::Post(post_id))?;

    let body = serde_json::json!({ "message": "Post liked successfully" });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// DELETE /post/{id}/unlike/
pub async fn unlike_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    reactions::unlike(&conn, user.id, LikeTarget::Post(post_id))?;

    let body = serde_json::json!({ "message": "Post unliked successfully" });
    Ok(Json(body).into_response())
}

/// POST /comment/{id}/like/
pub async fn like_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(comment_id): Path<i64>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    reactions::like(&conn, user.id, LikeTarget::Comment(comment_id))?;

    let body = serde_json::json!({ "message": "Comment liked successfully" });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// DELETE /comment/{id}/unlike/
pub async fn unlike_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(comment_id): Path<i64>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    reactions::unlike(&conn, user.id, LikeTarget::Comment(comment_id))?;

    let body = serde_json::json!({ "message": "Comment unliked successfully" });
    Ok(Json(body).into_response())
}

/// POST /like/ — like with the target in the body; exactly one of
/// `post`/`comment` must be set.
pub async fn like_by_target(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<LikeTargetRequest>,
) -> AppResult<Response> {
    let target = LikeTarget::from_parts(req.post, req.comment)?;

    let conn = state.db.get()?;
    reactions::like(&conn, user.id, target)?;

    let message = match target {
        LikeTarget::Post(_) => "Post liked successfully",
        LikeTarget::Comment(_) => "Comment liked successfully",
    };
    let body = serde_json::json!({ "message": message });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// POST /unlike/ — unlike with the target in the body.
pub async fn unlike_by_target(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<LikeTargetRequest>,
) -> AppResult<Response> {
    let target = LikeTarget::from_parts(req.post, req.comment)?;

    let conn = state.db.get()?;
    reactions::unlike(&conn, user.id, target)?;

    let message = match target {
        LikeTarget::Post(_) => "Post unliked successfully",
        LikeTarget::Comment(_) => "Comment unliked successfully",
    };
    let body = serde_json::json!({ "message": message });
    Ok(Json(body).into_response())
}

// -- Validation helpers --

fn validate_post_body(req: PostBodyRequest) -> AppResult<(String, String)> {
    let title = required_text(req.title, "title")?;
    if title.len() > 255 {
        return Err(AppError::BadRequest(
            "Title must be 255 characters or less".into(),
        ));
    }
    let content = required_text(req.content, "content")?;
    Ok((title, content))
}

fn required_text(value: Option<String>, field: &str) -> AppResult<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("{} is required", field)))
}

fn ensure_author(author_id: i64, user: &CurrentUser) -> AppResult<()> {
    if author_id != user.id {
        return Err(AppError::Unauthorized(
            "You do not have permission to perform this action".into(),
        ));
    }
    Ok(())
}

fn snapshot(user: &CurrentUser) -> AuthorSnapshot {
    AuthorSnapshot {
        name: user.name.clone(),
        role: user.role.clone(),
        avatar: user.avatar.clone(),
    }
}

// -- Tests --

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use rusqlite::params;

use crate::error::AppError;
use crate::state::AppState;

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub student_id: i64,
    pub name: Option<String>,
    pub role: Option<String>,
    pub avatar: String,
}

/// Extractor that requires authentication.
/// Verifies the bearer access token and loads the user row; 401 otherwise.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;

        let claims = state.tokens.verify_access(token)?;

        let conn = state.db.get()?;
        conn.query_row(
            "SELECT id, student_id, name, role, avatar FROM users WHERE id = ?1",
            params![claims.sub],
            |row| {
                Ok(CurrentUser {
                    id: row.get(0)?,
                    student_id: row.get(1)?,
                    name: row.get(2)?,
                    role: row.get(3)?,
                    avatar: row.get(4)?,
                })
            },
        )
        .map_err(|_| AppError::Unauthorized("Invalid token".into()))
    }
}

/// Optional user extractor. Yields None instead of 401 when not authenticated.
pub struct MaybeUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(_) => Ok(MaybeUser(None)),
        }
    }
}

fn extract_bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
}

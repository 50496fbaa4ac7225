use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::auth::tokens;
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(rename = "studentId")]
    pub student_id: Option<i64>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub year: Option<i64>,
    pub semester: Option<i64>,
    pub interests: Option<String>,
    pub skills: Option<String>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(rename = "studentId")]
    pub student_id: Option<i64>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Deserialize)]
pub struct ProfileUpdateRequest {
    pub name: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub year: Option<i64>,
    pub semester: Option<i64>,
    pub interests: Option<String>,
    pub skills: Option<String>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
    pub avatar: Option<String>,
}

// -- Response types --

/// User payload as sent over the wire. Excludes id, credential hash,
/// and timestamps; `studentId` is the public identity key.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    #[serde(rename = "studentId")]
    pub student_id: i64,
    pub name: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub year: Option<i64>,
    pub semester: Option<i64>,
    pub interests: Option<String>,
    pub skills: Option<String>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
    pub avatar: String,
}

impl From<User> for UserProfile {
    fn from(u: User) -> Self {
        UserProfile {
            student_id: u.student_id,
            name: u.name,
            role: u.role,
            email: u.email,
            bio: u.bio,
            year: u.year,
            semester: u.semester,
            interests: u.interests,
            skills: u.skills,
            github: u.github,
            linkedin: u.linkedin,
            avatar: u.avatar,
        }
    }
}

// -- Handlers --

/// POST /register/ — create a user account.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Response> {
    let student_id = req
        .student_id
        .ok_or_else(|| AppError::BadRequest("studentId is required".into()))?;
    let password = req
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::BadRequest("password is required".into()))?;

    // Empty-string email would collide on the UNIQUE index; store NULL instead.
    let email = req.email.filter(|e| !e.trim().is_empty());

    let conn = state.db.get()?;

    let taken: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE student_id = ?1",
        params![student_id],
        |row| row.get(0),
    )?;
    if taken {
        return Err(AppError::Conflict(
            "A user with this studentId already exists".into(),
        ));
    }

    if let Some(email) = email.as_deref() {
        let taken: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM users WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )?;
        if taken {
            return Err(AppError::Conflict(
                "A user with this email already exists".into(),
            ));
        }
    }

    let password_hash = bcrypt::hash(&password, bcrypt::DEFAULT_COST)?;

    conn.execute(
        "INSERT INTO users (student_id, password_hash, name, role, email, bio,
                            year, semester, interests, skills, github, linkedin)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            student_id,
            password_hash,
            req.name,
            req.role,
            email,
            req.bio,
            req.year,
            req.semester,
            req.interests,
            req.skills,
            req.github,
            req.linkedin
        ],
    )?;

    tracing::info!(student_id, "user registered");

    let body = serde_json::json!({ "message": "User registered successfully" });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// POST /login/ — verify credentials and issue a token pair.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Response> {
    let (student_id, password) = match (req.student_id, req.password) {
        (Some(s), Some(p)) => (s, p),
        _ => {
            return Err(AppError::Unauthorized(
                "Invalid studentId or password".into(),
            ))
        }
    };

    let conn = state.db.get()?;

    let user = query_user_by_student_id(&conn, student_id)?.ok_or_else(|| {
        AppError::Unauthorized("Invalid studentId or password".into())
    })?;

    if !bcrypt::verify(&password, &user.password_hash)? {
        return Err(AppError::Unauthorized(
            "Invalid studentId or password".into(),
        ));
    }

    let pair = tokens::issue_pair(&conn, &state.tokens, user.id)?;

    let body = serde_json::json!({
        "message": "Login successful",
        "access_token": pair.access,
        "refresh_token": pair.refresh,
        "user": UserProfile::from(user),
    });
    Ok(Json(body).into_response())
}

/// POST /logout/ — blacklist the refresh token so it cannot be reused.
pub async fn logout(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(req): Json<LogoutRequest>,
) -> AppResult<Response> {
    let refresh_token = req
        .refresh_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("Refresh token required".into()))?;

    let conn = state.db.get()?;
    tokens::revoke_refresh(&conn, &state.tokens, &refresh_token)?;

    let body = serde_json::json!({ "message": "Logout successful" });
    Ok(Json(body).into_response())
}

/// POST /token/refresh/ — rotate a refresh token into a new pair.
/// The submitted token is revoked; reusing it afterwards fails.
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> AppResult<Response> {
    let refresh_token = req
        .refresh_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("Refresh token required".into()))?;

    let conn = state.db.get()?;
    let pair = tokens::rotate_refresh(&conn, &state.tokens, &refresh_token)?;

    let body = serde_json::json!({
        "access_token": pair.access,
        "refresh_token": pair.refresh,
    });
    Ok(Json(body).into_response())
}

/// GET /check/ — report whether the caller holds a valid access token.
pub async fn check(MaybeUser(user): MaybeUser) -> Response {
    match user {
        Some(_) => Json(serde_json::json!({ "message": "Authenticated user" })).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "message": "Unauthenticated user" })),
        )
            .into_response(),
    }
}

/// GET /profile/ — the authenticated user's own profile.
pub async fn get_profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<UserProfile>> {
    let conn = state.db.get()?;
    let u = query_user_by_id(&conn, user.id)?;
    Ok(Json(UserProfile::from(u)))
}

/// PUT /profile/ — partial update of the editable profile fields.
pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ProfileUpdateRequest>,
) -> AppResult<Json<UserProfile>> {
    let email = req.email.filter(|e| !e.trim().is_empty());

    let conn = state.db.get()?;

    if let Some(email) = email.as_deref() {
        let taken: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM users WHERE email = ?1 AND id != ?2",
            params![email, user.id],
            |row| row.get(0),
        )?;
        if taken {
            return Err(AppError::Conflict(
                "A user with this email already exists".into(),
            ));
        }
    }

    conn.execute(
        "UPDATE users SET
            name = COALESCE(?1, name),
            role = COALESCE(?2, role),
            email = COALESCE(?3, email),
            bio = COALESCE(?4, bio),
            year = COALESCE(?5, year),
            semester = COALESCE(?6, semester),
            interests = COALESCE(?7, interests),
            skills = COALESCE(?8, skills),
            github = COALESCE(?9, github),
            linkedin = COALESCE(?10, linkedin),
            avatar = COALESCE(?11, avatar)
         WHERE id = ?12",
        params![
            req.name,
            req.role,
            email,
            req.bio,
            req.year,
            req.semester,
            req.interests,
            req.skills,
            req.github,
            req.linkedin,
            req.avatar,
            user.id
        ],
    )?;

    let u = query_user_by_id(&conn, user.id)?;
    Ok(Json(UserProfile::from(u)))
}

// -- Query helpers --

const USER_COLUMNS: &str = "id, student_id, password_hash, name, role, email, bio,
                            year, semester, interests, skills, github, linkedin,
                            avatar, created_at";

fn user_from_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        student_id: row.get(1)?,
        password_hash: row.get(2)?,
        name: row.get(3)?,
        role: row.get(4)?,
        email: row.get(5)?,
        bio: row.get(6)?,
        year: row.get(7)?,
        semester: row.get(8)?,
        interests: row.get(9)?,
        skills: row.get(10)?,
        github: row.get(11)?,
        linkedin: row.get(12)?,
        avatar: row.get(13)?,
        created_at: row.get(14)?,
    })
}

fn query_user_by_student_id(
    conn: &rusqlite::Connection,
    student_id: i64,
) -> AppResult<Option<User>> {
    let result = conn.query_row(
        &format!("SELECT {} FROM users WHERE student_id = ?1", USER_COLUMNS),
        params![student_id],
        user_from_row,
    );
    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn query_user_by_id(conn: &rusqlite::Connection, id: i64) -> AppResult<User> {
    let result = conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
        params![id],
        user_from_row,
    );
    match result {
        Ok(user) => Ok(user),
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            Err(AppError::NotFound("User not found".into()))
        }
        Err(e) => Err(e.into()),
    }
}

// -- Tests --

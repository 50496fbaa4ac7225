//! Access and refresh token issuance, verification, and rotation.
//!
//! Access tokens are stateless JWTs. Refresh tokens are JWTs backed by a
//! database row keyed on `jti`, so they can be revoked (logout) and rotated
//! (each refresh invalidates the previous token).

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims. `jti` is only present on refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub token_type: TokenKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Signing and verification keys plus token lifetimes.
///
/// Handlers only need `verify_access()`; the login and refresh flows also
/// issue. HMAC with a shared secret, so one struct carries both directions.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: jsonwebtoken::EncodingKey,
    decoding: jsonwebtoken::DecodingKey,
    validation: jsonwebtoken::Validation,
    access_minutes: i64,
    refresh_days: i64,
}

impl TokenKeys {
    pub fn new(secret: &str, access_minutes: i64, refresh_days: i64) -> Self {
        Self {
            encoding: jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
            decoding: jsonwebtoken::DecodingKey::from_secret(secret.as_bytes()),
            validation: jsonwebtoken::Validation::default(),
            access_minutes,
            refresh_days,
        }
    }

    pub fn from_config(auth: &AuthConfig) -> Self {
        Self::new(
            &auth.jwt_secret,
            auth.access_token_minutes,
            auth.refresh_token_days,
        )
    }

    pub fn refresh_days(&self) -> i64 {
        self.refresh_days
    }

    /// Issue a short-lived access token for a user.
    pub fn issue_access(&self, user_id: i64) -> AppResult<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            token_type: TokenKind::Access,
            jti: None,
            iat: now,
            exp: now + self.access_minutes * 60,
        };
        Ok(jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &self.encoding,
        )?)
    }

    /// Issue a refresh token carrying the given `jti`.
    pub fn issue_refresh(&self, user_id: i64, jti: &str) -> AppResult<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            token_type: TokenKind::Refresh,
            jti: Some(jti.to_string()),
            iat: now,
            exp: now + self.refresh_days * 86400,
        };
        Ok(jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &self.encoding,
        )?)
    }

    /// Verify an access token and extract its claims.
    pub fn verify_access(&self, token: &str) -> AppResult<Claims> {
        let claims = self.decode(token)?;
        if claims.token_type != TokenKind::Access {
            return Err(AppError::Unauthorized("Invalid token".into()));
        }
        Ok(claims)
    }

    /// Verify a refresh token and extract its claims.
    ///
    /// Signature check only. Whether the token is still live (not revoked,
    /// not rotated away) is the database's call; see `rotate_refresh`.
    pub fn verify_refresh(&self, token: &str) -> AppResult<Claims> {
        let claims = self.decode(token)?;
        if claims.token_type != TokenKind::Refresh {
            return Err(AppError::Unauthorized("Invalid token".into()));
        }
        Ok(claims)
    }

    fn decode(&self, token: &str) -> AppResult<Claims> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::Unauthorized("Token has expired".into())
                }
                _ => AppError::Unauthorized("Invalid token".into()),
            })
    }
}

/// Issue a fresh access/refresh pair and record the refresh token's jti.
pub fn issue_pair(conn: &Connection, keys: &TokenKeys, user_id: i64) -> AppResult<TokenPair> {
    let jti = Uuid::now_v7().to_string();
    // SQLite datetime() format so SQL-side expiry comparisons work.
    let expires_at = (chrono::Utc::now() + chrono::Duration::days(keys.refresh_days()))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();

    conn.execute(
        "INSERT INTO refresh_tokens (jti, user_id, expires_at) VALUES (?1, ?2, ?3)",
        params![&jti, user_id, &expires_at],
    )?;

    Ok(TokenPair {
        access: keys.issue_access(user_id)?,
        refresh: keys.issue_refresh(user_id, &jti)?,
    })
}

/// Exchange a refresh token for a new pair, revoking the old token.
///
/// A token that was already rotated or revoked is rejected, so a stolen
/// refresh token stops working the moment the legitimate client rotates.
pub fn rotate_refresh(conn: &Connection, keys: &TokenKeys, token: &str) -> AppResult<TokenPair> {
    let claims = keys.verify_refresh(token)?;
    let jti = claims
        .jti
        .ok_or_else(|| AppError::Unauthorized("Invalid token".into()))?;

    let revoked = conn.execute(
        "UPDATE refresh_tokens
         SET revoked = 1
         WHERE jti = ?1 AND revoked = 0 AND expires_at > datetime('now')",
        params![&jti],
    )?;
    if revoked == 0 {
        return Err(AppError::Unauthorized("Invalid token".into()));
    }

    issue_pair(conn, keys, claims.sub)
}

/// Revoke a refresh token so it can no longer be rotated (logout).
pub fn revoke_refresh(conn: &Connection, keys: &TokenKeys, token: &str) -> AppResult<()> {
    let claims = keys.verify_refresh(token)?;
    let jti = claims
        .jti
        .ok_or_else(|| AppError::Unauthorized("Invalid token".into()))?;

    let revoked = conn.execute(
        "UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?1 AND revoked = 0",
        params![&jti],
    )?;
    if revoked == 0 {
        return Err(AppError::Unauthorized("Invalid token".into()));
    }
    Ok(())
}

//! Authenticated principal extraction.
//!
//! Identity is established upstream (gateway); requests arrive with an
//! `x-user-id` header naming the caller. This module resolves it to a
//! principal and optionally escalates to admin-only. No tokens or
//! credentials are handled here.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::UserRole;
use crate::state::AppState;

const USER_HEADER: &str = "x-user-id";

#[derive(Clone, Debug)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
}

#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or(AppError::Forbidden)?;
        let row: Option<(Uuid, String, UserRole)> =
            sqlx::query_as("SELECT id, email, role FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&state.db)
                .await?;
        let (id, email, role) = row.ok_or(AppError::Forbidden)?;
        Ok(Principal { id, email, role })
    }
}

/// Admin-only guard; wraps the resolved principal.
#[derive(Clone, Debug)]
pub struct Admin(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for Admin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let principal = Principal::from_request_parts(parts, state).await?;
        if principal.role != UserRole::Admin {
            return Err(AppError::Forbidden);
        }
        Ok(Admin(principal))
    }
}

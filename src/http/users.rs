//! User handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{Admin, Principal};
use crate::error::{AppError, Result};
use crate::models::{User, UserRole};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterUser {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

pub async fn register(
    State(s): State<AppState>,
    Json(r): Json<RegisterUser>,
) -> Result<(StatusCode, Json<User>)> {
    r.validate()?;
    let taken: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(&r.email)
        .fetch_one(&s.db)
        .await?;
    if taken.0 {
        return Err(AppError::conflict("email is already registered"));
    }
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, email, name) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&r.email)
    .bind(&r.name)
    .fetch_one(&s.db)
    .await?;
    tracing::info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get(
    principal: Principal,
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>> {
    if principal.role != UserRole::Admin && principal.id != id {
        return Err(AppError::Forbidden);
    }
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("user"))
}

pub async fn list(_admin: Admin, State(s): State<AppState>) -> Result<Json<Vec<User>>> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
        .fetch_all(&s.db)
        .await?;
    Ok(Json(users))
}

/// A user with order history stays on record.
pub async fn delete(
    _admin: Admin,
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let owns_orders: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM orders WHERE user_id = $1)")
        .bind(id)
        .fetch_one(&s.db)
        .await?;
    if owns_orders.0 {
        return Err(AppError::conflict("user owns orders and cannot be deleted"));
    }
    let done = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&s.db)
        .await?;
    if done.rows_affected() == 0 {
        return Err(AppError::NotFound("user"));
    }
    Ok(StatusCode::NO_CONTENT)
}

//! Category handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::Admin;
use crate::error::{AppError, Result};
use crate::models::Category;
use crate::state::AppState;

pub async fn list(State(s): State<AppState>) -> Result<Json<Vec<Category>>> {
    let cats = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name")
        .fetch_all(&s.db)
        .await?;
    Ok(Json(cats))
}

pub async fn get(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Category>> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("category"))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategory {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
}

pub async fn create(
    _admin: Admin,
    State(s): State<AppState>,
    Json(r): Json<CreateCategory>,
) -> Result<(StatusCode, Json<Category>)> {
    r.validate()?;
    let slug = r.name.to_lowercase().replace(' ', "-");
    let taken: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM categories WHERE slug = $1)")
        .bind(&slug)
        .fetch_one(&s.db)
        .await?;
    if taken.0 {
        return Err(AppError::conflict(format!("category slug '{slug}' already exists")));
    }
    let c = sqlx::query_as::<_, Category>(
        "INSERT INTO categories (id, name, slug, description) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&r.name)
    .bind(&slug)
    .bind(&r.description)
    .fetch_one(&s.db)
    .await?;
    Ok((StatusCode::CREATED, Json(c)))
}

/// A category stays as long as any product points at it.
pub async fn delete(
    _admin: Admin,
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let referenced: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM products WHERE category_id = $1)")
            .bind(id)
            .fetch_one(&s.db)
            .await?;
    if referenced.0 {
        return Err(AppError::conflict("category is referenced by products"));
    }
    let done = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(&s.db)
        .await?;
    if done.rows_affected() == 0 {
        return Err(AppError::NotFound("category"));
    }
    Ok(StatusCode::NO_CONTENT)
}

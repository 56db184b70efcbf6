//! Product catalog handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{ListParams, Paginated};
use crate::auth::Admin;
use crate::error::{AppError, FieldViolation, Result};
use crate::models::Product;
use crate::state::AppState;

pub async fn list(
    State(s): State<AppState>,
    Query(p): Query<ListParams>,
) -> Result<Json<Paginated<Product>>> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE is_active AND ($1::uuid IS NULL OR category_id = $1) \
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(p.category)
    .bind(i64::from(p.per_page()))
    .bind(p.offset())
    .fetch_all(&s.db)
    .await?;
    let total: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM products WHERE is_active AND ($1::uuid IS NULL OR category_id = $1)",
    )
    .bind(p.category)
    .fetch_one(&s.db)
    .await?;
    Ok(Json(Paginated {
        data: products,
        total: total.0,
        page: p.page(),
    }))
}

pub async fn get(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Product>> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("product"))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProduct {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
    pub category_id: Option<Uuid>,
}

fn check_price(price: Decimal) -> Result<()> {
    if price < Decimal::ZERO {
        return Err(AppError::Validation(vec![FieldViolation {
            field: "price".into(),
            message: "must not be negative".into(),
        }]));
    }
    Ok(())
}

pub async fn create(
    _admin: Admin,
    State(s): State<AppState>,
    Json(r): Json<CreateProduct>,
) -> Result<(StatusCode, Json<Product>)> {
    r.validate()?;
    check_price(r.price)?;
    if let Some(category_id) = r.category_id {
        let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
            .bind(category_id)
            .fetch_one(&s.db)
            .await?;
        if !exists.0 {
            return Err(AppError::NotFound("category"));
        }
    }
    let p = sqlx::query_as::<_, Product>(
        "INSERT INTO products (id, name, description, price, stock, category_id) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&r.name)
    .bind(&r.description)
    .bind(r.price)
    .bind(r.stock.unwrap_or(0))
    .bind(r.category_id)
    .fetch_one(&s.db)
    .await?;
    tracing::info!(product_id = %p.id, "product created");
    Ok((StatusCode::CREATED, Json(p)))
}

pub async fn update(
    _admin: Admin,
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<CreateProduct>,
) -> Result<Json<Product>> {
    r.validate()?;
    check_price(r.price)?;
    let p = sqlx::query_as::<_, Product>(
        "UPDATE products SET name = $2, description = $3, price = $4, category_id = $5, \
         updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&r.name)
    .bind(&r.description)
    .bind(r.price)
    .bind(r.category_id)
    .fetch_optional(&s.db)
    .await?
    .ok_or(AppError::NotFound("product"))?;
    Ok(Json(p))
}

/// Products referenced by order lines are never removed, only
/// deactivated.
pub async fn deactivate(
    _admin: Admin,
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let done = sqlx::query("UPDATE products SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&s.db)
        .await?;
    if done.rows_affected() == 0 {
        return Err(AppError::NotFound("product"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct AdjustStock {
    pub delta: i32,
}

/// Manual inventory adjustment. The update is conditional so stock can
/// never be driven negative, even by concurrent adjustments.
pub async fn adjust_stock(
    _admin: Admin,
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<AdjustStock>,
) -> Result<Json<Product>> {
    let updated = sqlx::query_as::<_, Product>(
        "UPDATE products SET stock = stock + $2, updated_at = NOW() \
         WHERE id = $1 AND stock + $2 >= 0 RETURNING *",
    )
    .bind(id)
    .bind(r.delta)
    .fetch_optional(&s.db)
    .await?;
    match updated {
        Some(p) => {
            tracing::info!(product_id = %id, delta = r.delta, stock = p.stock, "stock adjusted");
            Ok(Json(p))
        }
        None => {
            let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
                .bind(id)
                .fetch_one(&s.db)
                .await?;
            if exists.0 {
                Err(AppError::conflict("adjustment would make stock negative"))
            } else {
                Err(AppError::NotFound("product"))
            }
        }
    }
}

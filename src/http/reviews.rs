//! Review handlers and rating recomputation.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::Principal;
use crate::domain::events::DomainEvent;
use crate::domain::reviews::aggregate;
use crate::error::{AppError, Result};
use crate::models::{Review, UserRole};
use crate::state::AppState;

pub async fn list_for_product(
    State(s): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Vec<Review>>> {
    let reviews = sqlx::query_as::<_, Review>(
        "SELECT * FROM reviews WHERE product_id = $1 AND is_active ORDER BY created_at DESC",
    )
    .bind(product_id)
    .fetch_all(&s.db)
    .await?;
    Ok(Json(reviews))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReview {
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}

pub async fn create(
    principal: Principal,
    State(s): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(r): Json<CreateReview>,
) -> Result<(StatusCode, Json<Review>)> {
    r.validate()?;
    let exists: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1 AND is_active)")
            .bind(product_id)
            .fetch_one(&s.db)
            .await?;
    if !exists.0 {
        return Err(AppError::NotFound("product"));
    }
    // One review per user and product. The unique constraint backs
    // this check up under concurrency.
    let duplicate: (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM reviews WHERE user_id = $1 AND product_id = $2)",
    )
    .bind(principal.id)
    .bind(product_id)
    .fetch_one(&s.db)
    .await?;
    if duplicate.0 {
        return Err(AppError::conflict("user has already reviewed this product"));
    }

    let mut tx = s.db.begin().await?;
    let review = sqlx::query_as::<_, Review>(
        "INSERT INTO reviews (id, user_id, product_id, rating, comment) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(principal.id)
    .bind(product_id)
    .bind(r.rating)
    .bind(&r.comment)
    .fetch_one(&mut *tx)
    .await?;
    let (rating, count) = recompute_rating(&mut tx, product_id).await?;
    tx.commit().await?;

    tracing::info!(product_id = %product_id, rating = %rating, count, "review posted");
    s.publish(DomainEvent::ReviewPosted {
        product_id,
        rating,
        review_count: count,
    })
    .await;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn deactivate(
    principal: Principal,
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let review = sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .ok_or(AppError::NotFound("review"))?;
    if principal.role != UserRole::Admin && review.user_id != principal.id {
        return Err(AppError::Forbidden);
    }

    let mut tx = s.db.begin().await?;
    sqlx::query("UPDATE reviews SET is_active = FALSE WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let (rating, count) = recompute_rating(&mut tx, review.product_id).await?;
    tx.commit().await?;

    tracing::info!(product_id = %review.product_id, rating = %rating, count, "review removed");
    s.publish(DomainEvent::ReviewRemoved {
        product_id: review.product_id,
        rating,
        review_count: count,
    })
    .await;
    Ok(StatusCode::NO_CONTENT)
}

/// Full rescan of a product's active reviews, persisted onto the
/// product row.
async fn recompute_rating(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    product_id: Uuid,
) -> Result<(rust_decimal::Decimal, i32)> {
    let ratings: Vec<(i32,)> =
        sqlx::query_as("SELECT rating FROM reviews WHERE product_id = $1 AND is_active")
            .bind(product_id)
            .fetch_all(&mut **tx)
            .await?;
    let ratings: Vec<i32> = ratings.into_iter().map(|(r,)| r).collect();
    let (rating, count) = aggregate(&ratings);
    sqlx::query("UPDATE products SET rating = $2, review_count = $3, updated_at = NOW() WHERE id = $1")
        .bind(product_id)
        .bind(rating)
        .bind(count)
        .execute(&mut **tx)
        .await?;
    Ok((rating, count))
}

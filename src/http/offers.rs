//! Offer (promo code) handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::Admin;
use crate::error::{AppError, FieldViolation, Result};
use crate::models::{Offer, OfferKind};
use crate::state::AppState;

pub async fn list(_admin: Admin, State(s): State<AppState>) -> Result<Json<Vec<Offer>>> {
    let offers = sqlx::query_as::<_, Offer>("SELECT * FROM offers ORDER BY created_at DESC")
        .fetch_all(&s.db)
        .await?;
    Ok(Json(offers))
}

pub async fn get_by_code(State(s): State<AppState>, Path(code): Path<String>) -> Result<Json<Offer>> {
    sqlx::query_as::<_, Offer>("SELECT * FROM offers WHERE LOWER(code) = LOWER($1)")
        .bind(&code)
        .fetch_optional(&s.db)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("offer"))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOffer {
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    pub kind: OfferKind,
    pub value: Decimal,
    pub min_amount: Option<Decimal>,
    #[validate(range(min = 1))]
    pub max_uses: Option<i32>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub product_ids: Vec<Uuid>,
}

/// Value bounds are enforced here, at creation time; evaluation
/// additionally clamps the discount to the subtotal.
fn check_offer(r: &CreateOffer) -> Result<()> {
    let mut violations = Vec::new();
    if r.value < Decimal::ZERO {
        violations.push(FieldViolation {
            field: "value".into(),
            message: "must not be negative".into(),
        });
    }
    if r.kind == OfferKind::Percentage && r.value > Decimal::ONE_HUNDRED {
        violations.push(FieldViolation {
            field: "value".into(),
            message: "percentage must not exceed 100".into(),
        });
    }
    if r.ends_at <= r.starts_at {
        violations.push(FieldViolation {
            field: "ends_at".into(),
            message: "must be after starts_at".into(),
        });
    }
    if violations.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(violations))
    }
}

pub async fn create(
    _admin: Admin,
    State(s): State<AppState>,
    Json(r): Json<CreateOffer>,
) -> Result<(StatusCode, Json<Offer>)> {
    r.validate()?;
    check_offer(&r)?;
    let taken: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM offers WHERE LOWER(code) = LOWER($1))")
            .bind(&r.code)
            .fetch_one(&s.db)
            .await?;
    if taken.0 {
        return Err(AppError::conflict(format!("offer code '{}' already exists", r.code)));
    }
    if !r.product_ids.is_empty() {
        let known: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = ANY($1)")
            .bind(&r.product_ids)
            .fetch_all(&s.db)
            .await?;
        let known: Vec<Uuid> = known.into_iter().map(|(id,)| id).collect();
        if first_unknown(&r.product_ids, &known).is_some() {
            return Err(AppError::NotFound("product"));
        }
    }

    let mut tx = s.db.begin().await?;
    let offer = sqlx::query_as::<_, Offer>(
        "INSERT INTO offers (id, code, kind, value, min_amount, max_uses, starts_at, ends_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&r.code)
    .bind(r.kind)
    .bind(r.value)
    .bind(r.min_amount)
    .bind(r.max_uses)
    .bind(r.starts_at)
    .bind(r.ends_at)
    .fetch_one(&mut *tx)
    .await?;
    for product_id in &r.product_ids {
        sqlx::query("INSERT INTO offer_products (offer_id, product_id) VALUES ($1, $2)")
            .bind(offer.id)
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    tracing::info!(offer_id = %offer.id, code = %offer.code, "offer created");
    Ok((StatusCode::CREATED, Json(offer)))
}

/// First requested id absent from the known set, if any.
fn first_unknown(requested: &[Uuid], known: &[Uuid]) -> Option<Uuid> {
    requested.iter().find(|id| !known.contains(id)).copied()
}

pub async fn deactivate(
    _admin: Admin,
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let done = sqlx::query("UPDATE offers SET is_active = FALSE WHERE id = $1")
        .bind(id)
        .execute(&s.db)
        .await?;
    if done.rows_affected() == 0 {
        return Err(AppError::NotFound("offer"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn request(kind: OfferKind, value: Decimal) -> CreateOffer {
        let now = Utc::now();
        CreateOffer {
            code: "WELCOME10".into(),
            kind,
            value,
            min_amount: None,
            max_uses: None,
            starts_at: now,
            ends_at: now + Duration::days(30),
            product_ids: vec![],
        }
    }

    #[test]
    fn percentage_over_100_rejected_at_creation() {
        let r = request(OfferKind::Percentage, dec!(120));
        assert!(check_offer(&r).is_err());
        let r = request(OfferKind::Percentage, dec!(100));
        assert!(check_offer(&r).is_ok());
    }

    #[test]
    fn inverted_window_rejected() {
        let mut r = request(OfferKind::FixedAmount, dec!(5));
        r.ends_at = r.starts_at;
        assert!(check_offer(&r).is_err());
    }

    #[test]
    fn unknown_scoped_product_is_detected() {
        let known = vec![Uuid::new_v4(), Uuid::new_v4()];
        let stranger = Uuid::new_v4();
        assert_eq!(first_unknown(&known, &known), None);
        assert_eq!(
            first_unknown(&[known[0], stranger], &known),
            Some(stranger)
        );
    }
}

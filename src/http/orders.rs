//! Order handlers: creation, status transitions, deletion.
//!
//! Every multi-step mutation runs inside one transaction, and stock or
//! usage-counter writes are conditional updates, so an aborted request
//! leaves no partial effects and counters cannot be driven past their
//! bounds by concurrent requests.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{ListParams, Paginated};
use crate::auth::{Admin, Principal};
use crate::domain::events::DomainEvent;
use crate::domain::lifecycle::{self, StockEffect};
use crate::domain::offers::{evaluate, Evaluation, IneligibleReason};
use crate::domain::pricing::compute_totals;
use crate::error::{AppError, FieldViolation, Result};
use crate::models::{Offer, Order, OrderItem, OrderStatus, UserRole};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrder {
    #[validate(length(min = 1, message = "order needs at least one item"))]
    pub items: Vec<OrderLine>,
    pub offer_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

fn check_quantities(items: &[OrderLine]) -> Result<()> {
    let violations: Vec<FieldViolation> = items
        .iter()
        .enumerate()
        .filter(|(_, l)| l.quantity < 1)
        .map(|(i, _)| FieldViolation {
            field: format!("items[{i}].quantity"),
            message: "must be positive".into(),
        })
        .collect();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(violations))
    }
}

pub async fn create(
    principal: Principal,
    State(s): State<AppState>,
    Json(r): Json<CreateOrder>,
) -> Result<(StatusCode, Json<OrderWithItems>)> {
    r.validate()?;
    check_quantities(&r.items)?;

    let mut tx = s.db.begin().await?;

    // Reserve stock line by line. The decrement is conditional on the
    // product being active with sufficient stock; zero rows affected
    // aborts the whole order, and the rollback undoes earlier lines.
    let mut lines: Vec<(Uuid, i32, Decimal, Decimal)> = Vec::with_capacity(r.items.len());
    let mut subtotal = Decimal::ZERO;
    for line in &r.items {
        let price: Option<(Decimal,)> = sqlx::query_as(
            "UPDATE products SET stock = stock - $2, updated_at = NOW() \
             WHERE id = $1 AND is_active AND stock >= $2 RETURNING price",
        )
        .bind(line.product_id)
        .bind(line.quantity)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((unit_price,)) = price else {
            return Err(reservation_failure(&s, line).await?);
        };
        let line_total = unit_price * Decimal::from(line.quantity);
        subtotal += line_total;
        lines.push((line.product_id, line.quantity, unit_price, line_total));
    }

    let cart_products: Vec<Uuid> = lines.iter().map(|l| l.0).collect();
    let mut evaluation = Evaluation::NotFound;
    if let Some(code) = &r.offer_code {
        evaluation = evaluate_code(&mut tx, code, &cart_products, subtotal).await?;
    }

    let totals = compute_totals(subtotal, evaluation.discount(), evaluation.waives_shipping());
    let order_number = format!("ORD-{:08}", rand::random::<u32>());
    let order = sqlx::query_as::<_, Order>(
        "INSERT INTO orders (id, order_number, user_id, subtotal, discount, tax, shipping, total, offer_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&order_number)
    .bind(principal.id)
    .bind(totals.subtotal)
    .bind(totals.discount)
    .bind(totals.tax)
    .bind(totals.shipping)
    .bind(totals.total)
    .bind(evaluation.offer_id())
    .fetch_one(&mut *tx)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for (product_id, quantity, unit_price, line_total) in lines {
        let item = sqlx::query_as::<_, OrderItem>(
            "INSERT INTO order_items (id, order_id, product_id, quantity, unit_price, line_total) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(order.id)
        .bind(product_id)
        .bind(quantity)
        .bind(unit_price)
        .bind(line_total)
        .fetch_one(&mut *tx)
        .await?;
        items.push(item);
    }

    tx.commit().await?;
    tracing::info!(
        order_id = %order.id,
        order_number = %order.order_number,
        total = %order.total,
        discount = %order.discount,
        "order created"
    );
    s.publish(DomainEvent::OrderCreated {
        order_id: order.id,
        order_number: order.order_number.clone(),
        total: order.total,
    })
    .await;
    Ok((StatusCode::CREATED, Json(OrderWithItems { order, items })))
}

/// Diagnose why a line's conditional decrement matched nothing.
async fn reservation_failure(s: &AppState, line: &OrderLine) -> Result<AppError> {
    let row: Option<(i32, bool)> = sqlx::query_as("SELECT stock, is_active FROM products WHERE id = $1")
        .bind(line.product_id)
        .fetch_optional(&s.db)
        .await?;
    Ok(match row {
        None => AppError::NotFound("product"),
        Some((_, false)) => {
            AppError::conflict(format!("product {} is not active", line.product_id))
        }
        Some((stock, true)) => AppError::conflict(format!(
            "insufficient stock for product {}: requested {}, available {}",
            line.product_id, line.quantity, stock
        )),
    })
}

/// Look up and evaluate a promo code, and record its use. An
/// inapplicable or unknown code is not an error; the order simply
/// proceeds undiscounted.
async fn evaluate_code(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    code: &str,
    cart_products: &[Uuid],
    subtotal: Decimal,
) -> Result<Evaluation> {
    let offer = sqlx::query_as::<_, Offer>("SELECT * FROM offers WHERE LOWER(code) = LOWER($1)")
        .bind(code)
        .fetch_optional(&mut **tx)
        .await?;
    let Some(offer) = offer else {
        tracing::debug!(code, "offer code not found");
        return Ok(Evaluation::NotFound);
    };
    let scope: Vec<(Uuid,)> = sqlx::query_as("SELECT product_id FROM offer_products WHERE offer_id = $1")
        .bind(offer.id)
        .fetch_all(&mut **tx)
        .await?;
    let scope: Vec<Uuid> = scope.into_iter().map(|(id,)| id).collect();

    let evaluation = evaluate(&offer, &scope, cart_products, subtotal, Utc::now());
    if let Evaluation::Applied { offer_id, .. } = &evaluation {
        // The increment re-checks the cap so two concurrent orders
        // cannot both take the last use. Losing the race downgrades to
        // an undiscounted order rather than failing it.
        let counted = sqlx::query(
            "UPDATE offers SET used_count = used_count + 1 \
             WHERE id = $1 AND (max_uses IS NULL OR used_count < max_uses)",
        )
        .bind(*offer_id)
        .execute(&mut **tx)
        .await?;
        if counted.rows_affected() == 0 {
            tracing::warn!(offer_id = %offer_id, "offer usage cap reached concurrently");
            return Ok(Evaluation::NotEligible(IneligibleReason::UsageExhausted));
        }
    }
    Ok(evaluation)
}

pub async fn list(
    principal: Principal,
    State(s): State<AppState>,
    Query(p): Query<ListParams>,
) -> Result<Json<Paginated<Order>>> {
    // Admins see every order; users only their own.
    let owner = (principal.role != UserRole::Admin).then_some(principal.id);
    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE ($1::uuid IS NULL OR user_id = $1) \
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(owner)
    .bind(i64::from(p.per_page()))
    .bind(p.offset())
    .fetch_all(&s.db)
    .await?;
    let total: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM orders WHERE ($1::uuid IS NULL OR user_id = $1)")
            .bind(owner)
            .fetch_one(&s.db)
            .await?;
    Ok(Json(Paginated {
        data: orders,
        total: total.0,
        page: p.page(),
    }))
}

pub async fn get(
    principal: Principal,
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderWithItems>> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .ok_or(AppError::NotFound("order"))?;
    authorize(&principal, &order)?;
    let items = load_items(&s, order.id).await?;
    Ok(Json(OrderWithItems { order, items }))
}

pub async fn get_by_number(
    principal: Principal,
    State(s): State<AppState>,
    Path(number): Path<String>,
) -> Result<Json<OrderWithItems>> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE order_number = $1")
        .bind(&number)
        .fetch_optional(&s.db)
        .await?
        .ok_or(AppError::NotFound("order"))?;
    authorize(&principal, &order)?;
    let items = load_items(&s, order.id).await?;
    Ok(Json(OrderWithItems { order, items }))
}

fn authorize(principal: &Principal, order: &Order) -> Result<()> {
    if principal.role != UserRole::Admin && order.user_id != principal.id {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

async fn load_items(s: &AppState, order_id: Uuid) -> Result<Vec<OrderItem>> {
    Ok(
        sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = $1")
            .bind(order_id)
            .fetch_all(&s.db)
            .await?,
    )
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatus {
    pub status: OrderStatus,
}

pub async fn update_status(
    principal: Principal,
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<UpdateStatus>,
) -> Result<Json<Order>> {
    let mut tx = s.db.begin().await?;
    // Row lock serializes transitions on the same order; the stock
    // effect of an edge is applied exactly once.
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("order"))?;
    authorize(&principal, &order)?;
    if principal.role != UserRole::Admin && r.status != OrderStatus::Cancelled {
        // Customers may only cancel; everything else is back-office.
        return Err(AppError::Forbidden);
    }

    match lifecycle::stock_effect(order.status, r.status) {
        StockEffect::Restore => {
            sqlx::query(
                "UPDATE products p SET stock = p.stock + oi.quantity, updated_at = NOW() \
                 FROM order_items oi WHERE oi.order_id = $1 AND p.id = oi.product_id",
            )
            .bind(order.id)
            .execute(&mut *tx)
            .await?;
        }
        StockEffect::Reserve => {
            let items = sqlx::query_as::<_, OrderItem>(
                "SELECT * FROM order_items WHERE order_id = $1",
            )
            .bind(order.id)
            .fetch_all(&mut *tx)
            .await?;
            for item in &items {
                let taken = sqlx::query(
                    "UPDATE products SET stock = stock - $2, updated_at = NOW() \
                     WHERE id = $1 AND stock >= $2",
                )
                .bind(item.product_id)
                .bind(item.quantity)
                .execute(&mut *tx)
                .await?;
                if taken.rows_affected() == 0 {
                    // Rollback restores the lines already re-reserved.
                    return Err(AppError::conflict(format!(
                        "cannot reinstate order: insufficient stock for product {}",
                        item.product_id
                    )));
                }
            }
        }
        StockEffect::None => {}
    }

    let updated = sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(order.id)
    .bind(r.status)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    tracing::info!(order_id = %order.id, from = ?order.status, to = ?r.status, "order status changed");
    s.publish(DomainEvent::OrderStatusChanged {
        order_id: order.id,
        from: order.status,
        to: r.status,
    })
    .await;
    Ok(Json(updated))
}

pub async fn delete(
    _admin: Admin,
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let mut tx = s.db.begin().await?;
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("order"))?;
    if !lifecycle::deletable(order.status) {
        return Err(AppError::conflict("only cancelled orders can be deleted"));
    }
    // Item rows go via the FK cascade.
    sqlx::query("DELETE FROM orders WHERE id = $1")
        .bind(order.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    tracing::info!(order_id = %order.id, "order deleted");
    s.publish(DomainEvent::OrderDeleted { order_id: order.id }).await;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_order_fails_validation() {
        let r = CreateOrder {
            items: vec![],
            offer_code: None,
        };
        assert!(r.validate().is_err());
    }

    #[test]
    fn one_line_order_validates() {
        let r = CreateOrder {
            items: vec![OrderLine {
                product_id: Uuid::new_v4(),
                quantity: 1,
            }],
            offer_code: None,
        };
        assert!(r.validate().is_ok());
        assert!(check_quantities(&r.items).is_ok());
    }

    #[test]
    fn non_positive_quantities_are_reported_per_line() {
        let items = vec![
            OrderLine {
                product_id: Uuid::new_v4(),
                quantity: 2,
            },
            OrderLine {
                product_id: Uuid::new_v4(),
                quantity: 0,
            },
        ];
        let err = check_quantities(&items).unwrap_err();
        match err {
            AppError::Validation(violations) => {
                assert_eq!(violations.len(), 1);
                assert_eq!(violations[0].field, "items[1].quantity");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}

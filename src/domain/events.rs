//! Domain events, published to NATS when a client is configured.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::OrderStatus;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderCreated {
        order_id: Uuid,
        order_number: String,
        total: Decimal,
    },
    OrderStatusChanged {
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    },
    OrderDeleted {
        order_id: Uuid,
    },
    ReviewPosted {
        product_id: Uuid,
        rating: Decimal,
        review_count: i32,
    },
    ReviewRemoved {
        product_id: Uuid,
        rating: Decimal,
        review_count: i32,
    },
}

impl DomainEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            Self::OrderCreated { .. } => "storefront.orders.created",
            Self::OrderStatusChanged { .. } => "storefront.orders.status",
            Self::OrderDeleted { .. } => "storefront.orders.deleted",
            Self::ReviewPosted { .. } => "storefront.reviews.posted",
            Self::ReviewRemoved { .. } => "storefront.reviews.removed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn every_review_mutation_has_a_subject() {
        let posted = DomainEvent::ReviewPosted {
            product_id: Uuid::new_v4(),
            rating: Decimal::new(450, 2),
            review_count: 2,
        };
        let removed = DomainEvent::ReviewRemoved {
            product_id: Uuid::new_v4(),
            rating: Decimal::ZERO,
            review_count: 0,
        };
        assert_eq!(posted.subject(), "storefront.reviews.posted");
        assert_eq!(removed.subject(), "storefront.reviews.removed");
    }
}

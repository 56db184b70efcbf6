//! Offer eligibility and discount computation.
//!
//! Evaluation is deliberately tri-state: "no such code", "code exists
//! but does not apply here", and "applied" are distinct outcomes so
//! callers (and tests) can tell them apart, even though all three leave
//! the order creation path running with whatever discount results.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{Offer, OfferKind};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Evaluation {
    /// No offer with that code exists.
    NotFound,
    /// The code exists but does not apply to this cart. Never an error.
    NotEligible(IneligibleReason),
    Applied {
        offer_id: Uuid,
        discount: Decimal,
        /// Set for FREE_SHIPPING offers; honored by the total calculator.
        waives_shipping: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IneligibleReason {
    Inactive,
    OutsideWindow,
    UsageExhausted,
    BelowMinimum,
    OutOfScope,
}

impl Evaluation {
    pub fn discount(&self) -> Decimal {
        match self {
            Self::Applied { discount, .. } => *discount,
            _ => Decimal::ZERO,
        }
    }

    pub fn offer_id(&self) -> Option<Uuid> {
        match self {
            Self::Applied { offer_id, .. } => Some(*offer_id),
            _ => None,
        }
    }

    pub fn waives_shipping(&self) -> bool {
        matches!(self, Self::Applied { waives_shipping: true, .. })
    }
}

/// Evaluate `offer` against a cart.
///
/// `scoped_products` is the offer's product scope; empty means the
/// offer applies to any cart. `cart_products` are the product ids of
/// the cart lines. No side effects: the usage counter is incremented
/// separately, only after the order actually persists.
pub fn evaluate(
    offer: &Offer,
    scoped_products: &[Uuid],
    cart_products: &[Uuid],
    subtotal: Decimal,
    now: DateTime<Utc>,
) -> Evaluation {
    use IneligibleReason::*;

    if !offer.is_active {
        return Evaluation::NotEligible(Inactive);
    }
    // Half-open window: starts_at inclusive, ends_at exclusive.
    if now < offer.starts_at || now >= offer.ends_at {
        return Evaluation::NotEligible(OutsideWindow);
    }
    if let Some(max) = offer.max_uses {
        if offer.used_count >= max {
            return Evaluation::NotEligible(UsageExhausted);
        }
    }
    if let Some(min) = offer.min_amount {
        if subtotal < min {
            return Evaluation::NotEligible(BelowMinimum);
        }
    }
    if !scoped_products.is_empty()
        && !cart_products.iter().any(|p| scoped_products.contains(p))
    {
        return Evaluation::NotEligible(OutOfScope);
    }

    let raw = match offer.kind {
        OfferKind::Percentage => subtotal * offer.value / Decimal::ONE_HUNDRED,
        OfferKind::FixedAmount => offer.value,
        OfferKind::FreeShipping => Decimal::ZERO,
    };
    // The discount never exceeds the subtotal, whatever the offer says.
    let discount = raw.min(subtotal).round_dp(2);

    Evaluation::Applied {
        offer_id: offer.id,
        discount,
        waives_shipping: offer.kind == OfferKind::FreeShipping,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn offer(kind: OfferKind, value: Decimal) -> Offer {
        let now = Utc::now();
        Offer {
            id: Uuid::new_v4(),
            code: "SUMMER20".into(),
            kind,
            value,
            min_amount: None,
            max_uses: None,
            used_count: 0,
            is_active: true,
            starts_at: now - Duration::days(1),
            ends_at: now + Duration::days(1),
            created_at: now,
        }
    }

    #[test]
    fn percentage_discount() {
        let o = offer(OfferKind::Percentage, dec!(20));
        let eval = evaluate(&o, &[], &[], dec!(100), Utc::now());
        assert_eq!(eval.discount(), dec!(20.00));
        assert_eq!(eval.offer_id(), Some(o.id));
    }

    #[test]
    fn fixed_amount_clamped_to_subtotal() {
        let o = offer(OfferKind::FixedAmount, dec!(50));
        let eval = evaluate(&o, &[], &[], dec!(30), Utc::now());
        assert_eq!(eval.discount(), dec!(30.00));
    }

    #[test]
    fn percentage_over_100_clamped_to_subtotal() {
        let o = offer(OfferKind::Percentage, dec!(150));
        let eval = evaluate(&o, &[], &[], dec!(80), Utc::now());
        assert_eq!(eval.discount(), dec!(80.00));
    }

    #[test]
    fn outside_window_is_not_an_error() {
        let mut o = offer(OfferKind::Percentage, dec!(20));
        o.starts_at = Utc::now() + Duration::days(1);
        o.ends_at = Utc::now() + Duration::days(2);
        let eval = evaluate(&o, &[], &[], dec!(100), Utc::now());
        assert_eq!(
            eval,
            Evaluation::NotEligible(IneligibleReason::OutsideWindow)
        );
        assert_eq!(eval.discount(), Decimal::ZERO);
    }

    #[test]
    fn window_end_is_exclusive() {
        let o = offer(OfferKind::Percentage, dec!(20));
        let eval = evaluate(&o, &[], &[], dec!(100), o.ends_at);
        assert_eq!(
            eval,
            Evaluation::NotEligible(IneligibleReason::OutsideWindow)
        );
    }

    #[test]
    fn below_minimum_yields_zero() {
        let mut o = offer(OfferKind::Percentage, dec!(20));
        o.min_amount = Some(dec!(50));
        let eval = evaluate(&o, &[], &[], dec!(40), Utc::now());
        assert_eq!(
            eval,
            Evaluation::NotEligible(IneligibleReason::BelowMinimum)
        );
    }

    #[test]
    fn usage_cap_exhausted() {
        let mut o = offer(OfferKind::Percentage, dec!(20));
        o.max_uses = Some(3);
        o.used_count = 3;
        let eval = evaluate(&o, &[], &[], dec!(100), Utc::now());
        assert_eq!(
            eval,
            Evaluation::NotEligible(IneligibleReason::UsageExhausted)
        );
    }

    #[test]
    fn scoped_offer_requires_overlap() {
        let o = offer(OfferKind::Percentage, dec!(10));
        let in_scope = Uuid::new_v4();
        let cart = vec![Uuid::new_v4()];
        let eval = evaluate(&o, &[in_scope], &cart, dec!(100), Utc::now());
        assert_eq!(eval, Evaluation::NotEligible(IneligibleReason::OutOfScope));

        let cart = vec![in_scope, Uuid::new_v4()];
        let eval = evaluate(&o, &[in_scope], &cart, dec!(100), Utc::now());
        assert_eq!(eval.discount(), dec!(10.00));
    }

    #[test]
    fn free_shipping_waives_but_does_not_discount() {
        let o = offer(OfferKind::FreeShipping, Decimal::ZERO);
        let eval = evaluate(&o, &[], &[], dec!(30), Utc::now());
        assert_eq!(eval.discount(), Decimal::ZERO);
        assert!(eval.waives_shipping());
    }
}

//! Pure business rules: offer eligibility, order totals, lifecycle
//! stock reconciliation, review aggregation. No I/O here; handlers load
//! rows and feed them in.

pub mod events;
pub mod lifecycle;
pub mod offers;
pub mod pricing;
pub mod reviews;

#[cfg(test)]
mod tests {
    //! Checkout math end to end: code evaluation feeding the total
    //! calculator.

    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use super::offers::evaluate;
    use super::pricing::compute_totals;
    use crate::models::{Offer, OfferKind};

    fn summer20() -> Offer {
        let now = Utc::now();
        Offer {
            id: Uuid::new_v4(),
            code: "SUMMER20".into(),
            kind: OfferKind::Percentage,
            value: dec!(20),
            min_amount: Some(dec!(50)),
            max_uses: None,
            used_count: 0,
            is_active: true,
            starts_at: now - Duration::days(7),
            ends_at: now + Duration::days(7),
            created_at: now,
        }
    }

    #[test]
    fn hundred_dollar_cart_with_summer20() {
        let offer = summer20();
        let eval = evaluate(&offer, &[], &[Uuid::new_v4()], dec!(100), Utc::now());
        assert_eq!(eval.discount(), dec!(20.00));
        let t = compute_totals(dec!(100), eval.discount(), eval.waives_shipping());
        assert_eq!(t.tax, dec!(10.00));
        assert_eq!(t.shipping, dec!(0));
        assert_eq!(t.total, dec!(90.00));
    }

    #[test]
    fn forty_dollar_cart_misses_the_minimum() {
        let offer = summer20();
        let eval = evaluate(&offer, &[], &[Uuid::new_v4()], dec!(40), Utc::now());
        assert_eq!(eval.discount(), dec!(0));
        let t = compute_totals(dec!(40), eval.discount(), eval.waives_shipping());
        assert_eq!(t.tax, dec!(4.00));
        assert_eq!(t.shipping, dec!(5.99));
        assert_eq!(t.total, dec!(49.99));
    }

    #[test]
    fn free_shipping_code_on_a_small_cart() {
        let now = Utc::now();
        let offer = Offer {
            kind: OfferKind::FreeShipping,
            value: dec!(0),
            min_amount: None,
            ..summer20()
        };
        let eval = evaluate(&offer, &[], &[Uuid::new_v4()], dec!(30), now);
        let t = compute_totals(dec!(30), eval.discount(), eval.waives_shipping());
        assert_eq!(t.shipping, dec!(0));
        assert_eq!(t.total, dec!(33.00));
    }
}

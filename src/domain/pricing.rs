//! Order total computation: subtotal, discount, tax, shipping.

use rust_decimal::Decimal;

/// Flat 10% tax, computed on the subtotal before discount.
fn tax_rate() -> Decimal {
    Decimal::new(10, 2)
}

/// Flat shipping fee, waived above the free-shipping threshold.
fn shipping_fee() -> Decimal {
    Decimal::new(599, 2)
}

fn free_shipping_threshold() -> Decimal {
    Decimal::new(50, 0)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

/// Combine subtotal and discount with the tax and shipping rules.
///
/// `waive_shipping` comes from a FREE_SHIPPING offer; orders above the
/// threshold ship free regardless.
pub fn compute_totals(subtotal: Decimal, discount: Decimal, waive_shipping: bool) -> OrderTotals {
    let tax = (subtotal * tax_rate()).round_dp(2);
    let shipping = if waive_shipping || subtotal > free_shipping_threshold() {
        Decimal::ZERO
    } else {
        shipping_fee()
    };
    let total = subtotal - discount + tax + shipping;
    OrderTotals {
        subtotal,
        discount,
        tax,
        shipping,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn discounted_order_above_threshold() {
        // $100 cart with a 20% offer applied: $10 tax, free shipping.
        let t = compute_totals(dec!(100), dec!(20), false);
        assert_eq!(t.tax, dec!(10.00));
        assert_eq!(t.shipping, dec!(0));
        assert_eq!(t.total, dec!(90.00));
    }

    #[test]
    fn small_order_pays_shipping() {
        // $40 cart, no discount: $4 tax plus the $5.99 fee.
        let t = compute_totals(dec!(40), dec!(0), false);
        assert_eq!(t.tax, dec!(4.00));
        assert_eq!(t.shipping, dec!(5.99));
        assert_eq!(t.total, dec!(49.99));
    }

    #[test]
    fn threshold_is_exclusive() {
        let t = compute_totals(dec!(50), dec!(0), false);
        assert_eq!(t.shipping, dec!(5.99));
        let t = compute_totals(dec!(50.01), dec!(0), false);
        assert_eq!(t.shipping, dec!(0));
    }

    #[test]
    fn waiver_zeroes_shipping_below_threshold() {
        let t = compute_totals(dec!(30), dec!(0), true);
        assert_eq!(t.shipping, dec!(0));
        assert_eq!(t.total, dec!(33.00));
    }

    #[test]
    fn tax_ignores_discount() {
        let t = compute_totals(dec!(100), dec!(100), false);
        assert_eq!(t.tax, dec!(10.00));
        assert_eq!(t.total, dec!(10.00));
    }
}

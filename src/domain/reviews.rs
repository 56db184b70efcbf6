//! Product rating aggregation.

use rust_decimal::Decimal;

/// Recompute a product's rating from the full set of its active
/// reviews. A rescan rather than a running mean; rounding therefore
/// never drifts across writes.
pub fn aggregate(ratings: &[i32]) -> (Decimal, i32) {
    if ratings.is_empty() {
        return (Decimal::ZERO, 0);
    }
    let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
    let mean = (Decimal::from(sum) / Decimal::from(ratings.len() as i64)).round_dp(2);
    (mean, ratings.len() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_resets_to_zero() {
        assert_eq!(aggregate(&[]), (Decimal::ZERO, 0));
    }

    #[test]
    fn mean_of_active_ratings() {
        assert_eq!(aggregate(&[5, 4, 4]), (dec!(4.33), 3));
        assert_eq!(aggregate(&[1, 5]), (dec!(3.00), 2));
    }

    #[test]
    fn single_review() {
        assert_eq!(aggregate(&[4]), (dec!(4.00), 1));
    }
}

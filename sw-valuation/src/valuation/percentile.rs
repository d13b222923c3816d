//! Historical percentile rank.

/// Round to two decimal places, ties to even.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Percentile rank of `value` within `history`, in `[0, 100]`.
///
/// Missing (and NaN) entries are dropped first. Ties count at half weight:
///
/// ```text
/// (count_below + 0.5 × count_equal) / n × 100
/// ```
///
/// Returns `None` when `value` is missing or nothing is left of `history`.
/// The result is rounded to two decimals.
pub fn percentile_rank(history: &[Option<f64>], value: Option<f64>) -> Option<f64> {
    let value = value.filter(|v| !v.is_nan())?;

    let mut n = 0usize;
    let mut count_below = 0usize;
    let mut count_equal = 0usize;

    for x in history.iter().flatten().filter(|x| !x.is_nan()) {
        n += 1;
        if *x < value {
            count_below += 1;
        } else if *x == value {
            count_equal += 1;
        }
    }

    if n == 0 {
        return None;
    }

    let rank = (count_below as f64 + 0.5 * count_equal as f64) / n as f64 * 100.0;
    Some(round2(rank))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_ties_count_half() {
        let history = some(&[10.0, 20.0, 20.0, 30.0]);
        assert_eq!(percentile_rank(&history, Some(20.0)), Some(50.0));
    }

    #[test]
    fn test_all_equal_is_fifty() {
        let history = some(&[7.5; 9]);
        assert_eq!(percentile_rank(&history, Some(7.5)), Some(50.0));
    }

    #[test]
    fn test_unique_value_without_ties() {
        // count_below = 2, n = 5 → (2 + 0.5) / 5 × 100
        let history = some(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(percentile_rank(&history, Some(3.0)), Some(50.0));

        let history = some(&[5.0, 1.0, 4.0, 2.0]);
        assert_eq!(percentile_rank(&history, Some(4.0)), Some(62.5));
    }

    #[test]
    fn test_strict_minimum_and_maximum() {
        let history = some(&[3.0, 1.0, 2.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        // 0.5 / 8 × 100
        assert_eq!(percentile_rank(&history, Some(1.0)), Some(6.25));
        // 7.5 / 8 × 100
        assert_eq!(percentile_rank(&history, Some(8.0)), Some(93.75));
    }

    #[test]
    fn test_value_outside_history() {
        let history = some(&[10.0, 20.0]);
        assert_eq!(percentile_rank(&history, Some(5.0)), Some(0.0));
        assert_eq!(percentile_rank(&history, Some(25.0)), Some(100.0));
    }

    #[test]
    fn test_missing_entries_are_dropped() {
        let history = vec![Some(10.0), None, Some(20.0), Some(f64::NAN), Some(30.0)];
        // n = 3, count_below = 1, count_equal = 1
        assert_eq!(percentile_rank(&history, Some(20.0)), Some(50.0));
    }

    #[test]
    fn test_undefined_cases() {
        assert_eq!(percentile_rank(&some(&[1.0, 2.0]), None), None);
        assert_eq!(percentile_rank(&some(&[1.0, 2.0]), Some(f64::NAN)), None);
        assert_eq!(percentile_rank(&[], Some(1.0)), None);
        assert_eq!(percentile_rank(&[None, None], Some(1.0)), None);
    }

    #[test]
    fn test_rounded_to_two_decimals() {
        // (1 + 0.5) / 3 × 100 = 50.0; (0 + 0.5) / 3 × 100 = 16.666…
        let history = some(&[1.0, 2.0, 3.0]);
        assert_eq!(percentile_rank(&history, Some(1.0)), Some(16.67));
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(25.314), 25.31);
        assert_eq!(round2(25.316), 25.32);
        assert_eq!(round2(3.125), 3.12);
        assert_eq!(round2(3.375), 3.38);
    }

    #[test]
    fn test_exact_tie_rounds_to_even() {
        // 0.5 / 16 × 100 = 3.125 exactly
        let history: Vec<Option<f64>> = (1..=16).map(|i| Some(f64::from(i))).collect();
        assert_eq!(percentile_rank(&history, Some(1.0)), Some(3.12));
        // 15.5 / 16 × 100 = 96.875 exactly
        assert_eq!(percentile_rank(&history, Some(16.0)), Some(96.88));
    }
}

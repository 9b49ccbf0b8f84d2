//! Small numeric and counting helpers shared across detectors.

use std::collections::BTreeMap;

/// Rounds to `decimals` fractional digits, half away from zero.
#[must_use]
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10_f64.powi(i32::try_from(decimals).unwrap_or(i32::MAX));
    (value * factor).round() / factor
}

/// Median of the values, or `None` when empty. Sorts in place.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn median(values: &mut Vec<i64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid] as f64)
    } else {
        Some((values[mid - 1] + values[mid]) as f64 / 2.0)
    }
}

/// Most frequent value, lexicographically first on ties. `None` for an
/// empty iterator.
pub fn mode<'a>(values: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_to_one_decimal() {
        assert!((round_to(3.14159, 1) - 3.1).abs() < f64::EPSILON);
        assert!((round_to(2.25, 1) - 2.3).abs() < f64::EPSILON);
    }

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(&mut vec![3, 1, 2]), Some(2.0));
        assert_eq!(median(&mut vec![4, 1, 2, 3]), Some(2.5));
        assert_eq!(median(&mut Vec::new()), None);
    }

    #[test]
    fn mode_breaks_ties_lexicographically() {
        let values = ["b", "a", "b", "a", "c"];
        assert_eq!(mode(values.iter().copied()), Some("a"));
        assert_eq!(mode(std::iter::empty()), None);
    }
}

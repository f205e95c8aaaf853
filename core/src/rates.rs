//! Percentage helpers shared by every aggregator.
//!
//! All rates in a report go through `percent`, so a zero denominator is
//! handled one way everywhere: the rate is 0.

/// `100 * numerator / denominator`, clamped to [0, 100].
/// Zero, negative or non-finite denominators yield 0.
pub fn percent(numerator: f64, denominator: f64) -> f64 {
    if !denominator.is_finite() || denominator <= 0.0 || !numerator.is_finite() {
        return 0.0;
    }
    clamp_pct(100.0 * numerator / denominator)
}

/// Clamp to [0, 100]; NaN becomes 0.
pub fn clamp_pct(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Round half away from zero to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Arithmetic mean; 0 for an empty input.
pub fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_denominator_is_zero() {
        assert_eq!(percent(5.0, 0.0), 0.0);
        assert_eq!(percent(0.0, 0.0), 0.0);
        assert_eq!(percent(1.0, f64::NAN), 0.0);
    }

    #[test]
    fn overshoot_is_clamped() {
        assert_eq!(percent(3.0, 2.0), 100.0);
        assert_eq!(percent(-3.0, 2.0), 0.0);
    }
}

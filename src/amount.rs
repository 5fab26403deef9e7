use crate::error::Error;

/// Base units per displayed token unit (1 unit token = 10^18 base units).
pub const UNIT: f64 = 1e18;

/// Tolerance for residual-capacity comparisons, in token units.
pub const EPSILON: f64 = 1e-6;

/// Converts a base-unit decimal string into a float token amount.
///
/// Rejects anything that does not parse to a finite non-negative number.
pub fn units_from_base(value: &str) -> Result<f64, Error> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v / UNIT)
        .ok_or_else(|| Error::InvalidAmount(value.into()))
}

/// Rounds a token amount to 6 decimals, the resolution flows are bucketed at.
pub fn round6(units: f64) -> f64 {
    (units * 1e6).round() / 1e6
}

/// The 6-decimal string form of a flow amount, used as a grouping key.
pub fn flow_key(units: f64) -> String {
    format!("{units:.6}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_base_units_to_token_units() {
        assert_eq!(units_from_base("1000000000000000000").unwrap(), 1.0);
        assert_eq!(units_from_base("500000000000000000").unwrap(), 0.5);
        assert_eq!(units_from_base("0").unwrap(), 0.0);
    }

    #[test]
    fn rejects_non_finite_and_negative_values() {
        for bad in ["", "abc", "-1", "inf", "NaN", "1.2.3"] {
            assert!(matches!(units_from_base(bad), Err(Error::InvalidAmount(_))));
        }
    }

    #[test]
    fn rounding_and_keys_agree_at_six_decimals() {
        assert_eq!(round6(0.123_456_4), 0.123_456);
        assert_eq!(round6(0.123_456_6), 0.123_457);
        assert_eq!(flow_key(0.5), "0.500000");
        assert_eq!(flow_key(1.0), "1.000000");
    }
}

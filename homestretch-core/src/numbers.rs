//! Numeric conversion helpers centralizing checked numeric casts.

use num_traits::cast::cast;

/// Round a f64 and clamp it to the u32 range, returning 0 for NaN values.
#[must_use]
pub fn round_f64_to_u32(value: f64) -> u32 {
    if value.is_nan() {
        return 0;
    }
    let max = cast::<u32, f64>(u32::MAX).unwrap_or(f64::MAX);
    let clamped = value.round().clamp(0.0, max);
    cast::<f64, u32>(clamped).unwrap_or(0)
}

/// Floor a f64 into a list index, saturating at `usize::MAX` and mapping NaN/negatives to 0.
#[must_use]
pub fn floor_f64_to_index(value: f64) -> usize {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    cast::<f64, usize>(value.floor()).unwrap_or(usize::MAX)
}

/// Floor a value in `[0, 1)` scaled by `upper` into `[0, upper)`.
#[must_use]
pub fn scale_unit_to_u32(unit: f64, upper: u32) -> u32 {
    if upper == 0 || unit.is_nan() || unit <= 0.0 {
        return 0;
    }
    let scaled = (unit * f64::from(upper)).floor();
    let top = f64::from(upper - 1);
    cast::<f64, u32>(scaled.min(top)).unwrap_or(0)
}

/// Convert a count to f64 while allowing precision loss in a single location.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_to_u32_handles_edges() {
        assert_eq!(round_f64_to_u32(64_999.5), 65_000);
        assert_eq!(round_f64_to_u32(f64::NAN), 0);
        assert_eq!(round_f64_to_u32(-4.0), 0);
        assert_eq!(round_f64_to_u32(f64::from(u32::MAX) * 2.0), u32::MAX);
    }

    #[test]
    fn index_flooring_saturates() {
        assert_eq!(floor_f64_to_index(2.9), 2);
        assert_eq!(floor_f64_to_index(-1.0), 0);
        assert_eq!(floor_f64_to_index(f64::INFINITY), usize::MAX);
    }

    #[test]
    fn unit_scaling_stays_below_upper() {
        assert_eq!(scale_unit_to_u32(0.5, 100_000), 50_000);
        assert_eq!(scale_unit_to_u32(0.999_999_999_9, 10), 9);
        assert_eq!(scale_unit_to_u32(0.3, 0), 0);
    }
}

//! Clamping numeric conversions for pixel coordinates

/// Clamp and convert f64 to u32 for pixel coordinates.
/// Non-finite values map to `min`; fractions are truncated.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn f64_to_u32_clamp(value: f64, min: u32, max: u32) -> u32 {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };

    if !value.is_finite() {
        return min;
    }

    let clamped = value.clamp(f64::from(min), f64::from(max));
    (clamped as u32).clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_f64_to_u32_clamp() {
        assert_eq!(f64_to_u32_clamp(50.5, 0, 100), 50);
        assert_eq!(f64_to_u32_clamp(-10.0, 0, 100), 0);
        assert_eq!(f64_to_u32_clamp(150.0, 0, 100), 100);
        assert_eq!(f64_to_u32_clamp(f64::NAN, 3, 100), 3);
        // swapped bounds
        assert_eq!(f64_to_u32_clamp(150.0, 100, 0), 100);
    }

    proptest! {
        #[test]
        fn prop_f64_to_u32_clamp_always_within_bounds(
            value in any::<f64>(),
            min in any::<u32>(),
            max in any::<u32>()
        ) {
            let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
            let result = f64_to_u32_clamp(value, min, max);
            prop_assert!(result >= lo);
            prop_assert!(result <= hi);
        }
    }
}

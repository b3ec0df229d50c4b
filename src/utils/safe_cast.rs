//! Checked conversions between floating-point signal values and integer
//! pixel coordinates

/// Round and clamp f64 to i32 for pixel coordinates
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Clamping ensures safe truncation
pub fn f64_to_i32_clamp(value: f64, min: i32, max: i32) -> i32 {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };

    if !value.is_finite() {
        return min;
    }

    let clamped = value.round().clamp(f64::from(min), f64::from(max));
    (clamped as i32).clamp(min, max)
}

/// Narrow a pixel coordinate to the 16-bit range used by the X11 protocol
#[must_use]
pub fn i32_to_i16_clamp(value: i32) -> i16 {
    i16::try_from(value.clamp(i32::from(i16::MIN), i32::from(i16::MAX))).unwrap_or(0)
}

/// Convert a screen dimension to the largest valid pixel coordinate
#[must_use]
pub fn max_pixel(dimension: u32) -> i32 {
    i32::try_from(dimension.saturating_sub(1)).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_f64_to_i32_clamp() {
        assert_eq!(f64_to_i32_clamp(529.6, 0, 999), 530);
        assert_eq!(f64_to_i32_clamp(-10.0, 0, 999), 0);
        assert_eq!(f64_to_i32_clamp(1500.0, 0, 999), 999);
        assert_eq!(f64_to_i32_clamp(f64::NAN, 0, 999), 0);
        assert_eq!(f64_to_i32_clamp(5.0, 10, 0), 5);
    }

    #[test]
    fn test_i32_to_i16_clamp() {
        assert_eq!(i32_to_i16_clamp(1919), 1919);
        assert_eq!(i32_to_i16_clamp(100_000), i16::MAX);
        assert_eq!(i32_to_i16_clamp(-100_000), i16::MIN);
    }

    #[test]
    fn test_max_pixel() {
        assert_eq!(max_pixel(1920), 1919);
        assert_eq!(max_pixel(0), 0);
    }

    proptest! {
        #[test]
        fn prop_f64_to_i32_clamp_always_within_bounds(
            value in any::<f64>(),
            min in -10_000i32..10_000,
            max in -10_000i32..10_000
        ) {
            let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
            let result = f64_to_i32_clamp(value, min, max);
            prop_assert!(result >= lo);
            prop_assert!(result <= hi);
        }
    }
}

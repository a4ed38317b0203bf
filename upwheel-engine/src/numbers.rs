//! Numeric conversion helpers centralizing the casts used by capacity math.

use num_traits::cast::cast;

/// Convert i64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn i64_to_f64(value: i64) -> f64 {
    cast::<i64, f64>(value).unwrap_or(0.0)
}

/// Convert a selection count to f64 for comparison against fractional limits.
#[must_use]
pub fn count_to_f64(value: u32) -> f64 {
    f64::from(value)
}

/// Convert a collection length to f64, saturating at `u32::MAX`.
#[must_use]
pub fn len_to_f64(value: usize) -> f64 {
    u32::try_from(value).map_or(f64::from(u32::MAX), f64::from)
}

/// Convert a collection length to i64, saturating at `i64::MAX`.
#[must_use]
pub fn len_to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

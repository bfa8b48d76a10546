//! Utility functions for coordinate quantisation and floor elevations

/// Fixed identity epsilon: every derived coordinate and distance is floored to
/// a multiple of this value before it is compared or used as a graph key.
pub const COORD_EPSILON: f64 = 0.01;

/// Precomputed constant: 1.0 / COORD_EPSILON
const COORD_SCALE: f64 = 100.0;

/// Default height of one floor in map units
pub const DEFAULT_FLOOR_HEIGHT: f64 = 250.0;

/// Floor a value to two decimal digits
///
/// This truncates toward negative infinity (not toward zero and not to the
/// nearest), so `-1.005` becomes `-1.01` and `2.999` becomes `2.99`.
#[inline(always)]
pub fn truncate(value: f64) -> f64 {
    (value * COORD_SCALE).floor() / COORD_SCALE
}

/// Elevation of the floor at `index` for a fixed floor height
#[inline(always)]
pub fn floor_elevation(index: usize, floor_height: f64) -> f64 {
    index as f64 * floor_height
}

/// Bit pattern of a coordinate with `-0.0` folded into `0.0`
///
/// Two finite values produce the same bits iff they compare equal.
#[inline(always)]
pub(crate) fn coordinate_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

//! Floating-point comparison helpers.

/// Relative tolerance used by [`is_equal`].
pub const RELATIVE_TOLERANCE: f64 = 1.0e-15;

/// Checks whether two numbers are equal up to a tolerance that scales with their magnitude.
///
/// The tolerance is `1e-15 * max(1, |x|, |y|)`, so values close to zero are compared absolutely.
pub fn is_equal(x: f64, y: f64) -> bool {
    let scale = 1.0_f64.max(x.abs()).max(y.abs());
    (x - y).abs() <= RELATIVE_TOLERANCE * scale
}

/// Checks whether `x` is zero with respect to the absolute tolerance of [`is_equal`].
pub fn is_zero(x: f64) -> bool {
    is_equal(x, 0.0)
}

//! Slip ratios. Both are dimensionless and clamped to [0, 1].

use rapier3d::prelude::Real;

/// Longitudinal slip between ground speed `a` and wheel surface speed `b`.
///
/// Zero when both are zero; otherwise the gap between them relative to the
/// larger of the two.
pub fn calc_long_slip(a: Real, b: Real) -> Real {
    if a == 0.0 && b == 0.0 {
        return 0.0;
    }
    let hi = a.max(b);
    let lo = a.min(b);
    if hi.abs() < Real::EPSILON {
        // larger value sits at zero, the other is strictly negative
        return 1.0;
    }
    let slip = (hi - lo) / hi.abs();
    if slip.is_nan() { 1.0 } else { slip.clamp(0.0, 1.0) }
}

/// Lateral slip from the contact-patch velocity angle, normalised so a pure
/// sideways slide reads 1.
pub fn calc_lat_slip(v_long: Real, v_lat: Real) -> Real {
    if v_lat == 0.0 {
        return 0.0;
    }
    if v_long == 0.0 {
        return 1.0;
    }
    let angle = (v_lat / v_long).atan().abs().to_degrees();
    let slip = angle / 90.0;
    if slip.is_nan() { 1.0 } else { slip.clamp(0.0, 1.0) }
}

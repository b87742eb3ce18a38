// ==============================================================================
// suspension.rs — SPRING / DAMPER FORCE + SLOPE COMPENSATION
// ------------------------------------------------------------------------------
// compute_suspension_force():
//     v_spring = (x - x_prev) / dt
//     F_damper = c * v_spring                 (negative while extending)
//     F_spring = max(k*x + k2*x^2 + F_damper, 0) + F_external, floored at 0
//   The result is the downforce every friction limit scales with.
//
// slope_compensation():
//   Uphill force of magnitude F_spring * sin(angle(normal, -gravity)), split
//   onto the contact basis and clamped per axis. The longitudinal share only
//   applies while braking.
// ==============================================================================

use rapier3d::prelude::{Real, Vector};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpringOutput {
    pub spring_force: Real, // N, >= 0, includes damper and external share
    pub damper_force: Real, // N, signed
    pub spring_velocity: Real,
}

pub fn compute_suspension_force(
    compression: Real,
    prev_compression: Real,
    dt: Real,
    spring_rate: Real,
    damper_rate: Real,
    spring_progression: Real,
    external_force: Real,
) -> SpringOutput {
    let spring_velocity = if dt > 0.0 { (compression - prev_compression) / dt } else { 0.0 };
    let damper_force = damper_rate * spring_velocity;

    let spring = spring_rate * compression + spring_progression * compression * compression.abs();
    let spring_force = ((spring + damper_force).max(0.0) + external_force).max(0.0);

    SpringOutput {
        spring_force,
        damper_force,
        spring_velocity,
    }
}

/// Per-axis clamps for the slope correction.
#[derive(Debug, Clone, Copy)]
pub struct SlopeLimits {
    pub lateral: Real,
    pub longitudinal: Real,
}

/// Uphill correction force (world space) for a contact with surface
/// `normal` under `gravity`.
pub fn slope_compensation(
    normal: Vector<Real>,
    gravity: Vector<Real>,
    forward: Vector<Real>,
    right: Vector<Real>,
    spring_force: Real,
    limits: SlopeLimits,
    braking: bool,
) -> Vector<Real> {
    let g_len = gravity.norm();
    if g_len < 1e-6 || spring_force <= 0.0 {
        return Vector::zeros();
    }
    let g = gravity / g_len;

    // cos of the angle between the push and straight up
    let cos = (-normal.dot(&g)).clamp(-1.0, 1.0);
    let misaligned = spring_force * (1.0 - cos * cos).max(0.0).sqrt();

    // (n x g) x n == gravity projected onto the contact plane, i.e. downhill
    let downhill = normal.cross(&g).cross(&normal);
    let len = downhill.norm();
    if len < 1e-6 || misaligned < 1e-6 {
        return Vector::zeros();
    }
    let correction = -downhill / len * misaligned;

    let lat = correction.dot(&right).clamp(-limits.lateral, limits.lateral);
    let long = if braking {
        correction.dot(&forward).clamp(-limits.longitudinal, limits.longitudinal)
    } else {
        0.0
    };

    right * lat + forward * long
}

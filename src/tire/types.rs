//! Core shared types for the tire solver (per-tick inputs, contact patch, outputs).

use rapier3d::prelude::{ColliderHandle, Point, Real, Vector};
use serde::Serialize;

#[inline] pub fn v3(v: Vector<Real>) -> [f32; 3] { [v.x, v.y, v.z] }
#[inline] pub fn p3(p: Point<Real>) -> [f32; 3] { [p.x, p.y, p.z] }

// ============================================
// ----- tick context / inputs ----------------
// ============================================

#[derive(Debug, Clone, Copy)]
pub struct TickContext {
    pub dt: Real,              // s, fixed step
    pub gravity: Vector<Real>, // m/s^2, world space
}

impl TickContext {
    pub fn new(dt: Real) -> Self {
        Self { dt, gravity: Vector::new(0.0, -9.81, 0.0) }
    }
}

/// Contact supplied by an outside system instead of a probe.
#[derive(Debug, Clone, Copy)]
pub struct ExternalContact {
    pub point: Point<Real>,
    pub normal: Vector<Real>,
    pub collider: Option<ColliderHandle>,
}

/// Control inputs, set by the vehicle controller before each tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct WheelInputs {
    pub motor_torque: Real,          // N*m, signed
    pub brake_torque: Real,          // N*m, magnitude
    pub steering_angle: Real,        // degrees about the suspension axis
    pub external_spring_force: Real, // N, added on top of spring + damper
    pub external_contact: Option<ExternalContact>,
}

// ============================================
// ----- contact patch ------------------------
// ============================================

/// Per-tick contact snapshot. Rebuilt from scratch every grounded tick and
/// reset to `ContactPatch::default()` every airborne tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPatch {
    pub collider: Option<ColliderHandle>,

    // geometry
    pub hit_point: Point<Real>,
    pub force_point: Point<Real>,
    pub normal: Vector<Real>,
    pub forward: Vector<Real>, // wheel forward projected on the contact plane
    pub right: Vector<Real>,   // normal x forward

    // kinematics, x = lateral, y = normal, z = longitudinal
    pub local_velocity: Vector<Real>,

    // suspension
    pub compression: Real,
    pub compression_fraction: Real,
    pub spring_force: Real,
    pub damper_force: Real,

    // friction
    pub slip_long: Real,
    pub slip_lat: Real,
    pub long_force: Real,
    pub lat_force: Real,

    pub applied_force: Vector<Real>,
}

impl Default for ContactPatch {
    fn default() -> Self {
        Self {
            collider: None,
            hit_point: Point::origin(),
            force_point: Point::origin(),
            normal: Vector::zeros(),
            forward: Vector::zeros(),
            right: Vector::zeros(),
            local_velocity: Vector::zeros(),
            compression: 0.0,
            compression_fraction: 0.0,
            spring_force: 0.0,
            damper_force: 0.0,
            slip_long: 0.0,
            slip_lat: 0.0,
            long_force: 0.0,
            lat_force: 0.0,
            applied_force: Vector::zeros(),
        }
    }
}

// ============================================
// ----- outputs ------------------------------
// ============================================

/// Read-only result surface polled by controllers, visuals and telemetry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WheelOutputs {
    pub grounded: bool,
    pub compression: f32,
    pub compression_fraction: f32,
    pub spring_force: f32,
    pub damper_force: f32,
    pub long_force: f32,
    pub lat_force: f32,
    pub slip_long: f32,
    pub slip_lat: f32,
    pub angular_velocity: f32,
    pub rpm: f32,
    pub local_velocity: [f32; 3],
    pub contact_normal: [f32; 3],
    pub hit_point: [f32; 3],
    pub applied_force: [f32; 3],
    #[serde(skip)]
    pub collider: Option<ColliderHandle>,
}

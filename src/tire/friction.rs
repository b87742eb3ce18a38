// ==============================================================================
// friction.rs — STANDARD TIRE FRICTION (FORCE DOMAIN, WHEEL-SPIN STATE)
// ==============================================================================
// Grounded tick, in order:
//   1) motor torque               -> w
//   2) rolling resistance (Fz*Crr)-> w, never flips the sign of w
//   3) rotational resistance      -> w, proportional to w
//   4) brake, first pass          -> w, up to |w|; leftover kept as w_brake_delta
//   5) slip ratios from v_long / v_wheel / v_lat
//   6) curve lookups:  F_max = curve(slip) * Fz * mu_axis * mu_surface
//   7) lateral force   = F_lat_max, capped at |v_lat| * Fz, opposing v_lat
//   8) traction: torque to close the wheel/ground speed gap in one tick,
//      clamped by F_long_max, reacted back into w
//   9) brake, second pass: lock the wheel if the leftover covers |w| and spend
//      remaining curve headroom stopping the contact, else spin w down
//  10) friction circle: |(F_lat, F_long)| <= 0.5*(max_fwd + max_side)*Fz
//  post: a force that flipped sign since last tick is cut to 10 %
//
// Airborne tick: motor, rotational resistance and brake only.
// ==============================================================================

use rapier3d::prelude::{Real, Vector};

use crate::config::FrictionModel;
use crate::tire::curve::{FrictionCurve, TabulatedCurve};
use crate::tire::slip::{calc_lat_slip, calc_long_slip};
use crate::tire::state::WheelState;

/// Share of a sign-flipped force that survives the anti-jitter filter.
pub const SIGN_FLIP_DAMPING: Real = 0.1;

/// Everything the solver reads for one grounded tick.
#[derive(Debug, Clone, Copy)]
pub struct FrictionInput<'a> {
    pub dt: Real,
    pub downforce: Real,             // N, spring + damper + external
    pub local_velocity: Vector<Real>,// x = lateral, y = normal, z = longitudinal
    pub motor_torque: Real,
    pub brake_torque: Real,
    pub forward_coefficient: Real,
    pub side_coefficient: Real,
    pub surface_coefficient: Real,
    pub rolling_resistance: Real,
    pub rotational_resistance: Real,
    pub forward_curve: &'a TabulatedCurve,
    pub side_curve: &'a TabulatedCurve,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrictionOutput {
    pub long_force: Real,
    pub lat_force: Real,
    pub slip_long: Real,
    pub slip_lat: Real,
}

pub trait FrictionSolver {
    /// Integrate wheel spin and resolve contact forces for a grounded tick.
    fn solve(&self, state: &mut WheelState, input: &FrictionInput<'_>) -> FrictionOutput;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFriction;

static STANDARD: StandardFriction = StandardFriction;

/// Solver backing a configured model. Every selector currently resolves to
/// the standard model.
pub fn solver_for(model: FrictionModel) -> &'static dyn FrictionSolver {
    match model {
        FrictionModel::Standard | FrictionModel::Pacejka | FrictionModel::PhysX => &STANDARD,
    }
}

/// `signum` that returns 0 for 0.
#[inline]
pub fn sign(x: Real) -> Real {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Apply up to `w_brake_max` of brake impulse against `w`.
/// Returns the new `w` and the unused part of the impulse.
#[inline]
fn brake_pass(w: Real, w_brake_max: Real) -> (Real, Real) {
    let w_brake = w.abs().min(w_brake_max);
    (w - sign(w) * w_brake, w_brake_max - w_brake)
}

/// Scale `(lat, long)` down onto the friction circle of radius `max`.
pub fn combinatorial_friction(lat: Real, long: Real, max: Real) -> (Real, Real) {
    let len = (lat * lat + long * long).sqrt();
    if len > max && len > 0.0 {
        let scale = max.max(0.0) / len;
        (lat * scale, long * scale)
    } else {
        (lat, long)
    }
}

/// Cut a force that reversed direction since the previous tick.
#[inline]
pub fn damp_sign_flip(force: Real, previous: Real) -> Real {
    if force * previous < 0.0 {
        force * SIGN_FLIP_DAMPING
    } else {
        force
    }
}

/// Resistance proportional to spin. Never reverses ω.
#[inline]
fn bearing_drag(w: Real, rate: Real) -> Real {
    w - sign(w) * (w.abs() * rate).min(w.abs())
}

/// Spin-only integration while no contact exists.
pub fn integrate_airborne(
    state: &mut WheelState,
    dt: Real,
    motor_torque: Real,
    brake_torque: Real,
    rotational_resistance: Real,
) {
    let i_inv = state.inertia_inv();
    let mut w = state.angular_velocity;

    w += motor_torque * i_inv * dt;
    w = bearing_drag(w, rotational_resistance * state.radius_inv() * i_inv * dt);
    let (w, _) = brake_pass(w, brake_torque.max(0.0) * i_inv * dt);

    state.angular_velocity = w;
}

impl FrictionSolver for StandardFriction {
    fn solve(&self, state: &mut WheelState, f: &FrictionInput<'_>) -> FrictionOutput {
        let dt = f.dt;
        if dt <= 0.0 {
            return FrictionOutput::default();
        }

        let fz = f.downforce.max(0.0);
        let r = state.radius();
        let r_inv = state.radius_inv();
        let i_inv = state.inertia_inv();
        let v_lat = f.local_velocity.x;
        let v_long = f.local_velocity.z;
        let mut w = state.angular_velocity;

        // 1) motor
        w += f.motor_torque * i_inv * dt;

        // 2) rolling resistance
        let t_roll = fz * f.rolling_resistance * r;
        let w_roll = (t_roll * i_inv * dt).min(w.abs());
        w -= sign(w) * w_roll;

        // 3) rotational resistance
        w = bearing_drag(w, f.rotational_resistance * r_inv * i_inv * dt);

        // 4) brake, first pass
        let (w_braked, w_brake_delta) = brake_pass(w, f.brake_torque.max(0.0) * i_inv * dt);
        w = w_braked;

        // 5) slip
        let v_wheel = w * r;
        let slip_long = calc_long_slip(v_long, v_wheel);
        let slip_lat = calc_lat_slip(v_long, v_lat);
        let v_wheel_delta = v_long - v_wheel;

        // 6) available force per axis
        let mu_surface = f.surface_coefficient;
        let f_long_max =
            f.forward_curve.evaluate(slip_long) * fz * f.forward_coefficient * mu_surface;
        let f_lat_max = f.side_curve.evaluate(slip_lat) * fz * f.side_coefficient * mu_surface;

        // 7) lateral
        let lat_stop = v_lat.abs() * fz;
        let mut lat = -sign(v_lat) * f_lat_max.min(lat_stop);

        // 8) traction
        let w_delta = v_wheel_delta * r_inv;
        let t_tract_max = (w_delta * state.inertia() / dt).abs();
        let f_tract = (t_tract_max * r_inv).min(f_long_max);
        let mut long = -sign(v_wheel_delta) * f_tract;
        w += sign(v_wheel_delta) * f_tract * r * i_inv * dt;

        // 9) brake, second pass
        if w.abs() < w_brake_delta {
            w = 0.0;
            let headroom = (f_long_max - long.abs()).max(0.0);
            let stop = v_long.abs() * fz;
            long -= sign(v_long) * headroom.min(stop);
        } else {
            w -= sign(w) * w_brake_delta;
        }

        // 10) friction circle
        let max = 0.5 * (f.forward_curve.max() + f.side_curve.max()) * fz;
        (lat, long) = combinatorial_friction(lat, long, max);

        long = damp_sign_flip(long, state.prev_long_force);
        lat = damp_sign_flip(lat, state.prev_lat_force);

        state.angular_velocity = w;

        FrictionOutput {
            long_force: long,
            lat_force: lat,
            slip_long,
            slip_lat,
        }
    }
}

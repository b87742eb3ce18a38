// ==============================================================================
// vehicle.rs — DEMO FOUR-WHEEL VEHICLE (CONTROLS -> WHEEL INPUTS)
// ------------------------------------------------------------------------------
// A chassis body plus four WheelColliders (FL, FR, RL, RR).
//
// update(...) per step:
//   1) controls: clamp driver input, speed-sensitive rate-limited steering
//   2) distribute: ackermann angles to steered wheels, motor torque split
//      across driven wheels, brake torque to every wheel
//   3) tick each wheel against the host
//
// Steering sign: positive steer turns right (+X), matching the wheel frame.
// ==============================================================================

use std::fmt;

use rapier3d::prelude::{Point, Real, RigidBodyHandle};
use serde::{Deserialize, Serialize};

use crate::config::{WheelConfig, positive};
use crate::error::ConfigError;
use crate::tire::{TickContext, WheelOutputs};
use crate::wheel::{TickHooks, WheelCollider, WheelHost, WheelMount};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WheelId { FL, FR, RL, RR }

impl WheelId {
    pub const ALL: [WheelId; 4] = [WheelId::FL, WheelId::FR, WheelId::RL, WheelId::RR];

    pub fn as_str(&self) -> &'static str {
        match self {
            WheelId::FL => "FL",
            WheelId::FR => "FR",
            WheelId::RL => "RL",
            WheelId::RR => "RR",
        }
    }

    pub fn is_front(&self) -> bool {
        matches!(self, WheelId::FL | WheelId::FR)
    }

    pub fn is_left(&self) -> bool {
        matches!(self, WheelId::FL | WheelId::RL)
    }
}

impl fmt::Display for WheelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveLayout {
    Front,
    #[default]
    Rear,
    All,
}

impl DriveLayout {
    fn drives(&self, id: WheelId) -> bool {
        match self {
            DriveLayout::Front => id.is_front(),
            DriveLayout::Rear => !id.is_front(),
            DriveLayout::All => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    pub mass: f32,              // kg
    pub linear_damping: f32,    // drag
    pub angular_damping: f32,   // rotational drag

    // --- Geometry ---
    pub wheelbase: f32,         // meters (front axle to rear axle)
    pub track_width: f32,       // meters (left to right)
    pub mount_height: f32,      // suspension top, chassis local y
    pub max_steer_angle: f32,   // degrees
    pub max_steer_rate: f32,    // degrees / sec
    pub ackermann: f32,         // 0..1 blend (0 = parallel, 1 = full ackermann)

    // --- Drivetrain ---
    pub drive: DriveLayout,
    pub max_motor_torque: f32,  // N*m, split across driven wheels
    pub max_brake_torque: f32,  // N*m, per wheel

    // --- Suspension ---
    pub suspension_sag: Option<f32>, // m of static sag, null keeps the wheel block's rates
    pub suspension_damping: f32,     // damping ratio used with the sag

    // --- Chassis geometry ---
    pub chassis_half_extents: [f32; 3], // [hx, hy, hz] meters
    pub chassis_com_offset: [f32; 3],   // local offset from collider center

    pub wheel: WheelConfig,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            mass: 1350.0,
            linear_damping: 0.05,
            angular_damping: 0.5,

            wheelbase: 2.6,
            track_width: 1.6,
            mount_height: -0.2,
            max_steer_angle: 35.0,
            max_steer_rate: 180.0,
            ackermann: 1.0,

            drive: DriveLayout::Rear,
            max_motor_torque: 1600.0,
            max_brake_torque: 2500.0,

            suspension_sag: Some(0.08),
            suspension_damping: 0.4,

            chassis_half_extents: [0.9, 0.35, 2.1],
            chassis_com_offset: [0.0, 0.0, 0.0],

            wheel: WheelConfig::default(),
        }
    }
}

impl VehicleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("vehicle mass", self.mass)?;
        positive("wheelbase", self.wheelbase)?;
        positive("track_width", self.track_width)?;
        for (field, v) in ["hx", "hy", "hz"].into_iter().zip(self.chassis_half_extents) {
            positive(field, v)?;
        }
        if !(0.0..=1.0).contains(&self.ackermann) {
            return Err(ConfigError::OutOfRange {
                field: "ackermann",
                value: self.ackermann,
                min: 0.0,
                max: 1.0,
            });
        }
        if let Some(sag) = self.suspension_sag {
            positive("suspension_sag", sag)?;
        }
        self.wheel.validate()
    }

    /// Sprung mass carried by one wheel.
    pub fn sprung_mass_per_wheel(&self) -> f32 {
        self.mass / WheelId::ALL.len() as f32
    }

    /// (spring, damper) rates from a static sag and damping ratio.
    pub fn suspension_rates(&self, sag_m: f32, zeta: f32) -> (f32, f32) {
        let m = self.sprung_mass_per_wheel();
        let g = 9.81_f32;
        let f_static = m * g;                   // per wheel
        let k = f_static / sag_m.max(1e-3);     // N/m

        // c = 2*zeta*sqrt(k*m)
        (k, 2.0 * zeta * (k * m).sqrt())
    }

    /// Wheel config every corner is built from, with sag tuning applied
    /// against the current mass.
    pub fn wheel_config(&self) -> WheelConfig {
        let mut wheel = self.wheel.clone();
        if let Some(sag) = self.suspension_sag {
            (wheel.spring_rate, wheel.damper_rate) = self.suspension_rates(sag, self.suspension_damping);
        }
        wheel
    }

    fn mount(&self, id: WheelId) -> Point<Real> {
        let x = if id.is_left() { -0.5 } else { 0.5 } * self.track_width;
        let z = if id.is_front() { 0.5 } else { -0.5 } * self.wheelbase;
        Point::new(x, self.mount_height, z)
    }
}

// --------------------------------------------------
// ackermann steering angles (stateless)
// --------------------------------------------------
/// `base` is the centreline bicycle-model angle in radians, positive right.
/// Returns (left, right) in radians.
pub fn ackermann_angles(base: f32, wheelbase: f32, track: f32) -> (f32, f32) {
    let eps = 1e-4;
    if base.abs() < eps {
        return (0.0, 0.0);
    }

    let sign = base.signum();
    let a = base.abs();

    // turning radius of the centreline bicycle model
    let r = wheelbase / a.tan();

    let r_in = (r - track * 0.5).max(0.01);
    let r_out = (r + track * 0.5).max(0.01);

    let inner = (wheelbase / r_in).atan() * sign;
    let outer = (wheelbase / r_out).atan() * sign;

    // turning right, the right wheel is inside
    if sign > 0.0 { (outer, inner) } else { (inner, outer) }
}

#[derive(Debug, Clone)]
pub struct VehicleWheel {
    pub id: WheelId,
    pub drive: bool,
    pub steer: bool,
    pub collider: WheelCollider,
}

#[derive(Debug, Clone)]
pub struct Vehicle {
    pub body: RigidBodyHandle,  // the chassis body
    pub config: VehicleConfig,  // vehicle parameters
    pub throttle: f32,          // -1.0 (full reverse) .. 1.0 (full forward)
    pub steer: f32,             // -1.0 (full left) .. 1.0 (full right)
    pub brake: f32,             // 0.0 (no brake) .. 1.0 (full brake)
    pub steer_angle: f32,       // current centreline steering angle (degrees)
    pub wheels: Vec<VehicleWheel>,
}

impl Vehicle {
    pub fn new(body: RigidBodyHandle, config: VehicleConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let wheel_config = config.wheel_config();
        let mut wheels = Vec::with_capacity(WheelId::ALL.len());
        for id in WheelId::ALL {
            let mut collider = WheelCollider::new(wheel_config.clone(), WheelMount::at(config.mount(id)))?;
            collider.attach(body);
            wheels.push(VehicleWheel {
                id,
                drive: config.drive.drives(id),
                steer: id.is_front(),
                collider,
            });
        }

        Ok(Self {
            body,
            config,
            throttle: 0.0,
            steer: 0.0,
            brake: 0.0,
            steer_angle: 0.0,
            wheels,
        })
    }

    pub fn set_input(&mut self, throttle: f32, steer: f32, brake: f32) {
        self.throttle = throttle.clamp(-1.0, 1.0);
        self.steer = steer.clamp(-1.0, 1.0);
        self.brake = brake.clamp(0.0, 1.0);
    }

    pub fn wheel(&self, id: WheelId) -> Option<&VehicleWheel> {
        self.wheels.iter().find(|w| w.id == id)
    }

    pub fn outputs(&self) -> impl Iterator<Item = (WheelId, WheelOutputs)> + '_ {
        self.wheels.iter().map(|w| (w.id, w.collider.outputs()))
    }

    /// Speed-sensitive, rate-limited steering.
    pub fn apply_controls(&mut self, dt: f32, speed: f32) {
        let steer_scale = (1.0 - (speed / 30.0)).clamp(0.35, 1.0);
        let target = self.steer * self.config.max_steer_angle * steer_scale;

        let max_step = self.config.max_steer_rate * dt;
        let delta = (target - self.steer_angle).clamp(-max_step, max_step);
        self.steer_angle += delta;
    }

    /// Push the current controls into every wheel's inputs.
    pub fn distribute(&mut self) {
        let cfg = &self.config;

        let (ack_l, ack_r) = ackermann_angles(self.steer_angle.to_radians(), cfg.wheelbase, cfg.track_width);
        let blend = |ack: f32| {
            let parallel = self.steer_angle;
            parallel + (ack.to_degrees() - parallel) * cfg.ackermann
        };
        let (left, right) = (blend(ack_l), blend(ack_r));

        let driven = self.wheels.iter().filter(|w| w.drive).count().max(1) as f32;
        let motor = self.throttle * cfg.max_motor_torque / driven;
        let brake = self.brake * cfg.max_brake_torque;

        for w in self.wheels.iter_mut() {
            let angle = match (w.steer, w.id.is_left()) {
                (false, _) => 0.0,
                (true, true) => left,
                (true, false) => right,
            };
            w.collider.set_steering_angle(angle);
            w.collider.set_motor_torque(if w.drive { motor } else { 0.0 });
            w.collider.set_brake_torque(brake);
        }
    }

    pub fn update<H: WheelHost + ?Sized>(&mut self, ctx: &TickContext, host: &mut H, hooks: &mut dyn TickHooks) {
        let speed = host
            .position(self.body)
            .and_then(|pose| host.point_velocity(self.body, &Point::from(pose.translation.vector)))
            .map(|v| v.norm())
            .unwrap_or(0.0);

        self.apply_controls(ctx.dt, speed);
        self.distribute();

        for w in self.wheels.iter_mut() {
            w.collider.tick_with_hooks(ctx, host, hooks);
        }
    }

    pub fn reset(&mut self) {
        self.throttle = 0.0;
        self.steer = 0.0;
        self.brake = 0.0;
        self.steer_angle = 0.0;
        for w in self.wheels.iter_mut() {
            w.collider.reset();
        }
    }
}

// ==============================================================================
// wheel.rs — WHEEL COLLIDER: PER-TICK ORCHESTRATION + FORCE INTEGRATION
// ------------------------------------------------------------------------------
// One WheelCollider per wheel. tick() runs:
//   frame      chassis pose * mount, steering about the suspension axis
//   contact    suspension_contact::detect_contact()
//   grounded:  patch -> spring/damper -> friction solver -> force integrator
//   airborne:  wheel spin only, patch cleared
//
// Force integrator:
//   F = dir * F_spring + slope correction + forward * F_long + right * F_lat
//   applied at the patch force point on the vehicle body, and -F on the
//   contacted body when it is dynamic.
//
// The host (rapier world, test double) is injected per tick through
// SurfaceQuery + BodyAccess. Nothing in here touches a global.
// ==============================================================================

use log::{debug, warn};
use rapier3d::na::{Unit, UnitQuaternion};
use rapier3d::prelude::{ColliderHandle, Isometry, Point, Real, RigidBodyHandle, Vector};

use crate::config::{CurveShape, FrictionModel, WheelConfig};
use crate::error::ConfigError;
use crate::suspension::{SlopeLimits, compute_suspension_force, slope_compensation};
use crate::suspension_contact::{
    ContactHit, ProbeFilter, SurfaceQuery, WheelFrame, build_contact_patch, detect_contact,
};
use crate::tire::friction::integrate_airborne;
use crate::tire::{
    ContactPatch, FrictionInput, HermiteFrictionCurve, TabulatedCurve, TickContext, WheelInputs,
    WheelOutputs, WheelState, p3, solver_for, v3,
};

/// Rigid-body side of the host.
pub trait BodyAccess {
    fn position(&self, body: RigidBodyHandle) -> Option<Isometry<Real>>;
    fn point_velocity(&self, body: RigidBodyHandle, point: &Point<Real>) -> Option<Vector<Real>>;
    fn is_dynamic(&self, body: RigidBodyHandle) -> bool;
    fn collider_body(&self, collider: ColliderHandle) -> Option<RigidBodyHandle>;
    /// Accumulated until the physics step consumes it.
    fn add_force_at_point(&mut self, body: RigidBodyHandle, force: Vector<Real>, point: Point<Real>);
}

/// Everything a wheel needs from the world for one tick.
pub trait WheelHost: SurfaceQuery + BodyAccess {}
impl<T: SurfaceQuery + BodyAccess + ?Sized> WheelHost for T {}

/// Callbacks around a tick. `pre_tick` may adjust inputs or config.
pub trait TickHooks {
    fn pre_tick(&mut self, _wheel: &mut WheelCollider) {}
    fn post_tick(&mut self, _wheel: &WheelCollider) {}
}

/// No-op hooks.
impl TickHooks for () {}

/// Where the suspension top sits on the chassis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelMount {
    pub offset: Point<Real>,              // chassis local
    pub rotation: UnitQuaternion<Real>,   // chassis local, +Y up / +Z forward
}

impl Default for WheelMount {
    fn default() -> Self {
        Self { offset: Point::origin(), rotation: UnitQuaternion::identity() }
    }
}

impl WheelMount {
    pub fn at(offset: Point<Real>) -> Self {
        Self { offset, ..Default::default() }
    }
}

#[derive(Debug, Clone)]
pub struct WheelCollider {
    config: WheelConfig,
    state: WheelState,
    mount: WheelMount,
    body: Option<RigidBodyHandle>,

    // authoring curves + the tables the solver reads
    forward_profile: HermiteFrictionCurve,
    side_profile: HermiteFrictionCurve,
    forward_curve: TabulatedCurve,
    side_curve: TabulatedCurve,

    pub inputs: WheelInputs,
    patch: ContactPatch,
    missing_body_reported: bool,
}

impl WheelCollider {
    pub fn new(config: WheelConfig, mount: WheelMount) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = WheelState::new(config.mass, config.radius)?;
        warn_fallback_model(config.friction_model);

        Ok(Self {
            forward_profile: HermiteFrictionCurve::new(config.forward_curve),
            side_profile: HermiteFrictionCurve::new(config.side_curve),
            forward_curve: TabulatedCurve::from_shape(config.forward_curve),
            side_curve: TabulatedCurve::from_shape(config.side_curve),
            config,
            state,
            mount,
            body: None,
            inputs: WheelInputs::default(),
            patch: ContactPatch::default(),
            missing_body_reported: false,
        })
    }

    // ------------------------------------------------------------------
    // wiring
    // ------------------------------------------------------------------

    pub fn attach(&mut self, body: RigidBodyHandle) {
        self.body = Some(body);
        self.missing_body_reported = false;
    }

    pub fn detach(&mut self) {
        self.body = None;
    }

    #[inline] pub fn body(&self) -> Option<RigidBodyHandle> { self.body }
    #[inline] pub fn mount(&self) -> &WheelMount { &self.mount }
    #[inline] pub fn config(&self) -> &WheelConfig { &self.config }
    #[inline] pub fn state(&self) -> &WheelState { &self.state }
    #[inline] pub fn patch(&self) -> &ContactPatch { &self.patch }
    #[inline] pub fn forward_profile(&self) -> &HermiteFrictionCurve { &self.forward_profile }
    #[inline] pub fn side_profile(&self) -> &HermiteFrictionCurve { &self.side_profile }

    pub fn set_mount(&mut self, mount: WheelMount) {
        self.mount = mount;
    }

    /// Replace the whole config. Rejected configs leave the wheel untouched.
    pub fn set_config(&mut self, config: WheelConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.state.set_mass_radius(config.mass, config.radius)?;
        if config.friction_model != self.config.friction_model {
            warn_fallback_model(config.friction_model);
        }
        self.rebuild_curves(&config);
        self.config = config;
        Ok(())
    }

    pub fn set_mass(&mut self, mass: Real) -> Result<(), ConfigError> {
        self.state.set_mass_radius(mass, self.config.radius)?;
        self.config.mass = mass;
        Ok(())
    }

    pub fn set_radius(&mut self, radius: Real) -> Result<(), ConfigError> {
        self.state.set_mass_radius(self.config.mass, radius)?;
        self.config.radius = radius;
        Ok(())
    }

    pub fn set_curves(&mut self, forward: CurveShape, side: CurveShape) -> Result<(), ConfigError> {
        let config = WheelConfig { forward_curve: forward, side_curve: side, ..self.config.clone() };
        config.validate()?;
        self.rebuild_curves(&config);
        self.config = config;
        Ok(())
    }

    fn rebuild_curves(&mut self, config: &WheelConfig) {
        self.forward_profile.set_shape(config.forward_curve);
        self.side_profile.set_shape(config.side_curve);
        self.forward_curve = TabulatedCurve::from_shape(config.forward_curve);
        self.side_curve = TabulatedCurve::from_shape(config.side_curve);
    }

    // ------------------------------------------------------------------
    // inputs
    // ------------------------------------------------------------------

    pub fn set_motor_torque(&mut self, torque: Real) {
        self.inputs.motor_torque = torque;
    }

    pub fn set_brake_torque(&mut self, torque: Real) {
        self.inputs.brake_torque = torque.max(0.0);
    }

    /// Degrees about the suspension axis, positive turns forward toward +X.
    pub fn set_steering_angle(&mut self, degrees: Real) {
        self.inputs.steering_angle = degrees;
    }

    /// Zero spin, previous-tick memory and the contact patch. Config, mount,
    /// body and inputs are kept.
    pub fn reset(&mut self) {
        self.state.reset();
        self.patch = ContactPatch::default();
    }

    // ------------------------------------------------------------------
    // tick
    // ------------------------------------------------------------------

    /// World-space frame for a chassis pose.
    pub fn frame(&self, chassis: &Isometry<Real>) -> WheelFrame {
        let origin = chassis * self.mount.offset;
        let rot = chassis.rotation * self.mount.rotation;
        let up = rot * Vector::y();

        let steer = UnitQuaternion::from_axis_angle(
            &Unit::new_normalize(up),
            self.inputs.steering_angle.to_radians(),
        );
        let forward = steer * (rot * Vector::z());
        let right = up.cross(&forward);

        WheelFrame { origin, up, forward, right }
    }

    pub fn tick<H: WheelHost + ?Sized>(&mut self, ctx: &TickContext, host: &mut H) -> WheelOutputs {
        self.tick_with_hooks(ctx, host, &mut ())
    }

    pub fn tick_with_hooks<H: WheelHost + ?Sized>(
        &mut self,
        ctx: &TickContext,
        host: &mut H,
        hooks: &mut dyn TickHooks,
    ) -> WheelOutputs {
        hooks.pre_tick(self);

        if ctx.dt.is_finite() && ctx.dt > 0.0 {
            if let Some((body, pose)) = self.resolve_body(host) {
                self.step(ctx, host, body, &pose);
            }
        }

        hooks.post_tick(self);
        self.outputs()
    }

    fn resolve_body<H: WheelHost + ?Sized>(&mut self, host: &H) -> Option<(RigidBodyHandle, Isometry<Real>)> {
        let pose = self.body.and_then(|b| host.position(b).map(|p| (b, p)));
        if pose.is_none() && !self.missing_body_reported {
            warn!("wheel has no vehicle body attached, tick skipped");
            self.missing_body_reported = true;
        }
        pose
    }

    fn step<H: WheelHost + ?Sized>(
        &mut self,
        ctx: &TickContext,
        host: &mut H,
        body: RigidBodyHandle,
        pose: &Isometry<Real>,
    ) {
        let frame = self.frame(pose);
        let filter = ProbeFilter { mask: self.config.raycast_mask, exclude_body: Some(body) };
        let hit = detect_contact(
            &*host,
            &frame,
            &self.config,
            filter,
            self.inputs.external_contact.as_ref(),
        );

        let was_grounded = self.state.grounded;
        match hit {
            Some(hit) => self.grounded_step(ctx, host, body, &frame, &hit),
            None => self.airborne_step(ctx),
        }

        if was_grounded != self.state.grounded {
            if self.state.grounded {
                debug!("wheel grounded, compression {:.3}", self.patch.compression);
            } else {
                debug!("wheel airborne, w {:.2} rad/s", self.state.angular_velocity);
            }
        }
    }

    fn grounded_step<H: WheelHost + ?Sized>(
        &mut self,
        ctx: &TickContext,
        host: &mut H,
        body: RigidBodyHandle,
        frame: &WheelFrame,
        hit: &ContactHit,
    ) {
        let cfg = &self.config;

        // relative contact velocity, minus the ground's own motion
        let chassis_vel = host.point_velocity(body, &hit.point).unwrap_or_else(Vector::zeros);
        let other = hit
            .collider
            .and_then(|c| host.collider_body(c))
            .filter(|b| *b != body && host.is_dynamic(*b));
        let ground_vel = other
            .and_then(|b| host.point_velocity(b, &hit.point))
            .unwrap_or_else(Vector::zeros);

        let mut patch = build_contact_patch(frame, hit, cfg, chassis_vel - ground_vel);

        // suspension
        let spring = compute_suspension_force(
            patch.compression,
            self.state.prev_compression,
            ctx.dt,
            cfg.spring_rate,
            cfg.damper_rate,
            cfg.spring_progression,
            self.inputs.external_spring_force,
        );
        patch.spring_force = spring.spring_force;
        patch.damper_force = spring.damper_force;

        // friction
        let friction = solver_for(cfg.friction_model).solve(
            &mut self.state,
            &FrictionInput {
                dt: ctx.dt,
                downforce: patch.spring_force,
                local_velocity: patch.local_velocity,
                motor_torque: self.inputs.motor_torque,
                brake_torque: self.inputs.brake_torque,
                forward_coefficient: cfg.forward_friction_coefficient,
                side_coefficient: cfg.side_friction_coefficient,
                surface_coefficient: cfg.surface_friction_coefficient,
                rolling_resistance: cfg.rolling_resistance,
                rotational_resistance: cfg.rotational_resistance,
                forward_curve: &self.forward_curve,
                side_curve: &self.side_curve,
            },
        );
        patch.slip_long = friction.slip_long;
        patch.slip_lat = friction.slip_lat;
        patch.long_force = friction.long_force;
        patch.lat_force = friction.lat_force;

        // force integrator
        let spring_dir = if cfg.use_suspension_normal { frame.up } else { patch.normal };
        let mut force = spring_dir * patch.spring_force
            + patch.forward * patch.long_force
            + patch.right * patch.lat_force;

        if cfg.slope_compensation {
            let grip = patch.spring_force * cfg.surface_friction_coefficient;
            force += slope_compensation(
                patch.normal,
                ctx.gravity,
                patch.forward,
                patch.right,
                patch.spring_force,
                SlopeLimits {
                    lateral: grip * cfg.side_friction_coefficient,
                    longitudinal: grip * cfg.forward_friction_coefficient,
                },
                self.inputs.brake_torque > self.inputs.motor_torque.abs(),
            );
        }
        patch.applied_force = force;

        host.add_force_at_point(body, force, patch.force_point);
        if let Some(other) = other {
            host.add_force_at_point(other, -force, patch.force_point);
        }

        self.state.prev_long_force = patch.long_force;
        self.state.prev_lat_force = patch.lat_force;
        self.state.prev_compression = patch.compression;
        self.state.grounded = true;
        self.patch = patch;
    }

    fn airborne_step(&mut self, ctx: &TickContext) {
        integrate_airborne(
            &mut self.state,
            ctx.dt,
            self.inputs.motor_torque,
            self.inputs.brake_torque,
            self.config.rotational_resistance,
        );
        self.state.prev_long_force = 0.0;
        self.state.prev_lat_force = 0.0;
        self.state.prev_compression = 0.0;
        self.state.grounded = false;
        self.patch = ContactPatch::default();
    }

    pub fn outputs(&self) -> WheelOutputs {
        let p = &self.patch;
        WheelOutputs {
            grounded: self.state.grounded,
            compression: p.compression,
            compression_fraction: p.compression_fraction,
            spring_force: p.spring_force,
            damper_force: p.damper_force,
            long_force: p.long_force,
            lat_force: p.lat_force,
            slip_long: p.slip_long,
            slip_lat: p.slip_lat,
            angular_velocity: self.state.angular_velocity,
            rpm: self.state.rpm(),
            local_velocity: v3(p.local_velocity),
            contact_normal: v3(p.normal),
            hit_point: p3(p.hit_point),
            applied_force: v3(p.applied_force),
            collider: p.collider,
        }
    }
}

fn warn_fallback_model(model: FrictionModel) {
    if model != FrictionModel::Standard {
        warn!("friction model {model:?} has no dedicated solver, using standard friction");
    }
}

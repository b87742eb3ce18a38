// src/physics.rs

use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rapier3d::na::UnitQuaternion;
use rapier3d::parry::query::details::ShapeCastOptions;
use rapier3d::prelude::*;

use crate::error::ConfigError;
use crate::suspension_contact::{ProbeFilter, SurfaceHit, SurfaceQuery};
use crate::tire::TickContext;
use crate::vehicle::{Vehicle, VehicleConfig};
use crate::wheel::{BodyAccess, TickHooks};

pub const GROUP_GROUND: Group = Group::from_bits_truncate(0b0001);
pub const GROUP_CHASSIS: Group = Group::from_bits_truncate(0b0010);

// ============================================
// ----- rapier host --------------------------
// ============================================

/// Wheel-facing view of a rapier world for one step.
pub struct RapierHost<'a> {
    pub query: &'a QueryPipeline,
    pub bodies: &'a mut RigidBodySet,
    pub colliders: &'a ColliderSet,
}

impl<'a> RapierHost<'a> {
    pub fn new(query: &'a QueryPipeline, bodies: &'a mut RigidBodySet, colliders: &'a ColliderSet) -> Self {
        Self { query, bodies, colliders }
    }

    /// Rapier keeps user forces until they are cleared. Call once per step
    /// before any wheel ticks.
    pub fn reset_user_forces(&mut self) {
        for (_, body) in self.bodies.iter_mut() {
            body.reset_forces(false);
            body.reset_torques(false);
        }
    }

    fn query_filter(filter: ProbeFilter) -> QueryFilter<'static> {
        let groups = InteractionGroups::new(Group::ALL, Group::from_bits_truncate(filter.mask));
        let mut qf = QueryFilter::default().groups(groups);
        if let Some(body) = filter.exclude_body {
            qf = qf.exclude_rigid_body(body);
        }
        qf
    }

    fn cast(
        &self,
        shape: &dyn Shape,
        pos: Isometry<Real>,
        dir: Vector<Real>,
        max_distance: Real,
        filter: ProbeFilter,
    ) -> Option<SurfaceHit> {
        let options = ShapeCastOptions {
            max_time_of_impact: max_distance,
            target_distance: 0.0,
            stop_at_penetration: true,
            compute_impact_geometry_on_penetration: true,
        };
        let (handle, hit) = self.query.cast_shape(
            &*self.bodies,
            self.colliders,
            &pos,
            &dir,
            shape,
            options,
            Self::query_filter(filter),
        )?;

        // pipeline hits are reported in world space
        Some(SurfaceHit {
            point: hit.witness1,
            normal: *hit.normal1,
            distance: hit.time_of_impact,
            collider: Some(handle),
        })
    }
}

impl SurfaceQuery for RapierHost<'_> {
    fn cast_ray(
        &self,
        origin: Point<Real>,
        dir: Vector<Real>,
        max_distance: Real,
        filter: ProbeFilter,
    ) -> Option<SurfaceHit> {
        let ray = Ray::new(origin, dir);
        let (handle, hit) = self.query.cast_ray_and_get_normal(
            &*self.bodies,
            self.colliders,
            &ray,
            max_distance,
            true,
            Self::query_filter(filter),
        )?;

        Some(SurfaceHit {
            point: ray.point_at(hit.time_of_impact),
            normal: hit.normal,
            distance: hit.time_of_impact,
            collider: Some(handle),
        })
    }

    fn cast_sphere(
        &self,
        center: Point<Real>,
        radius: Real,
        dir: Vector<Real>,
        max_distance: Real,
        filter: ProbeFilter,
    ) -> Option<SurfaceHit> {
        let ball = Ball::new(radius);
        self.cast(&ball, Isometry::translation(center.x, center.y, center.z), dir, max_distance, filter)
    }

    fn cast_capsule(
        &self,
        a: Point<Real>,
        b: Point<Real>,
        radius: Real,
        dir: Vector<Real>,
        max_distance: Real,
        filter: ProbeFilter,
    ) -> Option<SurfaceHit> {
        // segment already in world space, so the shape sits at the identity
        let capsule = Capsule::new(a, b, radius);
        self.cast(&capsule, Isometry::identity(), dir, max_distance, filter)
    }
}

impl BodyAccess for RapierHost<'_> {
    fn position(&self, body: RigidBodyHandle) -> Option<Isometry<Real>> {
        self.bodies.get(body).map(|b| *b.position())
    }

    fn point_velocity(&self, body: RigidBodyHandle, point: &Point<Real>) -> Option<Vector<Real>> {
        self.bodies.get(body).map(|b| b.velocity_at_point(point))
    }

    fn is_dynamic(&self, body: RigidBodyHandle) -> bool {
        self.bodies.get(body).is_some_and(|b| b.is_dynamic())
    }

    fn collider_body(&self, collider: ColliderHandle) -> Option<RigidBodyHandle> {
        self.colliders.get(collider).and_then(|c| c.parent())
    }

    fn add_force_at_point(&mut self, body: RigidBodyHandle, force: Vector<Real>, point: Point<Real>) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.add_force_at_point(force, point, true);
        }
    }
}

// ============================================
// ----- demo world ---------------------------
// ============================================

pub struct PhysicsWorld {
    pub gravity: Vector<Real>, // gravity vector
    pub pipeline: PhysicsPipeline, // physics pipeline
    pub island_manager: IslandManager, // manages islands of bodies
    pub broad_phase: DefaultBroadPhase, // broad-phase collision detection
    pub narrow_phase: NarrowPhase, // collision detection
    pub bodies: RigidBodySet, // for rigid bodies
    pub colliders: ColliderSet, // for collision shapes
    pub joints: ImpulseJointSet, // for constraints
    pub multibody_joints: MultibodyJointSet,// for articulated bodies
    pub ccd: CCDSolver, // continuous collision detection
    pub query_pipeline: QueryPipeline, // for wheel probes
    pub vehicles: Vec<Vehicle>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        let gravity = vector![0.0, -9.81, 0.0];

        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        // Static ground box, top surface at y = 0.
        let ground_rb = RigidBodyBuilder::fixed()
            .translation(vector![0.0, -1.0, 0.0])
            .build();
        let ground_handle = bodies.insert(ground_rb);

        let ground_collider = ColliderBuilder::cuboid(500.0, 1.0, 500.0)
            .collision_groups(InteractionGroups::new(GROUP_GROUND, GROUP_CHASSIS))
            .friction(1.2)
            .restitution(0.0)
            .build();
        colliders.insert_with_parent(ground_collider, ground_handle, &mut bodies);

        let mut world = Self {
            gravity,
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders,
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            vehicles: Vec::new(),
        };
        world.query_pipeline.update(&world.colliders);
        world
    }

    fn insert_ground_piece(&mut self, collider: ColliderBuilder, position: Isometry<Real>) {
        let rb = RigidBodyBuilder::fixed().position(position).build();
        let handle = self.bodies.insert(rb);
        let collider = collider
            .collision_groups(InteractionGroups::new(GROUP_GROUND, GROUP_CHASSIS))
            .friction(1.2)
            .build();
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        self.query_pipeline.update(&self.colliders);
    }

    /// Wedge rising along +Z, `length` long, peaking at `height`.
    pub fn add_ramp(&mut self, start_z: Real, length: Real, height: Real, width: Real) {
        let angle = (height / length).atan();
        let half_len = 0.5 * (length * length + height * height).sqrt();
        let half_thick = 0.25;

        // rotate about +X so the slab climbs toward +Z, then sink it so the
        // top face meets the ground at start_z
        let rot = UnitQuaternion::from_axis_angle(&Vector::x_axis(), -angle);
        let top_center = vector![0.0, 0.5 * height, start_z + 0.5 * length];
        let center = top_center - rot * vector![0.0, half_thick, 0.0];
        let collider = ColliderBuilder::cuboid(0.5 * width, half_thick, half_len);

        self.insert_ground_piece(collider, Isometry::from_parts(center.into(), rot));
        info!("ramp added at z = {start_z:.1}, {height:.2} m over {length:.1} m");
    }

    /// Scatter low half-buried cylinders across the driving area.
    pub fn add_bumps(&mut self, count: usize, seed: u64, extent: Real) {
        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..count {
            let x = rng.gen_range(-extent..extent);
            let z = rng.gen_range(0.0..extent * 2.0);
            let radius = rng.gen_range(0.05..0.2);
            let yaw = rng.gen_range(0.0..std::f32::consts::PI);

            // lay the cylinder on its side, then spin it about Y
            let rot = UnitQuaternion::from_axis_angle(&Vector::y_axis(), yaw)
                * UnitQuaternion::from_axis_angle(&Vector::z_axis(), std::f32::consts::FRAC_PI_2);
            let collider = ColliderBuilder::cylinder(1.5, radius);
            self.insert_ground_piece(collider, Isometry::from_parts(vector![x, 0.0, z].into(), rot));
        }
        info!("{count} bumps scattered (seed {seed})");
    }

    /// Spawn a chassis body with four wheels mounted per `config`.
    pub fn spawn_vehicle(&mut self, config: VehicleConfig, position: [f32; 3]) -> Result<usize, ConfigError> {
        config.validate()?;

        let [hx, hy, hz] = config.chassis_half_extents;
        let [cx, cy, cz] = config.chassis_com_offset;
        let volume = 8.0 * hx * hy * hz;
        let density = config.mass / volume; // ρ = m / V

        let rb = RigidBodyBuilder::dynamic()
            .translation(vector![position[0], position[1], position[2]])
            .linear_damping(config.linear_damping)
            .angular_damping(config.angular_damping)
            .ccd_enabled(true)
            .build();

        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .translation(vector![cx, cy, cz])
            .collision_groups(InteractionGroups::new(GROUP_CHASSIS, GROUP_GROUND))
            .active_events(ActiveEvents::empty())
            .density(density)
            .friction(0.0)
            .restitution(0.0)
            .build();

        let handle = self.bodies.insert(rb);
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        self.query_pipeline.update(&self.colliders);

        let vehicle = Vehicle::new(handle, config)?;
        self.vehicles.push(vehicle);

        info!("vehicle spawned at {position:?} (body = {handle:?})");
        Ok(self.vehicles.len() - 1)
    }

    pub fn step(&mut self, dt: Real) {
        self.step_with_hooks(dt, &mut ());
    }

    pub fn step_with_hooks(&mut self, dt: Real, hooks: &mut dyn TickHooks) {
        let ctx = TickContext { dt, gravity: self.gravity };

        // 1) Wheels: probe, solve, accumulate forces
        {
            let mut host = RapierHost::new(&self.query_pipeline, &mut self.bodies, &self.colliders);
            host.reset_user_forces();
            for vehicle in self.vehicles.iter_mut() {
                vehicle.update(&ctx, &mut host, hooks);
            }
        }

        // 2) Step physics, which also refreshes the query pipeline
        self.pipeline.step(
            &self.gravity,
            &IntegrationParameters {
                dt,
                ..IntegrationParameters::default()
            },
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );

        // 3) Safety: prevent bodies from exploding to insane coordinates
        for (_, body) in self.bodies.iter_mut() {
            let pos = *body.translation();
            let bad = !pos.x.is_finite() || !pos.y.is_finite() || !pos.z.is_finite()
                || pos.x.abs() > 1_000.0 || pos.y.abs() > 1_000.0 || pos.z.abs() > 1_000.0;

            if bad {
                let safe = vector![0.0, 2.0, 0.0];
                body.set_translation(safe, true);
                body.set_linvel(vector![0.0, 0.0, 0.0], true);
                body.set_angvel(vector![0.0, 0.0, 0.0], true);
                warn!("reset exploding body back to {safe:?}");
            }
        }
    }

    pub fn chassis(&self, vehicle: usize) -> Option<&RigidBody> {
        self.vehicles.get(vehicle).and_then(|v| self.bodies.get(v.body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_excludes_body_and_honours_mask() {
        let mut world = PhysicsWorld::new();
        let idx = world.spawn_vehicle(VehicleConfig::default(), [0.0, 3.0, 0.0]).unwrap();
        let body = world.vehicles[idx].body;
        world.query_pipeline.update(&world.colliders);

        let host = RapierHost::new(&world.query_pipeline, &mut world.bodies, &world.colliders);
        let down = -Vector::y();
        let from = point![0.0, 5.0, 0.0];

        // chassis excluded: ray passes through to the ground
        let hit = host
            .cast_ray(from, down, 10.0, ProbeFilter { mask: u32::MAX, exclude_body: Some(body) })
            .unwrap();
        assert!(hit.point.y.abs() < 1e-3);

        // ground group masked out: nothing but the chassis left, and it is excluded
        let masked = ProbeFilter { mask: GROUP_CHASSIS.bits(), exclude_body: Some(body) };
        assert!(host.cast_ray(from, down, 10.0, masked).is_none());
    }

    #[test]
    fn sphere_cast_reports_travel_distance() {
        let mut world = PhysicsWorld::new();
        let host = RapierHost::new(&world.query_pipeline, &mut world.bodies, &world.colliders);
        let filter = ProbeFilter { mask: u32::MAX, exclude_body: None };

        let hit = host.cast_sphere(point![0.0, 2.0, 0.0], 0.5, -Vector::y(), 5.0, filter).unwrap();
        assert!((hit.distance - 1.5).abs() < 1e-3);
        assert!(hit.normal.y > 0.99);
    }

    #[test]
    fn user_forces_are_cleared() {
        let mut world = PhysicsWorld::new();
        let idx = world.spawn_vehicle(VehicleConfig::default(), [0.0, 3.0, 0.0]).unwrap();
        let body = world.vehicles[idx].body;

        let mut host = RapierHost::new(&world.query_pipeline, &mut world.bodies, &world.colliders);
        host.add_force_at_point(body, vector![0.0, 100.0, 0.0], point![0.0, 3.0, 0.0]);
        assert!(host.bodies[body].user_force().norm() > 0.0);
        host.reset_user_forces();
        assert_eq!(host.bodies[body].user_force().norm(), 0.0);
    }

    #[test]
    fn ramp_and_bumps_are_hit_by_probes() {
        let mut world = PhysicsWorld::new();
        world.add_ramp(5.0, 10.0, 1.0, 4.0);
        let host = RapierHost::new(&world.query_pipeline, &mut world.bodies, &world.colliders);
        let filter = ProbeFilter { mask: u32::MAX, exclude_body: None };

        // halfway up the ramp the surface sits near half the height
        let hit = host.cast_ray(point![0.0, 5.0, 10.0], -Vector::y(), 10.0, filter).unwrap();
        assert!((hit.point.y - 0.5).abs() < 0.05, "ramp surface at {}", hit.point.y);
        assert!(hit.normal.z < 0.0 && hit.normal.y > 0.9);

        let mut bumpy = PhysicsWorld::new();
        let before = bumpy.colliders.len();
        bumpy.add_bumps(12, 7, 20.0);
        assert_eq!(bumpy.colliders.len(), before + 12);
    }
}

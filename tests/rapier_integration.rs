use rapier3d::prelude::*;
use test_case::test_case;

use wheel_sim::physics::{PhysicsWorld, RapierHost};
use wheel_sim::vehicle::VehicleConfig;
use wheel_sim::{SweepMode, TickContext, WheelCollider, WheelConfig, WheelMount};

const DT: f32 = 1.0 / 60.0;

fn settle(world: &mut PhysicsWorld, steps: usize) {
    for _ in 0..steps {
        world.step(DT);
    }
}

#[test_case(SweepMode::Ray; "ray")]
#[test_case(SweepMode::Sphere; "sphere")]
#[test_case(SweepMode::Capsule; "capsule")]
fn vehicle_settles_on_flat_ground(mode: SweepMode) {
    let mut config = VehicleConfig::default();
    config.wheel.sweep_mode = mode;
    let weight = config.mass * 9.81;

    let mut world = PhysicsWorld::new();
    let idx = world.spawn_vehicle(config, [0.0, 0.8, 0.0]).unwrap();
    settle(&mut world, 240);

    let vehicle = &world.vehicles[idx];
    let chassis = world.chassis(idx).unwrap();
    assert!(chassis.linvel().y.abs() < 0.05, "still bouncing: {:?}", chassis.linvel());

    let mut total = 0.0;
    for (id, out) in vehicle.outputs() {
        assert!(out.grounded, "{id} not grounded");
        assert!(out.hit_point[1].abs() < 0.05, "{id} hit at {:?}", out.hit_point);
        assert!(out.contact_normal[1] > 0.99);
        total += out.spring_force;
    }
    assert!((total - weight).abs() < 0.1 * weight, "springs carry {total} N of {weight} N");
}

#[test]
fn airborne_vehicle_gets_no_wheel_force() {
    let mut world = PhysicsWorld::new();
    let idx = world.spawn_vehicle(VehicleConfig::default(), [0.0, 5.0, 0.0]).unwrap();
    world.step(DT);

    let vehicle = &world.vehicles[idx];
    assert!(vehicle.outputs().all(|(_, out)| !out.grounded));
    let chassis = world.chassis(idx).unwrap();
    assert_eq!(chassis.user_force().norm(), 0.0);
    assert!(chassis.linvel().y < 0.0);
}

#[test]
fn throttle_then_brake() {
    let mut world = PhysicsWorld::new();
    let idx = world.spawn_vehicle(VehicleConfig::default(), [0.0, 0.8, 0.0]).unwrap();
    settle(&mut world, 60);

    world.vehicles[idx].set_input(1.0, 0.0, 0.0);
    settle(&mut world, 120);
    let chassis = world.chassis(idx).unwrap();
    assert!(chassis.translation().z > 1.0, "moved to {:?}", chassis.translation());
    assert!(chassis.linvel().z > 1.0);

    let rear = world.vehicles[idx].wheels.iter().find(|w| w.drive).unwrap();
    assert!(rear.collider.outputs().angular_velocity > 0.0);

    world.vehicles[idx].set_input(0.0, 0.0, 1.0);
    settle(&mut world, 240);
    let chassis = world.chassis(idx).unwrap();
    assert!(chassis.linvel().norm() < 0.5, "still rolling at {:?}", chassis.linvel());
}

/// Stand-alone rapier sets with one chassis body hovering over `ground`.
struct Rig {
    bodies: RigidBodySet,
    colliders: ColliderSet,
    query: QueryPipeline,
    chassis: RigidBodyHandle,
}

impl Rig {
    fn new(ground: RigidBodyBuilder, shape: ColliderBuilder, chassis_y: f32) -> (Self, RigidBodyHandle) {
        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        let ground = bodies.insert(ground);
        colliders.insert_with_parent(shape, ground, &mut bodies);

        let chassis = bodies.insert(RigidBodyBuilder::dynamic().translation(vector![0.0, chassis_y, 0.0]));
        colliders.insert_with_parent(ColliderBuilder::ball(0.1), chassis, &mut bodies);

        let mut query = QueryPipeline::new();
        query.update(&colliders);
        (Self { bodies, colliders, query, chassis }, ground)
    }

    fn tick(&mut self, wheel: &mut WheelCollider) -> wheel_sim::WheelOutputs {
        let mut host = RapierHost::new(&self.query, &mut self.bodies, &self.colliders);
        wheel.tick(&TickContext::new(DT), &mut host)
    }
}

fn wheel_on(rig: &Rig) -> WheelCollider {
    let config = WheelConfig { spring_rate: 20_000.0, ..Default::default() };
    let mut wheel = WheelCollider::new(config, WheelMount::default()).unwrap();
    wheel.attach(rig.chassis);
    wheel
}

#[test]
fn reaction_force_lands_on_dynamic_ground() {
    // dynamic platform, top face at y = 0
    let (mut rig, platform) = Rig::new(
        RigidBodyBuilder::dynamic().translation(vector![0.0, -0.5, 0.0]),
        ColliderBuilder::cuboid(2.0, 0.5, 2.0),
        0.5,
    );
    let mut wheel = wheel_on(&rig);
    let out = rig.tick(&mut wheel);

    assert!(out.grounded);
    let applied = vector![out.applied_force[0], out.applied_force[1], out.applied_force[2]];
    assert!(applied.y > 0.0);
    assert!((rig.bodies[rig.chassis].user_force() - applied).norm() < 1e-2);
    assert!((rig.bodies[platform].user_force() + applied).norm() < 1e-2);
}

#[test]
fn fixed_ground_gets_no_reaction() {
    let (mut rig, ground) = Rig::new(
        RigidBodyBuilder::fixed().translation(vector![0.0, -0.5, 0.0]),
        ColliderBuilder::cuboid(2.0, 0.5, 2.0),
        0.5,
    );
    let mut wheel = wheel_on(&rig);
    assert!(rig.tick(&mut wheel).grounded);
    assert_eq!(rig.bodies[ground].user_force().norm(), 0.0);
}

#[test]
fn braking_on_a_slope_pushes_uphill() {
    // slab climbing toward +Z
    let angle: f32 = 0.25;
    let rot = Rotation::from_axis_angle(&Vector::x_axis(), -angle);
    let (mut rig, _) = Rig::new(
        RigidBodyBuilder::fixed().rotation(rot.scaled_axis()).translation(vector![0.0, -0.5, 0.0]),
        ColliderBuilder::cuboid(4.0, 0.5, 4.0),
        0.5,
    );

    let mut coasting = wheel_on(&rig);
    let free = rig.tick(&mut coasting);
    assert!(free.grounded);
    assert!(free.contact_normal[2] < -0.1, "normal {:?}", free.contact_normal);

    let mut braking = wheel_on(&rig);
    braking.set_brake_torque(500.0);
    let held = rig.tick(&mut braking);
    assert!(held.applied_force[2] > free.applied_force[2]);
}

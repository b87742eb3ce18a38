use serde::Serialize;

use crate::physics::PhysicsWorld;
use crate::tire::{FrictionCurve, WheelOutputs, p3, v3};
use crate::vehicle::{Vehicle, WheelId};
use crate::wheel::{TickHooks, WheelCollider};

#[derive(Debug, Clone, Serialize)]
pub struct WheelTelemetry {
    pub id: WheelId,
    #[serde(flatten)]
    pub outputs: WheelOutputs,
    pub grip_long: f32, // authoring curve multiplier at the current slip
    pub grip_lat: f32,
}

impl WheelTelemetry {
    fn capture(id: WheelId, wheel: &WheelCollider) -> Self {
        let outputs = wheel.outputs();
        Self {
            id,
            grip_long: wheel.forward_profile().evaluate(outputs.slip_long),
            grip_lat: wheel.side_profile().evaluate(outputs.slip_lat),
            outputs,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VehicleSnapshot {
    pub index: usize,
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    pub speed: f32,
    pub throttle: f32,
    pub brake: f32,
    pub steer_angle: f32,
    pub sprung_mass: f32, // per wheel
    pub wheels: Vec<WheelTelemetry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub time: f32,
    pub vehicles: Vec<VehicleSnapshot>,
}

impl Snapshot {
    /// Build a snapshot of every vehicle whose body still exists.
    pub fn capture(world: &PhysicsWorld, tick: u64, time: f32) -> Self {
        let vehicles = world
            .vehicles
            .iter()
            .enumerate()
            .filter_map(|(index, v)| vehicle_snapshot(world, index, v))
            .collect();

        Self { tick, time, vehicles }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

fn vehicle_snapshot(world: &PhysicsWorld, index: usize, v: &Vehicle) -> Option<VehicleSnapshot> {
    let body = world.bodies.get(v.body)?;
    let linvel = *body.linvel();

    Some(VehicleSnapshot {
        index,
        position: p3(body.position().translation.vector.into()),
        velocity: v3(linvel),
        speed: linvel.norm(),
        throttle: v.throttle,
        brake: v.brake,
        steer_angle: v.steer_angle,
        sprung_mass: v.config.sprung_mass_per_wheel(),
        wheels: v
            .wheels
            .iter()
            .map(|w| WheelTelemetry::capture(w.id, &w.collider))
            .collect(),
    })
}

/// Tick hook collecting per-step contact statistics across all wheels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LoadMonitor {
    pub ticks: u64,
    pub grounded: u64,
    pub peak_spring_force: f32,
    pub peak_slip_long: f32,
    pub peak_slip_lat: f32,
}

impl LoadMonitor {
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

impl TickHooks for LoadMonitor {
    fn post_tick(&mut self, wheel: &WheelCollider) {
        let out = wheel.outputs();
        self.ticks += 1;
        if out.grounded {
            self.grounded += 1;
        }
        self.peak_spring_force = self.peak_spring_force.max(out.spring_force);
        self.peak_slip_long = self.peak_slip_long.max(out.slip_long);
        self.peak_slip_lat = self.peak_slip_lat.max(out.slip_lat);
    }
}

// ==============================================================================
// sim.rs — DEMO RUN CONFIGURATION + SCRIPTED DRIVER
// ------------------------------------------------------------------------------
// SimConfig is the JSON document the binary reads: step rate, run length,
// terrain, vehicle and a list of control phases. Every field has a default, so
// "{}" is a complete config.
// ==============================================================================

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::positive;
use crate::error::ConfigError;
use crate::physics::PhysicsWorld;
use crate::vehicle::VehicleConfig;

/// Controls held from the previous phase's end until `until` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPhase {
    pub until: f32,
    #[serde(default)]
    pub throttle: f32,
    #[serde(default)]
    pub brake: f32,
    #[serde(default)]
    pub steer: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub ramp: bool,
    pub ramp_start: f32,
    pub ramp_length: f32,
    pub ramp_height: f32,
    pub bumps: usize,
    pub bump_seed: u64,
    pub bump_extent: f32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            ramp: false,
            ramp_start: 30.0,
            ramp_length: 12.0,
            ramp_height: 1.0,
            bumps: 0,
            bump_seed: 42,
            bump_extent: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub hz: f32,
    pub duration: f32,        // seconds of simulated time
    pub realtime: bool,       // pace steps with a wall-clock ticker
    pub telemetry_every: u64, // steps between snapshots, 0 = never
    pub spawn: [f32; 3],
    pub terrain: TerrainConfig,
    pub vehicle: VehicleConfig,
    pub script: Vec<ControlPhase>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            hz: 60.0,
            duration: 12.0,
            realtime: true,
            telemetry_every: 30,
            spawn: [0.0, 0.8, 0.0],
            terrain: TerrainConfig::default(),
            vehicle: VehicleConfig::default(),
            script: vec![
                ControlPhase { until: 1.0, throttle: 0.0, brake: 0.0, steer: 0.0 },
                ControlPhase { until: 5.0, throttle: 0.6, brake: 0.0, steer: 0.0 },
                ControlPhase { until: 8.0, throttle: 0.4, brake: 0.0, steer: 0.5 },
                ControlPhase { until: 12.0, throttle: 0.0, brake: 0.8, steer: 0.0 },
            ],
        }
    }
}

impl SimConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: SimConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("hz", self.hz)?;
        positive("duration", self.duration)?;
        self.vehicle.validate()
    }

    #[inline]
    pub fn dt(&self) -> f32 {
        1.0 / self.hz
    }

    pub fn total_steps(&self) -> u64 {
        (self.duration * self.hz).ceil() as u64
    }

    /// (throttle, steer, brake) at simulated time `t`. Past the last phase
    /// everything is released.
    pub fn controls_at(&self, t: f32) -> (f32, f32, f32) {
        self.script
            .iter()
            .find(|phase| t < phase.until)
            .map(|p| (p.throttle, p.steer, p.brake))
            .unwrap_or((0.0, 0.0, 0.0))
    }

    /// Ground, optional terrain and one vehicle. Returns the vehicle index.
    pub fn build_world(&self) -> Result<(PhysicsWorld, usize), ConfigError> {
        let mut world = PhysicsWorld::new();
        let t = &self.terrain;
        if t.ramp {
            world.add_ramp(t.ramp_start, t.ramp_length, t.ramp_height, 6.0);
        }
        if t.bumps > 0 {
            world.add_bumps(t.bumps, t.bump_seed, t.bump_extent);
        }
        let vehicle = world.spawn_vehicle(self.vehicle.clone(), self.spawn)?;
        Ok((world, vehicle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn empty_document_is_default() {
        let cfg: SimConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, SimConfig::default());
        assert!(cfg.validate().is_ok());
    }

    #[test_case(0.5, (0.0, 0.0, 0.0); "settling")]
    #[test_case(2.0, (0.6, 0.0, 0.0); "accelerating")]
    #[test_case(6.0, (0.4, 0.5, 0.0); "cornering")]
    #[test_case(10.0, (0.0, 0.0, 0.8); "braking")]
    #[test_case(99.0, (0.0, 0.0, 0.0); "after script")]
    fn default_script(t: f32, expected: (f32, f32, f32)) {
        assert_eq!(SimConfig::default().controls_at(t), expected);
    }

    #[test]
    fn steps_cover_duration() {
        let cfg = SimConfig { hz: 60.0, duration: 2.0, ..Default::default() };
        assert_eq!(cfg.total_steps(), 120);
        assert!((cfg.dt() - 1.0 / 60.0).abs() < 1e-7);
    }

    #[test]
    fn rejects_zero_rate() {
        let cfg = SimConfig { hz: 0.0, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(ConfigError::NotPositive { field: "hz", .. })));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SimConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn build_world_with_terrain() {
        let cfg = SimConfig {
            terrain: TerrainConfig { ramp: true, bumps: 5, ..Default::default() },
            ..Default::default()
        };
        let (world, idx) = cfg.build_world().unwrap();
        assert_eq!(idx, 0);
        // ground + ramp + bumps + chassis
        assert_eq!(world.colliders.len(), 1 + 1 + 5 + 1);
    }
}

use anyhow::Context;
use log::{info, warn};
use tokio::time::{Duration, MissedTickBehavior, interval};

use wheel_sim::logging;
use wheel_sim::sim::SimConfig;
use wheel_sim::telemetry::{LoadMonitor, Snapshot};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if logging::try_init().is_err() {
        eprintln!("logger already installed");
    }

    let config = match std::env::args().nth(1) {
        Some(path) => SimConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => {
            info!("no config given, using built-in defaults");
            SimConfig::default()
        }
    };

    let (mut world, vehicle) = config.build_world().context("building world")?;
    let dt = config.dt();
    let steps = config.total_steps();
    info!("running {steps} steps at {:.0} Hz (realtime: {})", config.hz, config.realtime);

    // Fixed timestep, optionally paced by the wall clock
    let mut ticker = interval(Duration::from_secs_f32(dt));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut monitor = LoadMonitor::default();

    for tick in 1..=steps {
        if config.realtime {
            ticker.tick().await;
        }

        let t = (tick - 1) as f32 * dt;
        let (throttle, steer, brake) = config.controls_at(t);
        if let Some(v) = world.vehicles.get_mut(vehicle) {
            v.set_input(throttle, steer, brake);
        }

        world.step_with_hooks(dt, &mut monitor);

        if config.telemetry_every > 0 && tick % config.telemetry_every == 0 {
            let stats = monitor.take();
            info!("{}", serde_json::to_string(&stats)?);
            info!("{}", Snapshot::capture(&world, tick, tick as f32 * dt).to_json()?);
        }
    }

    match world.chassis(vehicle) {
        Some(body) => info!(
            "done: chassis at {:?}, {:.2} m/s",
            body.translation(),
            body.linvel().norm()
        ),
        None => warn!("done: chassis body is gone"),
    }
    Ok(())
}

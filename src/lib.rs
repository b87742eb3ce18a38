//! Raycast / shape-cast wheel colliders for rapier3d vehicles: ground contact,
//! spring-damper suspension and slip-curve tire friction.

pub mod config;
pub mod error;
pub mod logging;
pub mod physics;
pub mod sim;
pub mod suspension;
pub mod suspension_contact;
pub mod telemetry;
pub mod tire;
pub mod vehicle;
pub mod wheel;

pub use config::{CurveShape, FrictionModel, SweepMode, WheelConfig};
pub use error::ConfigError;
pub use physics::{PhysicsWorld, RapierHost};
pub use suspension_contact::{ProbeFilter, SurfaceHit, SurfaceQuery};
pub use tire::{TickContext, WheelInputs, WheelOutputs};
pub use wheel::{BodyAccess, TickHooks, WheelCollider, WheelHost, WheelMount};

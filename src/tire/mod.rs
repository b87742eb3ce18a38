//! tire - engine-agnostic wheel solver math (curves, slip, spin state, friction)

pub mod curve;
pub mod friction;
pub mod slip;
pub mod state;
pub mod types;

pub use curve::{FrictionCurve, HermiteFrictionCurve, TabulatedCurve};
pub use friction::{FrictionInput, FrictionOutput, FrictionSolver, StandardFriction, solver_for};
pub use state::WheelState;
pub use types::*;

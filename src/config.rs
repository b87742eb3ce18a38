// ==============================================================================
// config.rs — PER-WHEEL CONFIGURATION
// ------------------------------------------------------------------------------
// WheelConfig is the immutable-per-tick parameter set of one wheel. It is set
// when the wheel is attached and may be changed between ticks by a controller.
// Mass and radius are NOT edited through this struct at runtime: they feed the
// cached inertia in WheelState, so go through WheelCollider::set_mass /
// set_radius which recompute both atomically.
// ==============================================================================

use rapier3d::prelude::Real;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How the ground is probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepMode {
    #[default]
    Ray,
    Sphere,
    Capsule,
}

/// Tire friction model selector.
///
/// Only `Standard` has its own implementation. `Pacejka` and `PhysX` are
/// accepted for configuration compatibility and currently fall back to the
/// standard model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrictionModel {
    #[default]
    Standard,
    Pacejka,
    #[serde(rename = "physx")]
    PhysX,
}

/// Five-parameter friction curve shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveShape {
    pub extremum_slip: Real,
    pub extremum_value: Real,
    pub asymptote_slip: Real,
    pub asymptote_value: Real,
    pub stiffness: Real,
}

impl Default for CurveShape {
    fn default() -> Self {
        Self {
            extremum_slip: 0.06,
            extremum_value: 1.2,
            asymptote_slip: 0.065,
            asymptote_value: 1.25,
            stiffness: 0.7,
        }
    }
}

impl CurveShape {
    fn validate(&self, curve: &'static str) -> Result<(), ConfigError> {
        non_negative("extremum_slip", self.extremum_slip)?;
        non_negative("extremum_value", self.extremum_value)?;
        non_negative("asymptote_value", self.asymptote_value)?;
        non_negative("stiffness", self.stiffness)?;
        if !(self.asymptote_slip >= self.extremum_slip) {
            return Err(ConfigError::CurveOrder {
                curve,
                extremum: self.extremum_slip,
                asymptote: self.asymptote_slip,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelConfig {
    // --- Geometry ---
    pub radius: Real,               // m
    pub width: Real,                // m (capsule sweep only)
    pub mass: Real,                 // kg

    // --- Suspension ---
    pub rest_length: Real,          // m, fully extended travel
    pub spring_rate: Real,          // N/m
    pub damper_rate: Real,          // N*s/m
    pub spring_progression: Real,   // N/m^2, extra k2 * x^2 term
    pub force_application_offset: Real, // 0 = hit point, 1 = wheel origin

    // --- Friction ---
    pub forward_friction_coefficient: Real,
    pub side_friction_coefficient: Real,
    pub surface_friction_coefficient: Real,
    pub rolling_resistance: Real,
    pub rotational_resistance: Real,
    pub forward_curve: CurveShape,
    pub side_curve: CurveShape,
    pub friction_model: FrictionModel,

    // --- Contact ---
    pub sweep_mode: SweepMode,
    pub raycast_mask: u32,          // collision group bits the probe may hit

    // --- Force assembly ---
    pub use_suspension_normal: bool, // push along wheel-up instead of contact normal
    pub slope_compensation: bool,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            radius: 0.35,
            width: 0.25,
            mass: 20.0,

            rest_length: 0.3,
            spring_rate: 35_000.0,
            damper_rate: 3_000.0,
            spring_progression: 0.0,
            force_application_offset: 0.0,

            forward_friction_coefficient: 1.0,
            side_friction_coefficient: 1.0,
            surface_friction_coefficient: 1.0,
            rolling_resistance: 0.005,
            rotational_resistance: 0.0,
            forward_curve: CurveShape::default(),
            side_curve: CurveShape::default(),
            friction_model: FrictionModel::Standard,

            sweep_mode: SweepMode::Ray,
            raycast_mask: u32::MAX,

            use_suspension_normal: false,
            slope_compensation: true,
        }
    }
}

impl WheelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("radius", self.radius)?;
        positive("mass", self.mass)?;
        positive("rest_length", self.rest_length)?;
        if self.sweep_mode == SweepMode::Capsule {
            positive("width", self.width)?;
        }

        non_negative("spring_rate", self.spring_rate)?;
        non_negative("damper_rate", self.damper_rate)?;
        non_negative("spring_progression", self.spring_progression)?;
        non_negative("forward_friction_coefficient", self.forward_friction_coefficient)?;
        non_negative("side_friction_coefficient", self.side_friction_coefficient)?;
        non_negative("surface_friction_coefficient", self.surface_friction_coefficient)?;
        non_negative("rolling_resistance", self.rolling_resistance)?;
        non_negative("rotational_resistance", self.rotational_resistance)?;

        let offset = self.force_application_offset;
        if !(0.0..=1.0).contains(&offset) {
            return Err(ConfigError::OutOfRange {
                field: "force_application_offset",
                value: offset,
                min: 0.0,
                max: 1.0,
            });
        }

        self.forward_curve.validate("forward")?;
        self.side_curve.validate("side")?;
        Ok(())
    }

    /// Length of a full-extension probe from the wheel origin.
    #[inline]
    pub fn probe_length(&self) -> Real {
        self.rest_length + self.radius
    }
}

pub(crate) fn positive(field: &'static str, value: Real) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: Real) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(WheelConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_radius() {
        let cfg = WheelConfig { radius: 0.0, ..Default::default() };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NotPositive { field: "radius", .. })
        ));
    }

    #[test]
    fn rejects_offset_outside_unit_range() {
        let cfg = WheelConfig { force_application_offset: 1.5, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(ConfigError::OutOfRange { .. })));
    }

    #[test]
    fn width_only_matters_for_capsules() {
        let ray = WheelConfig { width: 0.0, ..Default::default() };
        assert!(ray.validate().is_ok());

        let capsule = WheelConfig { sweep_mode: SweepMode::Capsule, ..ray };
        assert!(capsule.validate().is_err());
    }

    #[test]
    fn rejects_inverted_curve() {
        let mut cfg = WheelConfig::default();
        cfg.side_curve.asymptote_slip = 0.01;
        assert!(matches!(cfg.validate(), Err(ConfigError::CurveOrder { curve: "side", .. })));
    }

    #[test]
    fn parses_partial_json() {
        let cfg: WheelConfig = serde_json::from_str(
            r#"{ "radius": 0.5, "sweep_mode": "capsule", "friction_model": "physx" }"#,
        )
        .unwrap();
        assert_eq!(cfg.radius, 0.5);
        assert_eq!(cfg.sweep_mode, SweepMode::Capsule);
        assert_eq!(cfg.friction_model, FrictionModel::PhysX);
        assert_eq!(cfg.spring_rate, WheelConfig::default().spring_rate);
    }
}

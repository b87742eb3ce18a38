use rapier3d::prelude::Real;

use crate::config::positive;
use crate::error::ConfigError;

/// Wheel state that persists across ticks.
///
/// Inertia and the cached inverses are private and only change through
/// `set_mass_radius`, so they always agree with the current mass and radius.
#[derive(Debug, Clone, PartialEq)]
pub struct WheelState {
    pub angular_velocity: Real, // rad/s, positive rolls forward
    pub prev_long_force: Real,
    pub prev_lat_force: Real,
    pub prev_compression: Real,
    pub grounded: bool,

    mass: Real,
    radius: Real,
    inertia: Real,
    inertia_inv: Real,
    radius_inv: Real,
    mass_inv: Real,
}

impl WheelState {
    pub fn new(mass: Real, radius: Real) -> Result<Self, ConfigError> {
        let mut state = Self {
            angular_velocity: 0.0,
            prev_long_force: 0.0,
            prev_lat_force: 0.0,
            prev_compression: 0.0,
            grounded: false,
            mass: 1.0,
            radius: 1.0,
            inertia: 0.5,
            inertia_inv: 2.0,
            radius_inv: 1.0,
            mass_inv: 1.0,
        };
        state.set_mass_radius(mass, radius)?;
        Ok(state)
    }

    /// Solid-cylinder inertia `0.5 * m * r^2`. Rejects non-positive inputs and
    /// leaves the state untouched in that case.
    pub fn set_mass_radius(&mut self, mass: Real, radius: Real) -> Result<(), ConfigError> {
        positive("mass", mass)?;
        positive("radius", radius)?;

        let inertia = 0.5 * mass * radius * radius;
        self.mass = mass;
        self.radius = radius;
        self.inertia = inertia;
        self.inertia_inv = 1.0 / inertia;
        self.radius_inv = 1.0 / radius;
        self.mass_inv = 1.0 / mass;
        Ok(())
    }

    /// Zero all dynamic state, keep mass/radius.
    pub fn reset(&mut self) {
        self.angular_velocity = 0.0;
        self.prev_long_force = 0.0;
        self.prev_lat_force = 0.0;
        self.prev_compression = 0.0;
        self.grounded = false;
    }

    #[inline] pub fn mass(&self) -> Real { self.mass }
    #[inline] pub fn radius(&self) -> Real { self.radius }
    #[inline] pub fn inertia(&self) -> Real { self.inertia }
    #[inline] pub fn inertia_inv(&self) -> Real { self.inertia_inv }
    #[inline] pub fn radius_inv(&self) -> Real { self.radius_inv }
    #[inline] pub fn mass_inv(&self) -> Real { self.mass_inv }

    /// Angular velocity in revolutions per minute.
    #[inline]
    pub fn rpm(&self) -> Real {
        self.angular_velocity * 60.0 / std::f32::consts::TAU
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inertia_is_solid_cylinder() {
        let s = WheelState::new(20.0, 0.5).unwrap();
        assert!((s.inertia() - 2.5).abs() < 1e-6);
        assert!((s.inertia_inv() - 0.4).abs() < 1e-6);
        assert!((s.radius_inv() - 2.0).abs() < 1e-6);
        assert!((s.mass_inv() - 0.05).abs() < 1e-6);
    }

    #[test]
    fn rejected_setter_keeps_cache() {
        let mut s = WheelState::new(20.0, 0.5).unwrap();
        let before = s.clone();
        assert!(s.set_mass_radius(0.0, 0.5).is_err());
        assert!(s.set_mass_radius(20.0, -1.0).is_err());
        assert!(s.set_mass_radius(Real::NAN, 0.5).is_err());
        assert_eq!(s, before);
    }

    #[test]
    fn setter_recomputes_everything() {
        let mut s = WheelState::new(20.0, 0.5).unwrap();
        s.set_mass_radius(10.0, 1.0).unwrap();
        assert!((s.inertia() - 5.0).abs() < 1e-6);
        assert!((s.inertia() * s.inertia_inv() - 1.0).abs() < 1e-6);
        assert!((s.radius() * s.radius_inv() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rpm_conversion() {
        let mut s = WheelState::new(1.0, 1.0).unwrap();
        s.angular_velocity = std::f32::consts::TAU;
        assert!((s.rpm() - 60.0).abs() < 1e-4);
    }
}

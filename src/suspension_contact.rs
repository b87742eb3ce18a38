// ==============================================================================
// suspension_contact.rs — GROUND PROBES + CONTACT PATCH KINEMATICS
// ------------------------------------------------------------------------------
// This module finds the ground under a wheel and measures the contact:
// - detect_contact(...)
//     Probes from the wheel origin down the suspension axis with a ray, a
//     sphere of the wheel radius, or two axle-aligned capsules, or takes an
//     externally supplied contact. Produces hit point, normal, collider and
//     compression = rest_length + radius - distance.
// - build_contact_patch(...)
//     Projects the wheel forward onto the contact plane, builds
//     right = normal x forward, expresses the relative contact velocity in
//     (lateral, normal, longitudinal) and places the force application point.
//
// Notes:
// - This file does NOT apply forces. It only measures/constructs contact data.
// - Probing goes through SurfaceQuery so the math runs against any backend;
//   physics::RapierHost is the rapier implementation.
// ==============================================================================

use rapier3d::prelude::{ColliderHandle, Point, Real, RigidBodyHandle, Vector};

use crate::config::{SweepMode, WheelConfig};
use crate::tire::{ContactPatch, ExternalContact};

/// One hit reported by a surface probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub point: Point<Real>,
    pub normal: Vector<Real>,
    pub distance: Real, // along the cast direction
    pub collider: Option<ColliderHandle>,
}

/// Which colliders a probe may hit.
#[derive(Debug, Clone, Copy)]
pub struct ProbeFilter {
    pub mask: u32,
    pub exclude_body: Option<RigidBodyHandle>,
}

/// Scene queries a wheel needs. `dir` is unit length; hits beyond
/// `max_distance` are not reported.
pub trait SurfaceQuery {
    fn cast_ray(
        &self,
        origin: Point<Real>,
        dir: Vector<Real>,
        max_distance: Real,
        filter: ProbeFilter,
    ) -> Option<SurfaceHit>;

    fn cast_sphere(
        &self,
        center: Point<Real>,
        radius: Real,
        dir: Vector<Real>,
        max_distance: Real,
        filter: ProbeFilter,
    ) -> Option<SurfaceHit>;

    /// Capsule with segment `a`..`b`.
    fn cast_capsule(
        &self,
        a: Point<Real>,
        b: Point<Real>,
        radius: Real,
        dir: Vector<Real>,
        max_distance: Real,
        filter: ProbeFilter,
    ) -> Option<SurfaceHit>;
}

/// World-space wheel frame for one tick. `forward` already includes steering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelFrame {
    pub origin: Point<Real>, // top of the suspension travel
    pub up: Vector<Real>,
    pub forward: Vector<Real>,
    pub right: Vector<Real>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactHit {
    pub point: Point<Real>,
    pub normal: Vector<Real>,
    pub collider: Option<ColliderHandle>,
    pub compression: Real,
}

pub fn detect_contact<Q: SurfaceQuery + ?Sized>(
    query: &Q,
    frame: &WheelFrame,
    cfg: &WheelConfig,
    filter: ProbeFilter,
    external: Option<&ExternalContact>,
) -> Option<ContactHit> {
    let probe = cfg.probe_length();

    if let Some(ext) = external {
        let distance = (ext.point - frame.origin).norm();
        return Some(ContactHit {
            point: ext.point,
            normal: safe_normalize(ext.normal, frame.up),
            collider: ext.collider,
            compression: probe - distance,
        });
    }

    let down = -frame.up;
    let hit = match cfg.sweep_mode {
        SweepMode::Ray => query.cast_ray(frame.origin, down, probe, filter),
        SweepMode::Sphere => {
            let center = frame.origin + frame.up * cfg.radius;
            query.cast_sphere(center, cfg.radius, down, probe, filter)
        }
        SweepMode::Capsule => capsule_probe(query, frame, cfg, filter),
    }?;

    Some(ContactHit {
        point: hit.point,
        normal: safe_normalize(hit.normal, frame.up),
        collider: hit.collider,
        compression: probe - hit.distance,
    })
}

// Two capsules across the axle, one ahead of and one behind the hub, so the
// pair approximates the tire profile. The nearer hit wins, ties go to the front.
fn capsule_probe<Q: SurfaceQuery + ?Sized>(
    query: &Q,
    frame: &WheelFrame,
    cfg: &WheelConfig,
    filter: ProbeFilter,
) -> Option<SurfaceHit> {
    let half_width = cfg.width * 0.5;
    let cap_radius = half_width.min(cfg.radius);
    let half_segment = (half_width - cap_radius).max(0.0);
    let inset = cfg.radius - cap_radius;
    let max_distance = cfg.probe_length() + inset;
    let down = -frame.up;

    let cast = |sign: Real| {
        let center = frame.origin + frame.up * cfg.radius + frame.forward * (sign * inset);
        let a = center - frame.right * half_segment;
        let b = center + frame.right * half_segment;
        query
            .cast_capsule(a, b, cap_radius, down, max_distance, filter)
            .map(|hit| SurfaceHit { distance: hit.distance - inset, ..hit })
    };

    match (cast(1.0), cast(-1.0)) {
        (Some(front), Some(rear)) => Some(if rear.distance < front.distance { rear } else { front }),
        (front, rear) => front.or(rear),
    }
}

/// Build the per-tick patch. `relative_velocity` is the chassis point velocity
/// at the hit minus the velocity of whatever it touches there.
pub fn build_contact_patch(
    frame: &WheelFrame,
    hit: &ContactHit,
    cfg: &WheelConfig,
    relative_velocity: Vector<Real>,
) -> ContactPatch {
    let n = hit.normal;

    let projected = frame.forward - n * frame.forward.dot(&n);
    // wheel pointing into the surface: rebuild forward from the axle instead
    let forward = safe_normalize(projected, frame.right.cross(&n));
    let right = n.cross(&forward);

    let local_velocity = Vector::new(
        relative_velocity.dot(&right),
        relative_velocity.dot(&n),
        relative_velocity.dot(&forward),
    );

    let rise = (frame.origin - hit.point).dot(&frame.up);
    let force_point = hit.point + frame.up * (rise * cfg.force_application_offset);

    let compression_fraction = if cfg.rest_length > 0.0 {
        (hit.compression / cfg.rest_length).clamp(0.0, 1.0)
    } else {
        0.0
    };

    ContactPatch {
        collider: hit.collider,
        hit_point: hit.point,
        force_point,
        normal: n,
        forward,
        right,
        local_velocity,
        compression: hit.compression,
        compression_fraction,
        ..ContactPatch::default()
    }
}

#[inline]
fn safe_normalize(v: Vector<Real>, fallback: Vector<Real>) -> Vector<Real> {
    let n = v.norm();
    if n > 1e-6 { v / n } else { fallback }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use test_case::test_case;

    /// Infinite horizontal plane at `height`, hits anything going down.
    struct Plane {
        height: Real,
        capsule_casts: RefCell<Vec<(Point<Real>, Point<Real>, Real)>>,
    }

    impl Plane {
        fn new(height: Real) -> Self {
            Self { height, capsule_casts: RefCell::new(Vec::new()) }
        }

        fn hit(&self, lowest: Point<Real>, dir: Vector<Real>, max: Real) -> Option<SurfaceHit> {
            if dir.y >= 0.0 {
                return None;
            }
            let distance = (lowest.y - self.height) / -dir.y;
            (0.0..=max).contains(&distance).then(|| SurfaceHit {
                point: lowest + dir * distance,
                normal: Vector::y(),
                distance,
                collider: None,
            })
        }
    }

    impl SurfaceQuery for Plane {
        fn cast_ray(&self, origin: Point<Real>, dir: Vector<Real>, max: Real, _: ProbeFilter) -> Option<SurfaceHit> {
            self.hit(origin, dir, max)
        }

        fn cast_sphere(&self, c: Point<Real>, r: Real, dir: Vector<Real>, max: Real, _: ProbeFilter) -> Option<SurfaceHit> {
            self.hit(c - Vector::y() * r, dir, max)
        }

        fn cast_capsule(&self, a: Point<Real>, b: Point<Real>, r: Real, dir: Vector<Real>, max: Real, _: ProbeFilter) -> Option<SurfaceHit> {
            self.capsule_casts.borrow_mut().push((a, b, r));
            let low = if a.y < b.y { a } else { b };
            self.hit(low - Vector::y() * r, dir, max)
        }
    }

    fn frame_at(height: Real) -> WheelFrame {
        WheelFrame {
            origin: Point::new(0.0, height, 0.0),
            up: Vector::y(),
            forward: Vector::z(),
            right: Vector::x(),
        }
    }

    fn filter() -> ProbeFilter {
        ProbeFilter { mask: u32::MAX, exclude_body: None }
    }

    fn cfg(mode: SweepMode) -> WheelConfig {
        WheelConfig { radius: 0.5, rest_length: 0.5, width: 0.4, sweep_mode: mode, ..Default::default() }
    }

    #[test]
    fn ray_compression_from_distance() {
        // origin 0.8 above ground, probe length 1.0
        let hit = detect_contact(&Plane::new(0.0), &frame_at(0.8), &cfg(SweepMode::Ray), filter(), None).unwrap();
        assert!((hit.compression - 0.2).abs() < 1e-5);
        assert!((hit.point.y).abs() < 1e-5);
    }

    #[test]
    fn out_of_reach_is_airborne() {
        let hit = detect_contact(&Plane::new(0.0), &frame_at(1.2), &cfg(SweepMode::Ray), filter(), None);
        assert!(hit.is_none());
    }

    #[test]
    fn sphere_matches_ray_on_flat_ground() {
        let plane = Plane::new(0.0);
        let ray = detect_contact(&plane, &frame_at(0.8), &cfg(SweepMode::Ray), filter(), None).unwrap();
        let sphere = detect_contact(&plane, &frame_at(0.8), &cfg(SweepMode::Sphere), filter(), None).unwrap();
        assert!((ray.compression - sphere.compression).abs() < 1e-5);
    }

    #[test]
    fn capsule_matches_ray_on_flat_ground() {
        let plane = Plane::new(0.0);
        let hit = detect_contact(&plane, &frame_at(0.8), &cfg(SweepMode::Capsule), filter(), None).unwrap();
        assert!((hit.compression - 0.2).abs() < 1e-5);

        let casts = plane.capsule_casts.borrow();
        assert_eq!(casts.len(), 2);
        for (a, b, r) in casts.iter() {
            assert!((r - 0.2).abs() < 1e-6);
            // caps alone already span the width
            assert!((b - a).norm() < 1e-6);
        }
        // one ahead of the hub, one behind
        assert!(casts[0].0.z > 0.0 && casts[1].0.z < 0.0);
    }

    #[test]
    fn wide_capsule_stays_within_tire_width() {
        let plane = Plane::new(0.0);
        let wide = WheelConfig { radius: 0.3, width: 1.0, ..cfg(SweepMode::Capsule) };
        assert!(detect_contact(&plane, &frame_at(0.6), &wide, filter(), None).is_some());

        for (a, b, r) in plane.capsule_casts.borrow().iter() {
            let across = (b - a).norm() + 2.0 * r;
            assert!((across - 1.0).abs() < 1e-5, "capsule spans {across}");
        }
    }

    /// Ground at one height ahead of the hub and another behind it.
    struct Step {
        front: Real,
        rear: Real,
    }

    impl SurfaceQuery for Step {
        fn cast_ray(&self, _: Point<Real>, _: Vector<Real>, _: Real, _: ProbeFilter) -> Option<SurfaceHit> {
            None
        }

        fn cast_sphere(&self, _: Point<Real>, _: Real, _: Vector<Real>, _: Real, _: ProbeFilter) -> Option<SurfaceHit> {
            None
        }

        fn cast_capsule(&self, a: Point<Real>, _: Point<Real>, r: Real, dir: Vector<Real>, max: Real, _: ProbeFilter) -> Option<SurfaceHit> {
            let ground = if a.z > 0.0 { self.front } else { self.rear };
            let lowest = a - Vector::y() * r;
            let distance = lowest.y - ground;
            (0.0..=max).contains(&distance).then(|| SurfaceHit {
                point: lowest + dir * distance,
                normal: Vector::y(),
                distance,
                collider: None,
            })
        }
    }

    #[test_case(0.0, 0.2, 0.4, -0.3; "rear is nearer")]
    #[test_case(0.2, 0.0, 0.4, 0.3; "front is nearer")]
    #[test_case(0.1, 0.1, 0.3, 0.3; "tie goes to the front")]
    fn capsule_takes_nearer_hit(front: Real, rear: Real, compression: Real, hit_z: Real) {
        let step = Step { front, rear };
        let hit = detect_contact(&step, &frame_at(0.8), &cfg(SweepMode::Capsule), filter(), None).unwrap();
        assert!((hit.compression - compression).abs() < 1e-5, "compression {}", hit.compression);
        assert!((hit.point.z - hit_z).abs() < 1e-5, "hit at {:?}", hit.point);
    }

    #[test]
    fn external_contact_bypasses_probe() {
        let ext = ExternalContact {
            point: Point::new(0.0, -0.5, 0.0),
            normal: Vector::new(0.0, 2.0, 0.0),
            collider: None,
        };
        // plane far below would miss; the external contact still counts
        let hit = detect_contact(&Plane::new(-100.0), &frame_at(0.0), &cfg(SweepMode::Ray), filter(), Some(&ext))
            .unwrap();
        assert!((hit.compression - 0.5).abs() < 1e-5);
        assert!((hit.normal.norm() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn patch_basis_follows_slope() {
        let n = Vector::new(0.0, 1.0, -1.0).normalize();
        let hit = ContactHit { point: Point::origin(), normal: n, collider: None, compression: 0.1 };
        let patch = build_contact_patch(&frame_at(0.9), &hit, &cfg(SweepMode::Ray), Vector::zeros());
        assert!(patch.forward.dot(&n).abs() < 1e-5);
        assert!((patch.forward.norm() - 1.0).abs() < 1e-5);
        assert!(patch.forward.z > 0.0);
        assert!((patch.right - Vector::x()).norm() < 1e-5);
    }

    #[test]
    fn patch_velocity_is_lateral_normal_longitudinal() {
        let hit = ContactHit { point: Point::origin(), normal: Vector::y(), collider: None, compression: 0.1 };
        let patch = build_contact_patch(&frame_at(0.9), &hit, &cfg(SweepMode::Ray), Vector::new(1.0, 2.0, 3.0));
        assert!((patch.local_velocity - Vector::new(1.0, 2.0, 3.0)).norm() < 1e-5);
    }

    #[test]
    fn degenerate_forward_falls_back_to_axle() {
        // wheel forward straight into a wall
        let hit = ContactHit { point: Point::origin(), normal: -Vector::z(), collider: None, compression: 0.1 };
        let patch = build_contact_patch(&frame_at(0.9), &hit, &cfg(SweepMode::Ray), Vector::zeros());
        assert!((patch.forward.norm() - 1.0).abs() < 1e-5);
        assert!(patch.forward.dot(&patch.normal).abs() < 1e-5);
        assert!(patch.right.dot(&patch.forward).abs() < 1e-5);
    }

    #[test]
    fn force_point_offset_and_fraction() {
        let hit = ContactHit { point: Point::origin(), normal: Vector::y(), collider: None, compression: 0.8 };
        let c = WheelConfig { force_application_offset: 0.5, ..cfg(SweepMode::Ray) };
        let patch = build_contact_patch(&frame_at(0.9), &hit, &c, Vector::zeros());
        assert!((patch.force_point.y - 0.45).abs() < 1e-5);
        assert_eq!(patch.compression_fraction, 1.0);
    }
}

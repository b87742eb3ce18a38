// ==============================================================================
// curve.rs — SLIP → FORCE-MULTIPLIER CURVES
// ------------------------------------------------------------------------------
// Two evaluators sharing one contract (`FrictionCurve`):
//
// HermiteFrictionCurve
//   Five shape parameters (extremum slip/value, asymptote slip/value,
//   stiffness). Two cubic Hermite segments are pre-sampled into fixed tables:
//     A: (0,0)            -> (ext_slip, ext_value)
//     B: (ext_slip, ext)  -> (asym_slip, asym_value)
//   evaluate() binary-searches the table on x and lerps y, times stiffness.
//   Past the asymptote slip it returns asym_value * stiffness directly.
//
// TabulatedCurve
//   Plain piecewise-linear keys over slip in [0,1] with a cached peak. This is
//   what the per-tick solver reads; `max()` feeds the friction-circle cap.
//   Built from a CurveShape's landmarks, or from explicit keys.
//
// Note: the Hermite x-coordinates are interpolated too, with tangents whose x
// component is far larger than the segment span, so the tables are not
// monotonic in slip. Lookups stay bounded (the lerp factor is clamped) but
// small slips read close to the extremum value; the tabulated form does not
// have this artifact.
// ==============================================================================

use rapier3d::prelude::Real;

use crate::config::CurveShape;

/// Samples per Hermite segment.
pub const HERMITE_TABLE_SIZE: usize = 50;

/// Evaluates a slip ratio into a force multiplier.
pub trait FrictionCurve {
    /// Force multiplier for `slip`; the sign of `slip` is ignored.
    fn evaluate(&self, slip: Real) -> Real;

    /// Largest value the curve can return.
    fn max(&self) -> Real;
}

/// Cubic Hermite basis.
#[inline]
pub fn hermite(t: Real, p0: Real, p1: Real, m0: Real, m1: Real) -> Real {
    let t2 = t * t;
    let t3 = t2 * t;
    (2.0 * t3 - 3.0 * t2 + 1.0) * p0
        + (t3 - 2.0 * t2 + t) * m0
        + (-2.0 * t3 + 3.0 * t2) * p1
        + (t3 - t2) * m1
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Sample {
    slip: Real,
    force: Real,
}

#[derive(Clone, Debug)]
pub struct HermiteFrictionCurve {
    shape: CurveShape,
    rise: [Sample; HERMITE_TABLE_SIZE],
    fall: [Sample; HERMITE_TABLE_SIZE],
}

impl Default for HermiteFrictionCurve {
    fn default() -> Self {
        Self::new(CurveShape::default())
    }
}

impl HermiteFrictionCurve {
    pub fn new(shape: CurveShape) -> Self {
        let mut curve = Self {
            shape,
            rise: [Sample::default(); HERMITE_TABLE_SIZE],
            fall: [Sample::default(); HERMITE_TABLE_SIZE],
        };
        curve.rebuild();
        curve
    }

    pub fn shape(&self) -> CurveShape {
        self.shape
    }

    /// Replace all five shape parameters and rebuild both tables.
    pub fn configure(
        &mut self,
        extremum_slip: Real,
        extremum_value: Real,
        asymptote_slip: Real,
        asymptote_value: Real,
        stiffness: Real,
    ) {
        self.set_shape(CurveShape {
            extremum_slip,
            extremum_value,
            asymptote_slip,
            asymptote_value,
            stiffness,
        });
    }

    pub fn set_shape(&mut self, shape: CurveShape) {
        if shape != self.shape {
            self.shape = shape;
            self.rebuild();
        }
    }

    pub fn set_stiffness(&mut self, stiffness: Real) {
        // stiffness scales the output only, tables stay valid
        self.shape.stiffness = stiffness;
    }

    fn rebuild(&mut self) {
        let CurveShape {
            extremum_slip: es,
            extremum_value: ev,
            asymptote_slip: as_,
            asymptote_value: av,
            ..
        } = self.shape;

        let rise_tangent = es * 0.5 + 1.0;
        let fall_tangent = (as_ - es) * 0.5 + 1.0;
        let last = (HERMITE_TABLE_SIZE - 1) as Real;

        for i in 0..HERMITE_TABLE_SIZE {
            let t = i as Real / last;
            // tangents have no y component
            self.rise[i] = Sample {
                slip: hermite(t, 0.0, es, 0.0, rise_tangent),
                force: hermite(t, 0.0, ev, 0.0, 0.0),
            };
            self.fall[i] = Sample {
                slip: hermite(t, es, as_, fall_tangent, fall_tangent),
                force: hermite(t, ev, av, 0.0, 0.0),
            };
        }
    }

    /// Binary search on slip for the bracketing pair, then lerp force.
    fn lookup(table: &[Sample], slip: Real) -> Real {
        let mut lo = 0;
        let mut hi = table.len() - 1;
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if table[mid].slip <= slip {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        let (a, b) = (table[lo], table[hi]);
        let dx = b.slip - a.slip;
        let t = if dx.abs() > 1e-9 {
            ((slip - a.slip) / dx).clamp(0.0, 1.0)
        } else {
            0.0
        };
        a.force + (b.force - a.force) * t
    }
}

impl FrictionCurve for HermiteFrictionCurve {
    fn evaluate(&self, slip: Real) -> Real {
        let slip = slip.abs();
        let s = &self.shape;
        let value = if slip < s.extremum_slip {
            Self::lookup(&self.rise, slip)
        } else if slip < s.asymptote_slip {
            Self::lookup(&self.fall, slip)
        } else {
            s.asymptote_value
        };
        value * s.stiffness
    }

    fn max(&self) -> Real {
        let s = &self.shape;
        s.extremum_value.max(s.asymptote_value).max(0.0) * s.stiffness
    }
}

// ------------------------------------------------------------------------------
// Tabulated curve
// ------------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct TabulatedCurve {
    keys: Vec<(Real, Real)>,
    max: Real,
}

impl Default for TabulatedCurve {
    fn default() -> Self {
        Self::from_shape(CurveShape::default())
    }
}

impl TabulatedCurve {
    /// `(slip, value)` pairs. Keys are sorted by slip; slips outside [0,1] are
    /// clamped into it.
    pub fn new(keys: impl IntoIterator<Item = (Real, Real)>) -> Self {
        let mut keys: Vec<(Real, Real)> = keys
            .into_iter()
            .filter(|(s, v)| s.is_finite() && v.is_finite())
            .map(|(s, v)| (s.clamp(0.0, 1.0), v))
            .collect();
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        // on a shared slip the later key wins
        keys.dedup_by(|later, kept| {
            let same = (later.0 - kept.0).abs() < 1e-6;
            if same {
                *kept = *later;
            }
            same
        });

        if keys.is_empty() {
            keys.push((0.0, 0.0));
        }

        let max = keys.iter().map(|k| k.1).fold(Real::MIN, Real::max);
        Self { keys, max }
    }

    /// Piecewise-linear rendition of a curve shape: zero at rest, straight
    /// rise to the extremum, straight run to the asymptote, flat afterwards.
    pub fn from_shape(shape: CurveShape) -> Self {
        let k = shape.stiffness;
        Self::new([
            (0.0, 0.0),
            (shape.extremum_slip, shape.extremum_value * k),
            (shape.asymptote_slip, shape.asymptote_value * k),
            (1.0, shape.asymptote_value * k),
        ])
    }

    pub fn keys(&self) -> &[(Real, Real)] {
        &self.keys
    }
}

impl FrictionCurve for TabulatedCurve {
    fn evaluate(&self, slip: Real) -> Real {
        let slip = if slip.is_nan() { 0.0 } else { slip.abs().min(1.0) };

        let first = self.keys[0];
        if slip <= first.0 {
            return first.1;
        }

        let Some(i) = self.keys.iter().position(|k| k.0 > slip) else {
            return self.keys[self.keys.len() - 1].1;
        };

        let (x0, y0) = self.keys[i - 1];
        let (x1, y1) = self.keys[i];
        let frac = (slip - x0) / (x1 - x0);
        y0 + (y1 - y0) * frac
    }

    fn max(&self) -> Real {
        self.max
    }
}

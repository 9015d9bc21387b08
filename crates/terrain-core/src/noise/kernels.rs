//! Point kernels derived from gradient noise. Each maps a base Perlin sample
//! onto `[0, 1]` with a different profile.
use std::f64::consts::PI;

use glam::DVec2;
use noise::{NoiseFn, Perlin};

use super::settings::MethodKind;

/// `1 − cos(1)`: the largest value `1 − |cos(a)|` reaches for `a ∈ [−1, 1]`.
const COSINE_PEAK: f64 = 0.459_697_694_131_860_3;

/// Profile applied to the base noise value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelShape {
    /// Plain lattice noise.
    Value,
    /// `1 − |2n − 1|`: sharp crests where the base noise crosses its midpoint.
    Ridged,
    /// `1 − |sin(1 − 2n)|`.
    Sine,
    /// `1 − |cos(2n − 1)|`, rescaled by its peak.
    Cosine,
    /// `|2n − 1|`: rounded hills with creased valleys.
    Billow,
}

impl KernelShape {
    pub fn for_method(kind: MethodKind) -> Option<Self> {
        match kind {
            MethodKind::Perlin => Some(KernelShape::Value),
            MethodKind::RidgedPerlin => Some(KernelShape::Ridged),
            MethodKind::Sine => Some(KernelShape::Sine),
            MethodKind::Cosine => Some(KernelShape::Cosine),
            MethodKind::Billow => Some(KernelShape::Billow),
            MethodKind::Voronoi | MethodKind::SubdivisionDisplacement => None,
        }
    }

    /// Apply the profile to a base value `n ∈ [0, 1]`.
    #[inline]
    pub fn apply(self, n: f64) -> f64 {
        let v = match self {
            KernelShape::Value => n,
            KernelShape::Ridged => 1.0 - (2.0 * n - 1.0).abs(),
            KernelShape::Sine => 1.0 - (1.0 - 2.0 * n).sin().abs(),
            KernelShape::Cosine => (1.0 - (2.0 * n - 1.0).cos().abs()) / COSINE_PEAK,
            KernelShape::Billow => (2.0 * n - 1.0).abs(),
        };
        v.clamp(0.0, 1.0)
    }
}

/// Lattice period of [`Perlin`]: its permutation table hashes each
/// coordinate modulo 256.
pub const PERLIN_PERIOD: f64 = 256.0;

/// `v` wrapped into `[0, period)`. Non-finite input maps to 0.
#[inline]
pub fn wrap_period(v: f64, period: f64) -> f64 {
    if v.is_finite() {
        v.rem_euclid(period)
    } else {
        0.0
    }
}

/// Perlin noise remapped from `[-1, 1]` to `[0, 1]`. The point is wrapped
/// into one lattice period first, which leaves the value unchanged and
/// keeps large coordinates inside the range the noise crate can floor.
#[inline]
pub fn unit_perlin(perlin: &Perlin, p: DVec2) -> f64 {
    let (x, z) = (wrap_period(p.x, PERLIN_PERIOD), wrap_period(p.y, PERLIN_PERIOD));
    (perlin.get([x, z]) * 0.5 + 0.5).clamp(0.0, 1.0)
}

/// Cosine ease between `min` and `max` at `t ∈ [0, 1]`.
#[inline]
pub fn cosine_interpolate(min: f64, max: f64, t: f64) -> f64 {
    let w = (1.0 - (t * PI).cos()) / 2.0;
    min * (1.0 - w) + max * w
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn every_shape_stays_in_unit_range() {
        let shapes = [KernelShape::Value, KernelShape::Ridged, KernelShape::Sine, KernelShape::Cosine, KernelShape::Billow];
        for shape in shapes {
            for i in 0..=100 {
                let v = shape.apply(i as f64 / 100.0);
                assert!((0.0..=1.0).contains(&v), "{shape:?} produced {v}");
            }
        }
    }

    #[test]
    fn ridge_peaks_at_midpoint() {
        assert_relative_eq!(KernelShape::Ridged.apply(0.5), 1.0);
        assert_relative_eq!(KernelShape::Ridged.apply(0.0), 0.0);
        assert_relative_eq!(KernelShape::Billow.apply(0.5), 0.0);
    }

    #[test]
    fn cosine_profile_reaches_one_at_extremes() {
        assert_relative_eq!(KernelShape::Cosine.apply(0.0), 1.0, epsilon = 1e-9);
        assert_relative_eq!(KernelShape::Cosine.apply(1.0), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn cosine_interpolate_endpoints() {
        assert_relative_eq!(cosine_interpolate(0.0, 1.0, 0.0), 0.0);
        assert_relative_eq!(cosine_interpolate(0.0, 1.0, 1.0), 1.0);
        assert_relative_eq!(cosine_interpolate(0.0, 1.0, 0.5), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn unit_perlin_in_range() {
        let p = Perlin::new(3);
        for i in 0..200 {
            let v = unit_perlin(&p, DVec2::new(i as f64 * 0.37, i as f64 * -0.11));
            assert!((0.0..=1.0).contains(&v));
        }
    }
}

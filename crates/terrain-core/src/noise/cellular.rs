//! Cellular (Voronoi) method.
//!
//! Each octave owns a jittered-grid point set: one feature point per unit
//! cell of noise space, placed by hashing the cell against the octave seed.
//! A sample looks at the 3×3 neighbourhood, takes the nearest and farthest
//! feature distances, and eases `nearest / farthest` through a cosine curve.
//! The point set is a pure function of the seed, so neighbouring chunks agree.
//! It repeats every [`CELL_PERIOD`] cells, which keeps cell indices bounded
//! for any finite sample point.
use glam::DVec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::kernels::{cosine_interpolate, wrap_period};
use super::lattice_hash;
use super::octaves::{composite, octave_offsets, sample_point};
use super::settings::GenerationSettings;
use super::GenerationMethod;
use crate::heightfield::HeightField;

/// Lattice cells per axis before the feature points repeat.
pub const CELL_PERIOD: i64 = 1 << 20;

pub struct CellularMethod {
    settings: GenerationSettings,
    octave_seeds: Vec<u64>,
    offsets: Vec<DVec2>,
}

impl CellularMethod {
    pub fn new(settings: GenerationSettings, seed: u64) -> Self {
        let offsets = octave_offsets(seed, settings.octaves);
        let mut rng = StdRng::seed_from_u64(seed ^ 0x7a3d_91c4_0e5b_2f68);
        let octave_seeds = (0..settings.octaves).map(|_| rng.gen::<u64>()).collect();
        Self { settings, octave_seeds, offsets }
    }

    fn cell_value(&self, octave: usize, p: DVec2) -> f64 {
        let seed = self.octave_seeds[octave];
        let period = CELL_PERIOD as f64;
        let p = DVec2::new(wrap_period(p.x, period), wrap_period(p.y, period));
        let cell = p.floor();
        let (cx, cz) = (cell.x as i64, cell.y as i64);

        let mut nearest = f64::MAX;
        let mut farthest = 0.0f64;
        for dz in -1..=1 {
            for dx in -1..=1 {
                let (ix, iz) = (cx + dx, cz + dz);
                let (hx, hz) = (ix.rem_euclid(CELL_PERIOD), iz.rem_euclid(CELL_PERIOD));
                let jitter = DVec2::new(lattice_hash(seed, hx, hz, 0), lattice_hash(seed, hx, hz, 1));
                let d = p.distance(DVec2::new(ix as f64, iz as f64) + jitter);
                nearest = nearest.min(d);
                farthest = farthest.max(d);
            }
        }

        let t = if farthest > 0.0 { nearest / farthest } else { 0.0 };
        let v = cosine_interpolate(0.0, 1.0, t);

        let floor = self.settings.voronoi_min_height as f64;
        ((v - floor).max(0.0) / (1.0 - floor)).clamp(0.0, 1.0)
    }
}

impl GenerationMethod for CellularMethod {
    fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    fn evaluate_height(&self, point: DVec2) -> f32 {
        self.cell_value(0, point) as f32
    }

    fn create_height_map(&self, world_offset: DVec2) -> HeightField {
        let s = &self.settings;
        composite(s, s.normalization, |octave, x, z| {
            let p = sample_point(s, world_offset, self.offsets[octave.index], x, z, octave.frequency);
            self.cell_value(octave.index, p)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::settings::MethodKind;

    fn settings() -> GenerationSettings {
        GenerationSettings { method: MethodKind::Voronoi, octaves: 2, scale: 10.0, chunk_edge: 25, ..Default::default() }
    }

    #[test]
    fn feature_points_are_pits() {
        let m = CellularMethod::new(settings(), 11);
        let seed = m.octave_seeds[0];
        let feature = DVec2::new(3.0 + lattice_hash(seed, 3, 2, 0), 2.0 + lattice_hash(seed, 3, 2, 1));
        assert!(m.evaluate_height(feature) < 1e-6);
    }

    #[test]
    fn point_set_repeats_after_one_period() {
        let m = CellularMethod::new(settings(), 11);
        let period = CELL_PERIOD as f64;
        for i in 0..50 {
            let p = DVec2::new(i as f64 * 0.37 - 9.0, i as f64 * 0.21 + 4.0);
            let shifted = p + DVec2::new(period, -period);
            assert!((m.evaluate_height(p) - m.evaluate_height(shifted)).abs() < 1e-3);
        }
        let far = m.evaluate_height(DVec2::new(1e300, -1e300));
        assert!((0.0..=1.0).contains(&far));
    }

    #[test]
    fn deterministic_and_bounded() {
        let a = CellularMethod::new(settings(), 11).create_height_map(DVec2::new(24.0, 0.0));
        let b = CellularMethod::new(settings(), 11).create_height_map(DVec2::new(24.0, 0.0));
        assert_eq!(a.data, b.data);
        assert!(a.data.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(a.max_value() > a.min_value());
    }

    #[test]
    fn min_height_floors_low_values() {
        let floored = GenerationSettings { voronoi_min_height: 0.6, ..settings() };
        let m = CellularMethod::new(floored, 11);
        let zeros = (0..200)
            .filter(|i| m.evaluate_height(DVec2::new(*i as f64 * 0.173, *i as f64 * 0.291)) == 0.0)
            .count();
        assert!(zeros > 0, "a 0.6 floor should flatten part of the field");
    }
}

//! Midpoint-displacement subdivision.
//!
//! Starts from a 2×2 grid of seed-lattice values and doubles it until it
//! covers the chunk edge. Each doubling first fills the odd/odd cells with the
//! average of their four diagonal neighbours, then the mixed-parity cells with
//! the average of their four orthogonal neighbours. Both passes add uniform
//! jitter in `±smoothing · persistence^depth`. Neighbour lookups wrap at the
//! grid edges. The final grid is cropped to `chunk_edge × chunk_edge`.
//!
//! The jitter stream is seeded from the method seed and the chunk offset, so
//! a chunk is reproducible but its borders do not match its neighbours.
use glam::DVec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::octaves::composite;
use super::settings::{GenerationSettings, Normalization};
use super::{hash_combine, lattice_hash, GenerationMethod};
use crate::heightfield::HeightField;

pub struct SubdivisionMethod {
    settings: GenerationSettings,
    seed: u64,
}

/// Square grid with wraparound addressing.
struct WrapGrid {
    size: usize,
    cells: Vec<f64>,
}

impl WrapGrid {
    #[inline]
    fn at(&self, z: isize, x: isize) -> f64 {
        let n = self.size as isize;
        self.cells[(z.rem_euclid(n) * n + x.rem_euclid(n)) as usize]
    }

    #[inline]
    fn set(&mut self, z: usize, x: usize, v: f64) {
        self.cells[z * self.size + x] = v;
    }

    fn diagonal_average(&self, z: usize, x: usize) -> f64 {
        let (z, x) = (z as isize, x as isize);
        (self.at(z - 1, x - 1) + self.at(z - 1, x + 1) + self.at(z + 1, x - 1) + self.at(z + 1, x + 1)) / 4.0
    }

    fn orthogonal_average(&self, z: usize, x: usize) -> f64 {
        let (z, x) = (z as isize, x as isize);
        (self.at(z, x - 1) + self.at(z, x + 1) + self.at(z - 1, x) + self.at(z + 1, x)) / 4.0
    }

    /// Spread the current cells onto the even/even positions of a grid twice as wide.
    fn doubled(&self) -> WrapGrid {
        let size = self.size * 2;
        let mut next = WrapGrid { size, cells: vec![0.0; size * size] };
        for z in 0..self.size {
            for x in 0..self.size {
                next.set(z * 2, x * 2, self.cells[z * self.size + x]);
            }
        }
        next
    }
}

#[inline]
fn jitter(rng: &mut StdRng, amp: f64) -> f64 {
    if amp > 0.0 && amp.is_finite() { rng.gen_range(-amp..=amp) } else { 0.0 }
}

impl SubdivisionMethod {
    pub fn new(settings: GenerationSettings, seed: u64) -> Self {
        Self { settings, seed }
    }

    fn octave_seed(&self, octave: usize) -> u64 {
        hash_combine(self.seed, octave as u64)
    }

    /// Seed-lattice value in `[-0.5, 0.5)`.
    fn lattice_value(&self, octave: usize, x: i64, z: i64) -> f64 {
        lattice_hash(self.octave_seed(octave), x, z, 0) - 0.5
    }

    /// One displaced field for `octave`, remapped onto `[0, 1]`.
    fn subdivide(&self, rng: &mut StdRng, octave: usize, lattice: (i64, i64)) -> Vec<f64> {
        let edge = self.settings.chunk_edge;
        let smoothing = self.settings.effective_smoothing();
        let persistence = self.settings.persistence as f64;

        let (lx, lz) = lattice;
        let mut grid = WrapGrid {
            size: 2,
            cells: vec![
                self.lattice_value(octave, lx, lz),
                self.lattice_value(octave, lx + 1, lz),
                self.lattice_value(octave, lx, lz + 1),
                self.lattice_value(octave, lx + 1, lz + 1),
            ],
        };

        let mut depth = 0i32;
        while grid.size < edge {
            let mut next = grid.doubled();
            let amp = smoothing * persistence.powi(depth);

            for z in (1..next.size).step_by(2) {
                for x in (1..next.size).step_by(2) {
                    let v = next.diagonal_average(z, x) + jitter(rng, amp);
                    next.set(z, x, v);
                }
            }
            for z in 0..next.size {
                for x in ((z + 1) % 2..next.size).step_by(2) {
                    let v = next.orthogonal_average(z, x) + jitter(rng, amp);
                    next.set(z, x, v);
                }
            }

            grid = next;
            depth += 1;
        }

        let mut cropped = Vec::with_capacity(edge * edge);
        for z in 0..edge {
            cropped.extend_from_slice(&grid.cells[z * grid.size..z * grid.size + edge]);
        }
        let lo = cropped.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = cropped.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let range = hi - lo;
        for v in &mut cropped {
            *v = if range > f64::EPSILON { (*v - lo) / range } else { 0.0 };
        }
        cropped
    }
}

impl GenerationMethod for SubdivisionMethod {
    fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    fn evaluate_height(&self, point: DVec2) -> f32 {
        let cell = point.floor();
        self.lattice_value(0, cell.x as i64, cell.y as i64) as f32
    }

    fn create_height_map(&self, world_offset: DVec2) -> HeightField {
        let s = &self.settings;
        let edge = s.chunk_edge;
        let stride = (edge - 1) as f64;
        let lattice = ((world_offset.x / stride).round() as i64, (world_offset.y / stride).round() as i64);

        let chunk_seed = hash_combine(
            hash_combine(self.seed, world_offset.x.to_bits()),
            world_offset.y.to_bits(),
        );
        let mut rng = StdRng::seed_from_u64(chunk_seed);
        let fields: Vec<Vec<f64>> = (0..s.octaves as usize)
            .map(|octave| self.subdivide(&mut rng, octave, lattice))
            .collect();

        composite(s, Normalization::Observed, |octave, x, z| fields[octave.index][z * edge + x])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::settings::MethodKind;

    fn settings(edge: usize) -> GenerationSettings {
        GenerationSettings {
            method: MethodKind::SubdivisionDisplacement,
            octaves: 1,
            smoothing: 0.3,
            persistence: 0.6,
            chunk_edge: edge,
            ..Default::default()
        }
    }

    #[test]
    fn field_reaches_target_dimension() {
        for edge in [3, 17, 33, 241] {
            let hf = SubdivisionMethod::new(settings(edge), 1).create_height_map(DVec2::ZERO);
            assert_eq!((hf.width, hf.height), (edge, edge));
            assert!(hf.data.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn same_offset_same_field() {
        let m = SubdivisionMethod::new(settings(65), 3);
        let a = m.create_height_map(DVec2::new(64.0, 128.0));
        assert_eq!(a.data, m.create_height_map(DVec2::new(64.0, 128.0)).data);
        assert_ne!(a.data, m.create_height_map(DVec2::new(128.0, 128.0)).data);
    }

    #[test]
    fn wraparound_addressing() {
        let g = WrapGrid { size: 4, cells: (0..16).map(|v| v as f64).collect() };
        assert_eq!(g.at(-1, -1), 15.0);
        assert_eq!(g.at(4, 0), 0.0);
        assert_eq!(g.at(1, 5), 5.0);
        assert_eq!(g.orthogonal_average(0, 0), (1.0 + 3.0 + 12.0 + 4.0) / 4.0);
    }

    #[test]
    fn zero_jitter_reproduces_smooth_interpolation() {
        let flat = GenerationSettings { smoothing: 0.0, persistence: 0.0, ..settings(9) };
        let m = SubdivisionMethod::new(flat, 8);
        let hf = m.create_height_map(DVec2::ZERO);
        assert!(hf.data.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(hf.max_value() > hf.min_value());
    }
}

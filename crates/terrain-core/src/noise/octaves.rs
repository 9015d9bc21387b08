//! Shared octave compositor.
//!
//! Octave 0 is sampled at frequency 1 and amplitude 1. Each following octave
//! multiplies the amplitude by `persistence` and divides the frequency by
//! `smoothing`. With `use_first_octave_as_mask`, octaves 1.. are multiplied by
//! the octave-0 value of the same cell; octave 0 itself is never masked.
use glam::DVec2;
use log::trace;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::settings::{GenerationSettings, Normalization};
use crate::heightfield::{unit_interval, HeightField};

/// Half-width of the per-octave offset range. Large enough to push samples
/// away from the lattice origin, where gradient noise shows its period.
pub const OCTAVE_OFFSET_RANGE: i32 = 100_000;

/// Per-octave offsets drawn once per method from its seed. They do not depend
/// on the chunk being generated, which is what keeps neighbours phase-coherent.
pub fn octave_offsets(seed: u64, octaves: u32) -> Vec<DVec2> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..octaves)
        .map(|_| {
            let x = rng.gen_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE);
            let z = rng.gen_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE);
            DVec2::new(x as f64, z as f64)
        })
        .collect()
}

/// State of the octave currently being accumulated.
#[derive(Debug, Clone, Copy)]
pub struct Octave {
    pub index: usize,
    pub frequency: f64,
    pub amplitude: f64,
}

/// Noise-space sample point for cell `(x, z)` of a chunk at `world_offset`.
///
/// `((cell + world_offset − half_extent) / scale) · frequency + octave_offset`
#[inline]
pub fn sample_point(
    settings: &GenerationSettings,
    world_offset: DVec2,
    octave_offset: DVec2,
    x: usize,
    z: usize,
    frequency: f64,
) -> DVec2 {
    let half = settings.chunk_edge as f64 / 2.0;
    let cell = DVec2::new(x as f64, z as f64) + world_offset - DVec2::splat(half);
    cell / settings.scale as f64 * frequency + octave_offset
}

/// Upper bound of the raw octave sum when every kernel value lies in `[0, 1]`.
pub fn amplitude_sum(octaves: u32, persistence: f32) -> f64 {
    let mut amp = 1.0f64;
    let mut total = 0.0f64;
    for _ in 0..octaves {
        total += amp;
        amp *= persistence as f64;
        if amp == 0.0 || !total.is_finite() {
            break;
        }
    }
    total
}

/// Accumulate `settings.octaves` octaves of `sample` over a chunk and remap
/// the sum onto `[0, 1]`.
///
/// `sample(octave, x, z)` must return a value in `[0, 1]`; the bounded
/// normalization relies on it.
pub fn composite<F>(settings: &GenerationSettings, normalization: Normalization, mut sample: F) -> HeightField
where
    F: FnMut(&Octave, usize, usize) -> f64,
{
    let edge = settings.chunk_edge;
    let n = edge * edge;
    let smoothing = settings.effective_smoothing();

    let mut sum = vec![0.0f64; n];
    let mut mask = if settings.use_first_octave_as_mask { vec![0.0f64; n] } else { Vec::new() };

    let mut octave = Octave { index: 0, frequency: 1.0, amplitude: 1.0 };
    for index in 0..settings.octaves as usize {
        octave.index = index;
        for z in 0..edge {
            for x in 0..edge {
                let idx = z * edge + x;
                let mut v = sample(&octave, x, z);
                if !mask.is_empty() {
                    if index == 0 {
                        mask[idx] = v;
                    } else {
                        v *= mask[idx];
                    }
                }
                sum[idx] += v * octave.amplitude;
            }
        }
        octave.amplitude *= settings.persistence as f64;
        octave.frequency /= smoothing;
    }

    let (lo, hi) = match normalization {
        Normalization::Bounded => (0.0, amplitude_sum(settings.octaves, settings.persistence)),
        Normalization::Observed => observed_range(&sum),
    };
    trace!(
        "{:?}: octave sum range {:?}, normalized against [{lo:.4}, {hi:.4}]",
        settings.method,
        observed_range(&sum)
    );

    HeightField {
        data: sum.iter().map(|&v| unit_interval(v, lo, hi)).collect(),
        width: edge,
        height: edge,
    }
}

fn observed_range(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn settings(octaves: u32) -> GenerationSettings {
        GenerationSettings { octaves, chunk_edge: 5, persistence: 0.5, smoothing: 0.5, ..Default::default() }
    }

    #[test]
    fn offsets_depend_only_on_seed() {
        let a = octave_offsets(42, 4);
        assert_eq!(a, octave_offsets(42, 4));
        assert_ne!(a, octave_offsets(43, 4));
        for o in &a {
            assert!(o.x.abs() <= OCTAVE_OFFSET_RANGE as f64 && o.y.abs() <= OCTAVE_OFFSET_RANGE as f64);
        }
    }

    #[test]
    fn sample_point_is_continuous_across_chunks() {
        let s = settings(1);
        let stride = (s.chunk_edge - 1) as f64;
        let left = sample_point(&s, DVec2::ZERO, DVec2::new(3.0, 4.0), s.chunk_edge - 1, 2, 2.0);
        let right = sample_point(&s, DVec2::new(stride, 0.0), DVec2::new(3.0, 4.0), 0, 2, 2.0);
        assert_eq!(left, right);
    }

    #[test]
    fn amplitude_sum_is_geometric() {
        assert_relative_eq!(amplitude_sum(3, 0.5), 1.75);
        assert_relative_eq!(amplitude_sum(1, 0.9), 1.0);
    }

    #[test]
    fn frequency_divides_by_smoothing() {
        let mut seen = Vec::new();
        composite(&settings(3), Normalization::Bounded, |o, x, z| {
            if x == 0 && z == 0 {
                seen.push((o.frequency, o.amplitude));
            }
            0.5
        });
        assert_eq!(seen, vec![(1.0, 1.0), (2.0, 0.5), (4.0, 0.25)]);
    }

    #[test]
    fn constant_full_kernel_hits_upper_bound() {
        let hf = composite(&settings(4), Normalization::Bounded, |_, _, _| 1.0);
        assert!(hf.data.iter().all(|&v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn huge_persistence_stays_in_unit_range() {
        let s = GenerationSettings { persistence: 1e30, ..settings(3) };
        s.validate(0).unwrap();
        let hf = composite(&s, Normalization::Bounded, |o, x, _| if o.index == 2 { x as f64 / 4.0 } else { 0.5 });
        assert!(hf.data.iter().all(|v| (0.0..=1.0).contains(v)), "{:?}", hf.data);
        assert!(hf.max_value() > hf.min_value());
    }

    #[test]
    fn zero_first_octave_masks_the_rest() {
        let s = GenerationSettings { use_first_octave_as_mask: true, ..settings(3) };
        let hf = composite(&s, Normalization::Bounded, |o, _, _| if o.index == 0 { 0.0 } else { 1.0 });
        assert!(hf.data.iter().all(|&v| v == 0.0));
    }
}

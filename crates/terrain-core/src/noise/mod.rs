//! Height generation methods.
//!
//! Every method implements [`GenerationMethod`]: a point kernel
//! (`evaluate_height`) and a chunk-sized field builder (`create_height_map`)
//! that runs the shared octave compositor in [`octaves`]. Methods are built
//! from validated [`GenerationSettings`] by [`build_method`] and are immutable
//! afterwards, so one instance can serve every chunk from any worker thread.
pub mod cellular;
pub mod fractal;
pub mod kernels;
pub mod octaves;
pub mod settings;
pub mod subdivision;

use std::sync::Arc;

use glam::DVec2;

use crate::error::ConfigError;
use crate::heightfield::HeightField;
pub use settings::{GenerationSettings, MethodKind, Normalization, DEFAULT_CHUNK_EDGE, SMOOTHING_EPSILON};

/// One height-generation algorithm bound to its settings and seed.
pub trait GenerationMethod: Send + Sync {
    fn settings(&self) -> &GenerationSettings;

    /// Raw kernel value at a noise-space point, in the method's own range
    /// (`[0, 1]` for the noise kernels, `[-0.5, 0.5)` for subdivision seeds).
    fn evaluate_height(&self, point: DVec2) -> f32;

    /// Build a normalized `chunk_edge × chunk_edge` field whose cell `(x, z)`
    /// sits at world sample `world_offset + (x, z)`. Pure in
    /// `(settings, seed, world_offset)`.
    fn create_height_map(&self, world_offset: DVec2) -> HeightField;
}

/// Validate `settings` and build the method it names.
pub fn build_method(settings: &GenerationSettings, seed: u64) -> Result<Arc<dyn GenerationMethod>, ConfigError> {
    settings.validate(0)?;
    let settings = settings.clone();
    let method: Arc<dyn GenerationMethod> = match settings.method {
        MethodKind::SubdivisionDisplacement => Arc::new(subdivision::SubdivisionMethod::new(settings, seed)),
        MethodKind::Voronoi => Arc::new(cellular::CellularMethod::new(settings, seed)),
        MethodKind::Perlin
        | MethodKind::RidgedPerlin
        | MethodKind::Sine
        | MethodKind::Cosine
        | MethodKind::Billow => Arc::new(fractal::FractalMethod::new(settings, seed)),
    };
    Ok(method)
}

/// Seed for layer `index` of a run seeded with `seed`, so identical layers
/// stacked in one run do not produce identical fields.
pub fn layer_seed(seed: u64, index: usize) -> u64 {
    hash_combine(seed, index as u64)
}

/// Boost-style hash combine, widened to 64 bits.
pub(crate) fn hash_combine(seed: u64, value: u64) -> u64 {
    seed ^ value
        .wrapping_add(0x9e37_79b9_7f4a_7c15)
        .wrapping_add(seed << 6)
        .wrapping_add(seed >> 2)
}

/// SplitMix64 finalizer over a lattice point; returns a value in `[0, 1)`.
pub(crate) fn lattice_hash(seed: u64, x: i64, z: i64, channel: u64) -> f64 {
    let mut h = hash_combine(hash_combine(hash_combine(seed, x as u64), z as u64), channel);
    h = (h ^ (h >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    h = (h ^ (h >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    h ^= h >> 31;
    (h >> 11) as f64 / (1u64 << 53) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_seeds_differ_per_layer() {
        assert_ne!(layer_seed(42, 0), layer_seed(42, 1));
        assert_eq!(layer_seed(42, 3), layer_seed(42, 3));
    }

    #[test]
    fn lattice_hash_is_unit_range_and_deterministic() {
        for x in -20..20 {
            for z in -20..20 {
                let h = lattice_hash(7, x, z, 0);
                assert!((0.0..1.0).contains(&h));
                assert_eq!(h, lattice_hash(7, x, z, 0));
            }
        }
        assert_ne!(lattice_hash(7, 1, 2, 0), lattice_hash(7, 1, 2, 1));
    }

    #[test]
    fn build_method_rejects_invalid_settings() {
        let s = GenerationSettings { octaves: 0, ..Default::default() };
        assert!(build_method(&s, 1).is_err());
    }

    #[test]
    fn every_kind_builds_a_full_sized_unit_field() {
        for kind in MethodKind::ALL {
            let s = GenerationSettings { method: kind, chunk_edge: 33, octaves: 3, ..Default::default() };
            let m = build_method(&s, 99).unwrap();
            let hf = m.create_height_map(DVec2::new(64.0, -32.0));
            assert_eq!((hf.width, hf.height), (33, 33), "{kind:?}");
            assert!(hf.data.iter().all(|v| (0.0..=1.0).contains(v)), "{kind:?} left [0, 1]");
        }
    }

    #[test]
    fn zero_smoothing_generates_at_any_offset() {
        for kind in MethodKind::ALL {
            let s = GenerationSettings { method: kind, smoothing: 0.0, octaves: 7, chunk_edge: 9, ..Default::default() };
            let m = build_method(&s, 5).unwrap();
            for offset in [DVec2::ZERO, DVec2::new(1e9, -1e9), DVec2::new(-3.5e12, 2.0e7)] {
                let hf = m.create_height_map(offset);
                assert_eq!(hf.data.len(), 81);
                assert!(hf.data.iter().all(|v| (0.0..=1.0).contains(v)), "{kind:?} at {offset:?}");
            }
        }
    }
}

//! Fractal gradient-noise methods: Perlin, ridged, sine, cosine and billow.
use glam::DVec2;
use noise::Perlin;

use super::kernels::{unit_perlin, KernelShape};
use super::octaves::{composite, octave_offsets, sample_point};
use super::settings::GenerationSettings;
use super::GenerationMethod;
use crate::heightfield::HeightField;

pub struct FractalMethod {
    settings: GenerationSettings,
    shape: KernelShape,
    perlin: Perlin,
    offsets: Vec<DVec2>,
}

impl FractalMethod {
    /// `settings.method` must be one of the gradient-noise kinds; anything
    /// else falls back to the plain value profile.
    pub fn new(settings: GenerationSettings, seed: u64) -> Self {
        let shape = KernelShape::for_method(settings.method).unwrap_or(KernelShape::Value);
        let offsets = octave_offsets(seed, settings.octaves);
        Self { perlin: Perlin::new(seed as u32 ^ (seed >> 32) as u32), shape, offsets, settings }
    }
}

impl GenerationMethod for FractalMethod {
    fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    fn evaluate_height(&self, point: DVec2) -> f32 {
        self.shape.apply(unit_perlin(&self.perlin, point)) as f32
    }

    fn create_height_map(&self, world_offset: DVec2) -> HeightField {
        let s = &self.settings;
        composite(s, s.normalization, |octave, x, z| {
            let p = sample_point(s, world_offset, self.offsets[octave.index], x, z, octave.frequency);
            self.shape.apply(unit_perlin(&self.perlin, p))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::settings::{MethodKind, Normalization};

    fn scenario_settings() -> GenerationSettings {
        GenerationSettings {
            method: MethodKind::Perlin,
            octaves: 1,
            scale: 50.0,
            weight: 1.0,
            chunk_edge: 241,
            ..Default::default()
        }
    }

    #[test]
    fn perlin_scenario_seed_42() {
        let method = FractalMethod::new(scenario_settings(), 42);
        let a = method.create_height_map(DVec2::ZERO);
        assert_eq!((a.width, a.height), (241, 241));
        assert!(a.data.iter().all(|v| (0.0..=1.0).contains(v)));
        let b = FractalMethod::new(scenario_settings(), 42).create_height_map(DVec2::ZERO);
        assert_eq!(a.data, b.data, "recomputation must be bit-identical");
    }

    #[test]
    fn output_is_not_flat() {
        let hf = FractalMethod::new(scenario_settings(), 42).create_height_map(DVec2::ZERO);
        assert!(hf.max_value() - hf.min_value() > 0.05);
    }

    #[test]
    fn adjacent_chunks_share_borders() {
        for kind in [MethodKind::Perlin, MethodKind::RidgedPerlin, MethodKind::Sine, MethodKind::Cosine, MethodKind::Billow] {
            let s = GenerationSettings { method: kind, octaves: 4, scale: 20.0, chunk_edge: 33, ..Default::default() };
            let method = FractalMethod::new(s, 7);
            let stride = 32.0;
            let here = method.create_height_map(DVec2::new(stride, -stride));
            let east = method.create_height_map(DVec2::new(2.0 * stride, -stride));
            let south = method.create_height_map(DVec2::new(stride, 0.0));
            for i in 0..33 {
                assert!((here.get(i, 32) - east.get(i, 0)).abs() < 1e-5, "{kind:?} east seam at row {i}");
                assert!((here.get(32, i) - south.get(0, i)).abs() < 1e-5, "{kind:?} south seam at col {i}");
            }
        }
    }

    #[test]
    fn observed_normalization_spans_full_range() {
        let s = GenerationSettings { normalization: Normalization::Observed, ..scenario_settings() };
        let hf = FractalMethod::new(s, 42).create_height_map(DVec2::ZERO);
        assert_eq!(hf.min_value(), 0.0);
        assert_eq!(hf.max_value(), 1.0);
    }

    #[test]
    fn octave_mask_changes_output() {
        let plain = GenerationSettings { octaves: 3, chunk_edge: 17, ..Default::default() };
        let masked = GenerationSettings { use_first_octave_as_mask: true, ..plain.clone() };
        let a = FractalMethod::new(plain, 5).create_height_map(DVec2::ZERO);
        let b = FractalMethod::new(masked, 5).create_height_map(DVec2::ZERO);
        assert_ne!(a.data, b.data);
    }
}

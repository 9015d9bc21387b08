use serde::{Deserialize, Serialize};

use super::octaves::amplitude_sum;
use crate::error::ConfigError;

/// Smoothing values below this are clamped so `frequency /= smoothing` stays finite.
pub const SMOOTHING_EPSILON: f32 = 1e-4;

/// Largest frequency the last octave may reach. Kernels wrap their input
/// into a fixed period, so any finite frequency is safe; this keeps
/// `cell / scale · frequency` finite for every chunk offset.
pub const MAX_OCTAVE_FREQUENCY: f64 = 1e150;

/// Default chunk edge in samples (240 world units per chunk).
pub const DEFAULT_CHUNK_EDGE: usize = 241;

/// Height-generation algorithm used by one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MethodKind {
    SubdivisionDisplacement,
    Perlin,
    RidgedPerlin,
    Voronoi,
    Sine,
    Cosine,
    Billow,
}

impl MethodKind {
    pub const ALL: [MethodKind; 7] = [
        MethodKind::SubdivisionDisplacement,
        MethodKind::Perlin,
        MethodKind::RidgedPerlin,
        MethodKind::Voronoi,
        MethodKind::Sine,
        MethodKind::Cosine,
        MethodKind::Billow,
    ];

    /// Methods whose output depends on the world offset only through the
    /// sample position, so adjacent chunks meet without seams.
    pub fn tiles_seamlessly(self) -> bool {
        !matches!(self, MethodKind::SubdivisionDisplacement)
    }
}

/// How a layer's accumulated octave sum is remapped onto `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Normalization {
    /// Against the analytic range of the octave sum. Offset-independent, so
    /// neighbouring chunks tile.
    #[default]
    Bounded,
    /// Against the field's own observed min/max. Maximises contrast inside a
    /// single chunk but breaks continuity across chunk borders.
    Observed,
}

/// Configuration for one noise layer. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub method: MethodKind,
    pub octaves: u32,
    pub scale: f32,
    pub weight: f32,
    pub persistence: f32,
    /// Per-octave frequency divisor (lacunarity = 1 / smoothing).
    pub smoothing: f32,
    pub chunk_edge: usize,
    pub is_active: bool,
    pub use_first_octave_as_mask: bool,
    pub use_first_layer_as_mask: bool,
    pub invert_mask: bool,
    pub subtract_from_map: bool,
    pub normalization: Normalization,
    /// Cellular floor in `[0, 1)`: Voronoi values below it flatten to zero.
    pub voronoi_min_height: f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            method: MethodKind::Perlin,
            octaves: 4,
            scale: 50.0,
            weight: 1.0,
            persistence: 0.5,
            smoothing: 0.5,
            chunk_edge: DEFAULT_CHUNK_EDGE,
            is_active: true,
            use_first_octave_as_mask: false,
            use_first_layer_as_mask: false,
            invert_mask: false,
            subtract_from_map: false,
            normalization: Normalization::Bounded,
            voronoi_min_height: 0.0,
        }
    }
}

impl GenerationSettings {
    /// Settings for `method` with the given octave shape; flags at defaults.
    pub fn new(method: MethodKind, octaves: u32, scale: f32, weight: f32, persistence: f32, smoothing: f32) -> Self {
        Self { method, octaves, scale, weight, persistence, smoothing, ..Self::default() }
    }

    /// Check every per-layer invariant. `layer` is only used in error messages.
    pub fn validate(&self, layer: usize) -> Result<(), ConfigError> {
        if !(self.scale > 0.0) || !self.scale.is_finite() {
            return Err(ConfigError::NonPositiveScale { layer, scale: self.scale });
        }
        if self.octaves == 0 {
            return Err(ConfigError::ZeroOctaves { layer });
        }
        if !self.smoothing.is_finite() || self.smoothing < 0.0 {
            return Err(ConfigError::InvalidSmoothing { layer, smoothing: self.smoothing });
        }
        if !self.persistence.is_finite()
            || self.persistence < 0.0
            || !amplitude_sum(self.octaves, self.persistence).is_finite()
        {
            return Err(ConfigError::InvalidPersistence { layer, persistence: self.persistence });
        }
        if !(self.final_octave_frequency() <= MAX_OCTAVE_FREQUENCY) {
            return Err(ConfigError::OctaveFrequencyOverflow {
                layer,
                octaves: self.octaves,
                smoothing: self.smoothing,
            });
        }
        if !self.weight.is_finite() {
            return Err(ConfigError::InvalidWeight { layer, weight: self.weight });
        }
        if !(0.0..1.0).contains(&self.voronoi_min_height) {
            return Err(ConfigError::InvalidVoronoiFloor { layer, value: self.voronoi_min_height });
        }
        validate_chunk_edge(self.chunk_edge)
    }

    /// `(1 / smoothing)^(octaves − 1)`: the frequency of the last octave.
    pub fn final_octave_frequency(&self) -> f64 {
        let steps = self.octaves.saturating_sub(1).min(i32::MAX as u32) as i32;
        (1.0 / self.effective_smoothing()).powi(steps)
    }

    /// Smoothing with the near-zero guard applied.
    pub fn effective_smoothing(&self) -> f64 {
        self.smoothing.max(SMOOTHING_EPSILON) as f64
    }
}

pub(crate) fn validate_chunk_edge(edge: usize) -> Result<(), ConfigError> {
    if edge < 3 {
        return Err(ConfigError::ChunkEdgeTooSmall(edge));
    }
    if edge % 2 == 0 {
        return Err(ConfigError::EvenChunkEdge(edge));
    }
    Ok(())
}

//! Run configuration: layer stack, chunk geometry, LOD table and streaming knobs.
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::noise::settings::validate_chunk_edge;
use crate::noise::{GenerationSettings, MethodKind, DEFAULT_CHUNK_EDGE};
use crate::streaming::{GridMetric, LodLevel, LodTable, MaterialId};

/// Everything a [`StreamingManager`](crate::streaming::StreamingManager)
/// needs. Missing JSON fields take their [`Default`] values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub seed: u64,
    /// Samples per chunk side. Odd, shared by every layer.
    pub chunk_edge: usize,
    /// Scales the combined layer sum before it is stored as chunk data.
    pub height_multiplier: f32,
    /// Extra vertical scale applied when meshing.
    pub mesh_height_scale: f32,
    pub layers: Vec<GenerationSettings>,
    /// Strictly increasing thresholds; the last one is the view distance.
    pub lods: Vec<LodLevel>,
    pub grid_metric: GridMetric,
    /// Viewport slack, in viewport units, before a chunk counts as off-screen.
    pub viewport_margin: f32,
    /// Worker pool size; `None` lets rayon pick.
    pub worker_threads: Option<usize>,
    /// Registry cap. `None` keeps every chunk ever created.
    pub max_resident_chunks: Option<usize>,
    pub material: MaterialId,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            chunk_edge: DEFAULT_CHUNK_EDGE,
            height_multiplier: 60.0,
            mesh_height_scale: 1.0,
            layers: default_layers(),
            lods: vec![(1, 300.0).into(), (2, 600.0).into(), (4, 1200.0).into(), (8, 2400.0).into()],
            grid_metric: GridMetric::Chebyshev,
            viewport_margin: 0.1,
            worker_threads: None,
            max_resident_chunks: None,
            material: MaterialId::default(),
        }
    }
}

/// Rolling base, ridged detail, and cellular pits that only show where the
/// base is high.
fn default_layers() -> Vec<GenerationSettings> {
    vec![
        GenerationSettings::new(MethodKind::Perlin, 5, 300.0, 1.0, 0.5, 0.5),
        GenerationSettings::new(MethodKind::RidgedPerlin, 4, 120.0, 0.35, 0.45, 0.5),
        GenerationSettings {
            use_first_layer_as_mask: true,
            voronoi_min_height: 0.2,
            ..GenerationSettings::new(MethodKind::Voronoi, 2, 90.0, 0.25, 0.5, 0.5)
        },
    ]
}

impl TerrainConfig {
    /// Set the chunk edge on the run and on every layer.
    pub fn with_chunk_edge(mut self, edge: usize) -> Self {
        self.chunk_edge = edge;
        for layer in &mut self.layers {
            layer.chunk_edge = edge;
        }
        self
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        validate_chunk_edge(self.chunk_edge)?;
        for (i, layer) in self.layers.iter().enumerate() {
            layer.validate(i)?;
            if layer.chunk_edge != self.chunk_edge {
                return Err(ConfigError::MismatchedChunkEdge {
                    layer: i,
                    expected: self.chunk_edge,
                    found: layer.chunk_edge,
                });
            }
        }
        LodTable::validate(&self.lods, self.chunk_edge)?;
        if !self.height_multiplier.is_finite() {
            return Err(ConfigError::InvalidHeightMultiplier(self.height_multiplier));
        }
        if !self.mesh_height_scale.is_finite() {
            return Err(ConfigError::InvalidHeightMultiplier(self.mesh_height_scale));
        }
        if !self.viewport_margin.is_finite() || self.viewport_margin < 0.0 {
            return Err(ConfigError::InvalidViewportMargin(self.viewport_margin));
        }
        if self.worker_threads == Some(0) {
            return Err(ConfigError::ZeroWorkers);
        }
        Ok(())
    }

    pub fn view_distance(&self) -> f32 {
        self.lods.last().map_or(0.0, |l| l.threshold)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

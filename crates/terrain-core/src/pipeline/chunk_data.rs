//! Combined per-chunk data: the weighted sum of every active layer plus its
//! gradient field.
use serde::Serialize;

use super::gradient::GradientField;
use crate::error::{Result, TerrainError};
use crate::heightfield::HeightField;
use crate::noise::GenerationSettings;

/// Immutable result of one chunk-data request.
#[derive(Debug, Clone)]
pub struct ChunkData {
    pub heights: HeightField,
    pub gradients: GradientField,
}

impl ChunkData {
    pub fn new(heights: HeightField) -> Self {
        let gradients = GradientField::from_heights(&heights);
        Self { heights, gradients }
    }

    pub fn edge(&self) -> usize {
        self.heights.width
    }

    pub fn height_range(&self) -> (f32, f32) {
        (self.heights.min_value(), self.heights.max_value())
    }
}

/// Summary of one layer's contribution, logged per request.
#[derive(Debug, Clone, Serialize)]
pub struct LayerContribution {
    pub layer: usize,
    pub weight: f32,
    pub masked: bool,
    pub subtracted: bool,
}

/// Weighted combination of already-generated layer fields.
///
/// `layers` is the active layer list in configuration order. The first entry
/// is the mask source. A later layer with `use_first_layer_as_mask` is
/// multiplied by the first field, or by `1 − first` when that later layer sets
/// `invert_mask`. A layer with `subtract_from_map` is subtracted. The sum is
/// then scaled by `height_multiplier`.
pub fn combine_layers(
    layers: &[(&GenerationSettings, HeightField)],
    edge: usize,
    height_multiplier: f32,
) -> Result<(HeightField, Vec<LayerContribution>)> {
    let mut combined = HeightField::square(edge);
    let mut contributions = Vec::with_capacity(layers.len());

    for (i, (settings, field)) in layers.iter().enumerate() {
        if field.width != edge || field.height != edge {
            return Err(TerrainError::DimensionMismatch { layer: i, expected: edge, found: field.width });
        }
        let mask = if i > 0 && settings.use_first_layer_as_mask { Some(&layers[0].1) } else { None };
        let sign = if settings.subtract_from_map { -1.0 } else { 1.0 };

        for (idx, out) in combined.data.iter_mut().enumerate() {
            let mut v = field.data[idx] * settings.weight;
            if let Some(mask) = mask {
                let m = mask.data[idx];
                v *= if settings.invert_mask { 1.0 - m } else { m };
            }
            *out += sign * v;
        }

        contributions.push(LayerContribution {
            layer: i,
            weight: settings.weight,
            masked: mask.is_some(),
            subtracted: settings.subtract_from_map,
        });
    }

    for v in &mut combined.data {
        *v *= height_multiplier;
    }
    Ok((combined, contributions))
}

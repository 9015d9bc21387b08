//! Distance-based level-of-detail table.
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One LOD: mesh every `stride`-th sample while the viewer is closer than
/// `threshold` world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LodLevel {
    pub stride: usize,
    pub threshold: f32,
}

impl From<(usize, f32)> for LodLevel {
    fn from((stride, threshold): (usize, f32)) -> Self {
        Self { stride, threshold }
    }
}

/// Validated, non-empty LOD list with strictly increasing thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct LodTable {
    levels: Vec<LodLevel>,
}

impl LodTable {
    pub fn new(levels: Vec<LodLevel>, chunk_edge: usize) -> Result<Self, ConfigError> {
        Self::validate(&levels, chunk_edge)?;
        Ok(Self { levels })
    }

    pub fn validate(levels: &[LodLevel], chunk_edge: usize) -> Result<(), ConfigError> {
        if levels.is_empty() {
            return Err(ConfigError::EmptyLodTable);
        }
        let cells = chunk_edge.saturating_sub(1);
        let mut previous = 0.0f32;
        for (index, level) in levels.iter().enumerate() {
            // NaN fails this comparison too.
            if !(level.threshold > previous) || !level.threshold.is_finite() {
                return Err(ConfigError::NonIncreasingThreshold { index, threshold: level.threshold, previous });
            }
            if level.stride == 0 || cells % level.stride != 0 {
                return Err(ConfigError::StrideDoesNotDivide { index, stride: level.stride, cells });
            }
            previous = level.threshold;
        }
        Ok(())
    }

    /// Index of the first level whose threshold exceeds `distance`; the last
    /// level when none does.
    pub fn select(&self, distance: f32) -> usize {
        self.levels
            .iter()
            .position(|l| distance < l.threshold)
            .unwrap_or(self.levels.len() - 1)
    }

    pub fn max_view_distance(&self) -> f32 {
        self.levels[self.levels.len() - 1].threshold
    }

    pub fn level(&self, index: usize) -> LodLevel {
        self.levels[index]
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

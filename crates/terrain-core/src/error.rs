//! Error taxonomy for configuration, generation and the chunk pipeline.
use thiserror::Error;

/// Invalid configuration. Always raised at validation time, before any
/// generation method is built or any task is dispatched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("layer {layer}: scale must be > 0, got {scale}")]
    NonPositiveScale { layer: usize, scale: f32 },

    #[error("layer {layer}: octave count must be at least 1")]
    ZeroOctaves { layer: usize },

    #[error("layer {layer}: {octaves} octaves at smoothing {smoothing} push the last octave's frequency past the supported limit")]
    OctaveFrequencyOverflow { layer: usize, octaves: u32, smoothing: f32 },

    #[error("layer {layer}: smoothing must be finite and non-negative, got {smoothing}")]
    InvalidSmoothing { layer: usize, smoothing: f32 },

    #[error("layer {layer}: persistence must be finite, non-negative and keep the octave amplitude sum finite, got {persistence}")]
    InvalidPersistence { layer: usize, persistence: f32 },

    #[error("layer {layer}: weight must be finite, got {weight}")]
    InvalidWeight { layer: usize, weight: f32 },

    #[error("layer {layer}: voronoi min height must lie in [0, 1), got {value}")]
    InvalidVoronoiFloor { layer: usize, value: f32 },

    #[error("chunk edge must be odd, got {0}")]
    EvenChunkEdge(usize),

    #[error("chunk edge must be at least 3, got {0}")]
    ChunkEdgeTooSmall(usize),

    #[error("layer {layer}: chunk edge {found} differs from the run's chunk edge {expected}")]
    MismatchedChunkEdge { layer: usize, expected: usize, found: usize },

    #[error("LOD table is empty")]
    EmptyLodTable,

    #[error("LOD {index}: threshold {threshold} must exceed the previous threshold {previous}")]
    NonIncreasingThreshold { index: usize, threshold: f32, previous: f32 },

    #[error("LOD {index}: stride {stride} does not divide chunk edge - 1 ({cells})")]
    StrideDoesNotDivide { index: usize, stride: usize, cells: usize },

    #[error("height multiplier must be finite, got {0}")]
    InvalidHeightMultiplier(f32),

    #[error("viewport margin must be finite and non-negative, got {0}")]
    InvalidViewportMargin(f32),

    #[error("worker thread count must be at least 1")]
    ZeroWorkers,
}

/// Errors surfaced by the generation pipeline and its callers.
#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A layer task did not produce a height map; the whole chunk request fails.
    #[error("generation layer {layer} failed: {reason}")]
    LayerFailed { layer: usize, reason: String },

    #[error("layer {layer} produced a {found}x{found} field, expected {expected}x{expected}")]
    DimensionMismatch { layer: usize, expected: usize, found: usize },

    #[error("stride {stride} is not valid for a field of edge {edge}")]
    InvalidStride { stride: usize, edge: usize },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TerrainError>;

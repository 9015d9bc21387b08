//! Streaming procedural terrain: layered height generation, a threaded chunk
//! pipeline, grid meshing and a viewer-driven chunk manager.
pub mod config;
pub mod coords;
pub mod error;
pub mod heightfield;
pub mod mesh;
pub mod noise;
pub mod pipeline;
pub mod streaming;

pub use config::TerrainConfig;
pub use coords::ChunkCoord;
pub use error::{ConfigError, Result, TerrainError};
pub use heightfield::HeightField;
pub use mesh::{build_chunk_mesh, build_mesh, MeshBuffer};
pub use noise::{build_method, GenerationMethod, GenerationSettings, MethodKind, Normalization};
pub use pipeline::{ChunkData, ChunkPipeline, GradientField};
pub use streaming::{
    ChunkRenderer, GridMetric, LodLevel, LodTable, MaterialId, PerspectiveCamera, StreamingManager, TickReport,
    ViewportProjector,
};

//! Per-chunk streaming state.
use std::sync::Arc;

use serde::Serialize;

use super::bounds::ChunkBounds;
use crate::coords::ChunkCoord;
use crate::mesh::MeshBuffer;
use crate::pipeline::ChunkData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChunkState {
    /// Chunk data requested, nothing arrived yet.
    DataPending,
    /// Data arrived; no mesh has been shown.
    DataReady,
    Displayed,
    Hidden,
}

/// Mesh cache entry for one LOD.
#[derive(Debug, Clone, Default)]
pub enum MeshSlot {
    #[default]
    Empty,
    Requested,
    Ready(Arc<MeshBuffer>),
}

impl MeshSlot {
    pub fn mesh(&self) -> Option<&Arc<MeshBuffer>> {
        match self {
            MeshSlot::Ready(mesh) => Some(mesh),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct TerrainChunk {
    pub coord: ChunkCoord,
    pub state: ChunkState,
    pub bounds: ChunkBounds,
    pub data: Option<Arc<ChunkData>>,
    pub meshes: Vec<MeshSlot>,
    /// LOD whose mesh is attached in the renderer.
    pub current_lod: Option<usize>,
    pub visible: bool,
    pub last_visible_tick: u64,
    /// Distinguishes this chunk from an earlier, evicted chunk at the same coordinate.
    pub(crate) epoch: u64,
}

impl TerrainChunk {
    pub(crate) fn new(coord: ChunkCoord, chunk_stride: f32, lod_count: usize, tick: u64, epoch: u64) -> Self {
        Self {
            coord,
            state: ChunkState::DataPending,
            bounds: ChunkBounds::for_chunk(coord, chunk_stride, (0.0, 0.0)),
            data: None,
            meshes: vec![MeshSlot::Empty; lod_count],
            current_lod: None,
            visible: false,
            last_visible_tick: tick,
            epoch,
        }
    }

    pub(crate) fn set_data(&mut self, data: Arc<ChunkData>) {
        self.bounds = self.bounds.with_height_range(data.height_range());
        self.data = Some(data);
        self.state = ChunkState::DataReady;
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    pub fn mesh(&self, lod: usize) -> Option<&Arc<MeshBuffer>> {
        self.meshes.get(lod).and_then(MeshSlot::mesh)
    }
}

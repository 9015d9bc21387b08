use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::coords::ChunkCoord;
use crate::mesh::MeshBuffer;

/// Opaque handle for the material the renderer applies to terrain meshes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialId(pub u32);

/// Scene-side sink for chunk meshes. Called only from the thread that
/// ticks the [`StreamingManager`](super::StreamingManager).
pub trait ChunkRenderer {
    /// Replace whatever mesh `coord` currently shows.
    fn attach_mesh(&mut self, coord: ChunkCoord, mesh: &Arc<MeshBuffer>, material: MaterialId);

    fn set_visible(&mut self, coord: ChunkCoord, visible: bool);

    /// The chunk was evicted; drop every resource held for it.
    fn release(&mut self, coord: ChunkCoord);
}

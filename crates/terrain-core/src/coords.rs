//! Chunk grid addressing.
//! A chunk of edge `n` samples spans `n - 1` world units, so neighbouring
//! chunks share their border row of samples.
use glam::{DVec2, Vec3};
use serde::{Deserialize, Serialize};

/// Integer coordinate of a chunk in chunk space (not world space).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub x: i32,
    pub z: i32,
}

impl ChunkCoord {
    pub const ORIGIN: ChunkCoord = ChunkCoord { x: 0, z: 0 };

    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chunk whose centre is nearest to `world_pos` (rounded, not floored:
    /// chunk meshes are centred on their coordinate).
    pub fn from_world_pos(world_pos: Vec3, chunk_stride: f32) -> Self {
        Self {
            x: (world_pos.x / chunk_stride).round() as i32,
            z: (world_pos.z / chunk_stride).round() as i32,
        }
    }

    /// Sample offset handed to the generators for this chunk.
    pub fn world_offset(&self, chunk_stride: f32) -> DVec2 {
        DVec2::new(self.x as f64 * chunk_stride as f64, self.z as f64 * chunk_stride as f64)
    }

    /// World-space centre of the chunk at ground level.
    pub fn world_center(&self, chunk_stride: f32) -> Vec3 {
        Vec3::new(self.x as f32 * chunk_stride, 0.0, self.z as f32 * chunk_stride)
    }

    pub fn offset(&self, dx: i32, dz: i32) -> Self {
        Self { x: self.x + dx, z: self.z + dz }
    }

    pub fn chebyshev_distance(&self, other: ChunkCoord) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }

    pub fn squared_distance(&self, other: ChunkCoord) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dz = (self.z - other.z) as i64;
        dx * dx + dz * dz
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_pos_rounds_to_nearest_chunk() {
        let stride = 240.0;
        assert_eq!(ChunkCoord::from_world_pos(Vec3::new(119.0, 5.0, -119.0), stride), ChunkCoord::ORIGIN);
        assert_eq!(ChunkCoord::from_world_pos(Vec3::new(121.0, 0.0, -121.0), stride), ChunkCoord::new(1, -1));
    }

    #[test]
    fn world_offset_is_coord_times_stride() {
        let off = ChunkCoord::new(-2, 3).world_offset(240.0);
        assert_eq!(off, DVec2::new(-480.0, 720.0));
    }

    #[test]
    fn distances() {
        let a = ChunkCoord::new(1, 1);
        let b = ChunkCoord::new(-2, 3);
        assert_eq!(a.chebyshev_distance(b), 3);
        assert_eq!(a.squared_distance(b), 13);
    }
}

use glam::Vec3;

use crate::coords::ChunkCoord;

/// World-space axis-aligned box around one chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl ChunkBounds {
    /// Box of a chunk centred on its coordinate, spanning `chunk_stride` in
    /// X/Z and `[low, high]` in Y.
    pub fn for_chunk(coord: ChunkCoord, chunk_stride: f32, (low, high): (f32, f32)) -> Self {
        let center = coord.world_center(chunk_stride);
        let half = chunk_stride / 2.0;
        Self {
            min: Vec3::new(center.x - half, low, center.z - half),
            max: Vec3::new(center.x + half, high, center.z + half),
        }
    }

    pub fn with_height_range(self, (low, high): (f32, f32)) -> Self {
        Self {
            min: Vec3::new(self.min.x, low, self.min.z),
            max: Vec3::new(self.max.x, high, self.max.z),
        }
    }

    /// Squared distance from `point` to the nearest point of the box; zero inside.
    pub fn sqr_distance(&self, point: Vec3) -> f32 {
        point.distance_squared(point.clamp(self.min, self.max))
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }
}

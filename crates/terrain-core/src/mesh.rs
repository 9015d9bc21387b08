//! Grid-mesh construction from height fields.
//!
//! Every `stride`-th sample becomes a vertex. The mesh is centered on the
//! chunk in X/Z, Y is `height × multiplier` and UVs run 0..1 across the
//! field. Each quad is split into two triangles wound counter-clockwise when
//! seen from +Y (right-handed, Y up).
use glam::Vec3;
use serde::Serialize;

use crate::error::{Result, TerrainError};
use crate::heightfield::HeightField;
use crate::pipeline::ChunkData;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MeshBuffer {
    pub positions: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    /// Empty unless built from [`ChunkData`].
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub stride: usize,
}

impl MeshBuffer {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertices along one side of the grid.
    pub fn vertices_per_line(&self) -> usize {
        (self.positions.len() as f64).sqrt().round() as usize
    }
}

/// Number of vertices per side at `stride`, or an error when the stride does
/// not tile a field of `edge` samples.
pub fn vertices_per_line(edge: usize, stride: usize) -> Result<usize> {
    if edge < 2 || stride == 0 || (edge - 1) % stride != 0 {
        return Err(TerrainError::InvalidStride { stride, edge });
    }
    Ok((edge - 1) / stride + 1)
}

pub fn build_mesh(field: &HeightField, height_multiplier: f32, stride: usize) -> Result<MeshBuffer> {
    if !field.is_square() {
        return Err(TerrainError::InvalidStride { stride, edge: field.width });
    }
    let edge = field.width;
    let vpl = vertices_per_line(edge, stride)?;
    let cells = (edge - 1) as f32;
    let half = cells / 2.0;

    let mut positions = Vec::with_capacity(vpl * vpl);
    let mut uvs = Vec::with_capacity(vpl * vpl);
    for z in (0..edge).step_by(stride) {
        for x in (0..edge).step_by(stride) {
            positions.push([x as f32 - half, field.get(z, x) * height_multiplier, z as f32 - half]);
            uvs.push([x as f32 / cells, z as f32 / cells]);
        }
    }

    let quads = (vpl - 1) * (vpl - 1);
    let mut indices = Vec::with_capacity(quads * 6);
    let line = vpl as u32;
    for gz in 0..vpl - 1 {
        for gx in 0..vpl - 1 {
            let v = (gz * vpl + gx) as u32;
            indices.extend_from_slice(&[v, v + line, v + 1]);
            indices.extend_from_slice(&[v + 1, v + line, v + line + 1]);
        }
    }

    Ok(MeshBuffer { positions, uvs, normals: Vec::new(), indices, stride })
}

/// [`build_mesh`] plus per-vertex normals taken from the chunk's gradient
/// field, rescaled for `height_multiplier`.
pub fn build_chunk_mesh(data: &ChunkData, height_multiplier: f32, stride: usize) -> Result<MeshBuffer> {
    let mut mesh = build_mesh(&data.heights, height_multiplier, stride)?;
    let edge = data.edge();
    mesh.normals.reserve(mesh.positions.len());
    for z in (0..edge).step_by(stride) {
        for x in (0..edge).step_by(stride) {
            let n = data.gradients.get(z, x);
            let scaled = Vec3::new(n.x * height_multiplier, n.y, n.z * height_multiplier).normalize_or_zero();
            let scaled = if scaled == Vec3::ZERO { Vec3::Y } else { scaled };
            mesh.normals.push(scaled.to_array());
        }
    }
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bumpy(edge: usize) -> HeightField {
        let mut hf = HeightField::square(edge);
        for z in 0..edge {
            for x in 0..edge {
                hf.set(z, x, ((x * 7 + z * 3) % 11) as f32 / 10.0);
            }
        }
        hf
    }

    #[test]
    fn stride_one_uses_every_sample() {
        let mesh = build_mesh(&bumpy(241), 1.0, 1).unwrap();
        assert_eq!(mesh.vertex_count(), 241 * 241);
        assert_eq!(mesh.triangle_count(), 2 * 240 * 240);
        assert_eq!(mesh.vertices_per_line(), 241);
    }

    #[test]
    fn coarser_lods_use_fewer_vertices() {
        let field = bumpy(241);
        let mut previous = usize::MAX;
        for stride in [1, 2, 4, 6, 8, 10, 12] {
            let mesh = build_mesh(&field, 1.0, stride).unwrap();
            assert!(mesh.vertex_count() < previous, "stride {stride}");
            assert_eq!(mesh.vertices_per_line(), 240 / stride + 1);
            assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertex_count()));
            previous = mesh.vertex_count();
        }
    }

    #[test]
    fn centered_positions_and_unit_uvs() {
        let mesh = build_mesh(&bumpy(5), 2.0, 2).unwrap();
        assert_eq!(mesh.positions[0][0], -2.0);
        assert_eq!(mesh.positions[0][2], -2.0);
        assert_eq!(mesh.positions[8][0], 2.0);
        assert_eq!(mesh.positions[8][2], 2.0);
        assert_eq!(mesh.uvs[0], [0.0, 0.0]);
        assert_eq!(mesh.uvs[8], [1.0, 1.0]);
        let field = bumpy(5);
        assert_relative_eq!(mesh.positions[4][1], field.get(2, 2) * 2.0);
    }

    #[test]
    fn triangles_face_up_on_flat_ground() {
        let mesh = build_mesh(&HeightField::square(9), 1.0, 2).unwrap();
        for tri in mesh.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from_array(mesh.positions[i as usize]));
            let n = (b - a).cross(c - a);
            assert!(n.y > 0.0, "triangle {tri:?} faces down");
        }
    }

    #[test]
    fn rejects_strides_that_do_not_tile() {
        let field = bumpy(241);
        for stride in [0, 7, 241] {
            assert!(matches!(build_mesh(&field, 1.0, stride), Err(TerrainError::InvalidStride { .. })));
        }
    }

    #[test]
    fn chunk_mesh_carries_normals() {
        let data = ChunkData::new(bumpy(9));
        let mesh = build_chunk_mesh(&data, 1.0, 4).unwrap();
        assert_eq!(mesh.normals.len(), mesh.positions.len());
        for n in &mesh.normals {
            assert_relative_eq!(Vec3::from_array(*n).length(), 1.0, epsilon = 1e-5);
        }
        let flat = build_chunk_mesh(&data, 0.0, 4).unwrap();
        for n in &flat.normals {
            assert_eq!((n[0], n[2]), (0.0, 0.0));
            assert_relative_eq!(n[1], 1.0, epsilon = 1e-6);
        }
    }
}

//! Per-cell surface normals from central differences.
//!
//! Interior cells use `h[i+1] − h[i−1]`. Border cells have one neighbour
//! only and use the one-sided difference doubled, so every cell measures
//! rise over the same two-cell run.
use glam::Vec3;

use crate::heightfield::HeightField;

#[derive(Debug, Clone, PartialEq)]
pub struct GradientField {
    pub width: usize,
    pub height: usize,
    /// Unit normals, row-major, Y up.
    pub normals: Vec<Vec3>,
}

impl GradientField {
    pub fn from_heights(hf: &HeightField) -> Self {
        let (w, h) = (hf.width, hf.height);
        let mut normals = Vec::with_capacity(w * h);
        for z in 0..h {
            for x in 0..w {
                let dx = central_difference(x, w, |i| hf.get(z, i));
                let dz = central_difference(z, h, |i| hf.get(i, x));
                normals.push(Vec3::new(-dx, 2.0, -dz).normalize());
            }
        }
        Self { width: w, height: h, normals }
    }

    #[inline]
    pub fn get(&self, z: usize, x: usize) -> Vec3 {
        self.normals[z * self.width + x]
    }
}

/// Two-cell difference along one axis at index `i` of `len` samples.
fn central_difference(i: usize, len: usize, at: impl Fn(usize) -> f32) -> f32 {
    if len < 2 {
        0.0
    } else if i == 0 {
        2.0 * (at(1) - at(0))
    } else if i == len - 1 {
        2.0 * (at(i) - at(i - 1))
    } else {
        at(i + 1) - at(i - 1)
    }
}

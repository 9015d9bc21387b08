use serde::{Deserialize, Serialize};

/// A 2D scalar field stored row-major: `data[z * width + x]`.
/// One field per generation layer per chunk; layers are later combined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightField {
    pub data: Vec<f32>,
    pub width: usize,
    pub height: usize,
}

/// `(v − lo) / (hi − lo)` on `[0, 1]`.
///
/// A result outside `[0, 1]` means the caller's bounds were wrong: debug
/// builds panic, release builds clamp. A degenerate range or a non-finite
/// result (overflowed input) maps to 0.
pub(crate) fn unit_interval(v: f64, lo: f64, hi: f64) -> f32 {
    let range = hi - lo;
    if !(range > 0.0) {
        return 0.0;
    }
    let t = (v - lo) / range;
    if !t.is_finite() {
        return 0.0;
    }
    debug_assert!(
        (-1e-4..=1.0 + 1e-4).contains(&t),
        "normalized value {t} outside [0, 1] (raw {v}, range [{lo}, {hi}])"
    );
    t.clamp(0.0, 1.0) as f32
}

impl HeightField {
    /// Create a new HeightField filled with the given value.
    pub fn new(width: usize, height: usize, fill: f32) -> Self {
        Self { data: vec![fill; width * height], width, height }
    }

    /// Create a square zero-filled field, the shape every chunk layer uses.
    pub fn square(edge: usize) -> Self {
        Self::new(edge, edge, 0.0)
    }

    #[inline]
    pub fn get(&self, z: usize, x: usize) -> f32 {
        self.data[z * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, z: usize, x: usize, val: f32) {
        self.data[z * self.width + x] = val;
    }

    pub fn is_square(&self) -> bool {
        self.width == self.height
    }

    pub fn min_value(&self) -> f32 {
        self.data.iter().cloned().fold(f32::INFINITY, f32::min)
    }

    pub fn max_value(&self) -> f32 {
        self.data.iter().cloned().fold(f32::NEG_INFINITY, f32::max)
    }

    /// Remap every cell from `[lo, hi]` onto `[0, 1]`. A degenerate range
    /// (`hi <= lo`) produces an all-zero field.
    pub fn normalize_between(&mut self, lo: f32, hi: f32) {
        if !(hi - lo > f32::EPSILON) {
            self.data.iter_mut().for_each(|v| *v = 0.0);
            return;
        }
        for v in &mut self.data {
            *v = unit_interval(*v as f64, lo as f64, hi as f64);
        }
    }

    /// Remap against the field's own observed extremes.
    pub fn normalize_observed(&mut self) {
        let (lo, hi) = (self.min_value(), self.max_value());
        self.normalize_between(lo, hi);
    }
}

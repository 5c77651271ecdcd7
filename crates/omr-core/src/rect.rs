use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Fixed pixel size of the rectified (canonical) sheet view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalSize {
    pub width: usize,
    pub height: usize,
}

impl CanonicalSize {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Corners of the canonical frame in TL, TR, BR, BL order.
    pub fn corners(&self) -> [Point2<f32>; 4] {
        let w = self.width as f32;
        let h = self.height as f32;
        [
            Point2::new(0.0, 0.0),
            Point2::new(w, 0.0),
            Point2::new(w, h),
            Point2::new(0.0, h),
        ]
    }

    /// `min(w, h) / max(w, h)`, independent of portrait/landscape.
    pub fn aspect(&self) -> f32 {
        let (w, h) = (self.width as f32, self.height as f32);
        w.min(h) / w.max(h).max(1.0)
    }

    pub fn contains(&self, rect: &MarkRect) -> bool {
        rect.x >= 0.0
            && rect.y >= 0.0
            && rect.x + rect.w <= self.width as f32
            && rect.y + rect.h <= self.height as f32
    }
}

/// Axis-aligned rectangle in canonical pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl MarkRect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn center(&self) -> Point2<f32> {
        Point2::new(self.x + 0.5 * self.w, self.y + 0.5 * self.h)
    }

    /// Shrink (positive `frac`) or grow (negative) by `frac` of each side.
    pub fn inset(&self, frac: f32) -> MarkRect {
        let dx = self.w * frac;
        let dy = self.h * frac;
        MarkRect {
            x: self.x + dx,
            y: self.y + dy,
            w: (self.w - 2.0 * dx).max(0.0),
            h: (self.h - 2.0 * dy).max(0.0),
        }
    }

    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.w, self.h].iter().all(|v| v.is_finite()) && self.w > 0.0 && self.h > 0.0
    }

    pub fn intersects(&self, other: &MarkRect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }

    /// `n × n` sample positions at the centres of a regular sub-grid.
    pub fn grid_points(&self, n: usize) -> impl Iterator<Item = Point2<f32>> + '_ {
        let n = n.max(1);
        let step_x = self.w / n as f32;
        let step_y = self.h / n as f32;
        (0..n).flat_map(move |j| {
            (0..n).map(move |i| {
                Point2::new(
                    self.x + (i as f32 + 0.5) * step_x,
                    self.y + (j as f32 + 0.5) * step_y,
                )
            })
        })
    }
}

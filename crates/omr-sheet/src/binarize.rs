//! Local-mean binarization and box downsampling.

use omr_core::{GrayImage, GrayImageView};

/// Summed-area table with a zero first row/column, `(w+1) x (h+1)` entries.
pub(crate) struct IntegralImage {
    stride: usize,
    width: usize,
    height: usize,
    table: Vec<u64>,
}

impl IntegralImage {
    pub(crate) fn new(src: &GrayImageView<'_>) -> Self {
        let stride = src.width + 1;
        let mut table = vec![0u64; stride * (src.height + 1)];
        for y in 0..src.height {
            let mut row_sum = 0u64;
            let row = &src.data[y * src.width..(y + 1) * src.width];
            for (x, &v) in row.iter().enumerate() {
                row_sum += v as u64;
                table[(y + 1) * stride + x + 1] = row_sum + table[y * stride + x + 1];
            }
        }
        Self {
            stride,
            width: src.width,
            height: src.height,
            table,
        }
    }

    /// Mean over the square window of `radius` around `(cx, cy)`, clipped to
    /// the image.
    pub(crate) fn window_mean(&self, cx: usize, cy: usize, radius: usize) -> f32 {
        let x1 = cx.saturating_sub(radius);
        let y1 = cy.saturating_sub(radius);
        let x2 = (cx + radius + 1).min(self.width);
        let y2 = (cy + radius + 1).min(self.height);
        let area = (x2 - x1) * (y2 - y1);
        if area == 0 {
            return 0.0;
        }
        let s = self.stride;
        let sum = self.table[y2 * s + x2] + self.table[y1 * s + x1]
            - self.table[y1 * s + x2]
            - self.table[y2 * s + x1];
        sum as f32 / area as f32
    }
}

/// Foreground mask: `true` where a pixel is darker than its local mean by
/// more than `offset` grey levels.
///
/// Tolerates slow illumination gradients; flat regions of any brightness
/// stay background.
pub fn adaptive_threshold(src: &GrayImageView<'_>, radius: usize, offset: f32) -> Vec<bool> {
    let integral = IntegralImage::new(src);
    let mut mask = vec![false; src.width * src.height];
    for y in 0..src.height {
        for x in 0..src.width {
            let idx = y * src.width + x;
            let mean = integral.window_mean(x, y, radius);
            mask[idx] = (src.data[idx] as f32) < mean - offset;
        }
    }
    mask
}

/// Average `factor x factor` blocks; trailing partial blocks are dropped.
pub fn downsample_box(src: &GrayImageView<'_>, factor: usize) -> GrayImage {
    let factor = factor.max(1);
    let w = (src.width / factor).max(1);
    let h = (src.height / factor).max(1);
    let mut out = GrayImage::filled(w, h, 0);
    for oy in 0..h {
        for ox in 0..w {
            let mut acc = 0u32;
            let mut n = 0u32;
            for y in (oy * factor)..((oy + 1) * factor).min(src.height) {
                for x in (ox * factor)..((ox + 1) * factor).min(src.width) {
                    acc += src.data[y * src.width + x] as u32;
                    n += 1;
                }
            }
            if n > 0 {
                out.put(ox, oy, ((acc + n / 2) / n) as u8);
            }
        }
    }
    out
}

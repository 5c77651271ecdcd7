//! 8-connected component labelling of a binary mask.

use nalgebra::Point2;

/// Summary of one connected foreground region.
#[derive(Clone, Debug)]
pub struct Component {
    pub pixels: usize,
    /// Inclusive bounding box `[x0, y0, x1, y1]`.
    pub bbox: [usize; 4],
    /// Leftmost and rightmost pixel per covered row, `(y, x_min, x_max)`.
    pub row_extents: Vec<(usize, usize, usize)>,
}

impl Component {
    pub fn bbox_width(&self) -> usize {
        self.bbox[2] - self.bbox[0] + 1
    }

    pub fn bbox_height(&self) -> usize {
        self.bbox[3] - self.bbox[1] + 1
    }

    pub fn bbox_area(&self) -> usize {
        self.bbox_width() * self.bbox_height()
    }

    /// Outer pixel corners of every row extent.
    ///
    /// Their convex hull equals the hull of the whole region, which is all the
    /// quad fitter needs.
    pub fn extreme_points(&self) -> Vec<Point2<f32>> {
        let mut pts = Vec::with_capacity(self.row_extents.len() * 4);
        for &(y, x0, x1) in &self.row_extents {
            let (top, bottom) = (y as f32, y as f32 + 1.0);
            pts.push(Point2::new(x0 as f32, top));
            pts.push(Point2::new(x0 as f32, bottom));
            pts.push(Point2::new(x1 as f32 + 1.0, top));
            pts.push(Point2::new(x1 as f32 + 1.0, bottom));
        }
        pts
    }
}

/// Label all regions with at least `min_pixels` pixels.
pub fn connected_components(
    mask: &[bool],
    width: usize,
    height: usize,
    min_pixels: usize,
) -> Vec<Component> {
    let mut visited = vec![false; mask.len()];
    let mut stack: Vec<usize> = Vec::new();
    let mut out = Vec::new();
    // Scratch for per-row extents, indexed by y; reset after each region.
    let mut rows: Vec<Option<(usize, usize)>> = vec![None; height];
    let mut touched_rows: Vec<usize> = Vec::new();

    for seed in 0..mask.len() {
        if !mask[seed] || visited[seed] {
            continue;
        }
        visited[seed] = true;
        stack.push(seed);
        let mut pixels = 0usize;
        let mut bbox = [usize::MAX, usize::MAX, 0, 0];

        while let Some(idx) = stack.pop() {
            let x = idx % width;
            let y = idx / width;
            pixels += 1;
            bbox[0] = bbox[0].min(x);
            bbox[1] = bbox[1].min(y);
            bbox[2] = bbox[2].max(x);
            bbox[3] = bbox[3].max(y);
            let extent = rows[y].get_or_insert_with(|| {
                touched_rows.push(y);
                (x, x)
            });
            extent.0 = extent.0.min(x);
            extent.1 = extent.1.max(x);

            let y_lo = y.saturating_sub(1);
            let y_hi = (y + 1).min(height - 1);
            let x_lo = x.saturating_sub(1);
            let x_hi = (x + 1).min(width - 1);
            for ny in y_lo..=y_hi {
                for nx in x_lo..=x_hi {
                    let n = ny * width + nx;
                    if mask[n] && !visited[n] {
                        visited[n] = true;
                        stack.push(n);
                    }
                }
            }
        }

        touched_rows.sort_unstable();
        let row_extents = touched_rows
            .iter()
            .filter_map(|&y| rows[y].take().map(|(lo, hi)| (y, lo, hi)))
            .collect();
        touched_rows.clear();

        if pixels >= min_pixels {
            out.push(Component {
                pixels,
                bbox,
                row_extents,
            });
        }
    }
    out
}

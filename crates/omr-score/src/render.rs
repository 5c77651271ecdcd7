//! Synthetic answer sheets.
//!
//! Draws a printable canonical sheet for a layout version with chosen marks
//! and projects it into a simulated photograph. Used for fixtures, benches
//! and demos; nothing in the grading path depends on it.

use crate::layout::{LayoutError, LayoutSpec, SheetVersion};
use nalgebra::Point2;
use omr_core::{homography_from_4pt, sample_point, GrayImage, MarkRect};
use serde::{Deserialize, Serialize};

/// One pencil mark on a bubble.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PencilMark {
    pub question: u32,
    pub option: u8,
    /// Grey level of the mark; lighter values simulate faint pencil.
    pub ink: u8,
}

impl PencilMark {
    pub fn new(question: u32, option: u8) -> Self {
        Self {
            question,
            option,
            ink: 30,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub paper: u8,
    pub ink: u8,
    /// Printed bubble outline radius as a fraction of the smaller pitch.
    pub bubble_radius_frac: f32,
    pub outline_width: f32,
    /// Pencil mark radius relative to the printed outline radius.
    pub mark_radius_frac: f32,
    /// Print the version marks with the rendered version filled.
    pub print_version_marks: bool,
    /// Print the orientation marker.
    pub print_orientation_marker: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            paper: 240,
            ink: 20,
            bubble_radius_frac: 0.36,
            outline_width: 2.0,
            mark_radius_frac: 0.9,
            print_version_marks: true,
            print_orientation_marker: true,
        }
    }
}

/// Render the canonical view of `version` with `marks` pencilled in.
pub fn render_sheet(
    spec: &LayoutSpec,
    version: &SheetVersion,
    marks: &[PencilMark],
    opts: &RenderOptions,
) -> Result<GrayImage, LayoutError> {
    let model = spec.model(version)?;
    let size = spec.canonical;
    let mut img = GrayImage::filled(size.width, size.height, opts.paper);

    let t = spec.frame_thickness.max(0.0);
    let (w, h) = (size.width as f32, size.height as f32);
    for band in [
        MarkRect::new(0.0, 0.0, w, t),
        MarkRect::new(0.0, h - t, w, t),
        MarkRect::new(0.0, 0.0, t, h),
        MarkRect::new(w - t, 0.0, t, h),
    ] {
        fill_rect(&mut img, &band, opts.ink);
    }
    if opts.print_orientation_marker {
        fill_rect(&mut img, &spec.orientation_marker, opts.ink);
    }
    if opts.print_version_marks {
        for m in &spec.version_marks {
            if &m.version == version {
                fill_rect(&mut img, &m.rect, opts.ink);
            } else {
                outline_rect(&mut img, &m.rect, opts.outline_width, opts.ink);
            }
        }
    }

    for slot in &model.slots {
        for region in &slot.options {
            let r = opts.bubble_radius_frac * 2.0 * region.clearance;
            draw_annulus(&mut img, region.center, r - opts.outline_width, r, opts.ink);
        }
    }
    for mark in marks {
        let Some(region) = model
            .slot(mark.question)
            .and_then(|s| s.options.get(mark.option as usize))
        else {
            continue;
        };
        let r = opts.bubble_radius_frac * 2.0 * region.clearance * opts.mark_radius_frac;
        draw_annulus(&mut img, region.center, 0.0, r, mark.ink);
    }
    Ok(img)
}

/// Simulated capture conditions for [`photograph`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoOptions {
    /// Table surface grey level.
    pub background: u8,
    /// Relative brightness drop from left to right edge (uneven lighting).
    pub shading: f32,
}

impl Default for PhotoOptions {
    fn default() -> Self {
        Self {
            background: 200,
            shading: 0.1,
        }
    }
}

/// Project a canonical sheet into a `width x height` photograph so that its
/// canonical TL, TR, BR, BL corners land on `corners`.
///
/// Returns `None` when the corners do not define a projective mapping.
pub fn photograph(
    sheet: &GrayImage,
    corners: [Point2<f32>; 4],
    width: usize,
    height: usize,
    opts: &PhotoOptions,
) -> Option<GrayImage> {
    let src = [
        Point2::new(0.0, 0.0),
        Point2::new(sheet.width as f32, 0.0),
        Point2::new(sheet.width as f32, sheet.height as f32),
        Point2::new(0.0, sheet.height as f32),
    ];
    let h_sheet_from_photo = homography_from_4pt(&corners, &src)?;
    let view = sheet.view();
    let (sw, sh) = (sheet.width as f32, sheet.height as f32);

    let mut out = GrayImage::filled(width, height, opts.background);
    for y in 0..height {
        for x in 0..width {
            let shade = 1.0 - opts.shading * x as f32 / width.max(1) as f32;
            let p = Point2::new(x as f32 + 0.5, y as f32 + 0.5);
            let value = match h_sheet_from_photo.try_apply(p) {
                Some(q) if q.x >= 0.0 && q.y >= 0.0 && q.x < sw && q.y < sh => sample_point(&view, q),
                _ => opts.background as f32,
            };
            out.put(x, y, (value * shade).round().clamp(0.0, 255.0) as u8);
        }
    }
    Some(out)
}

/// A hand-held looking placement of a `sheet_width x sheet_height` sheet,
/// turned clockwise by `quarter_turns` on the table.
///
/// Returns the image positions of the canonical TL, TR, BR, BL corners
/// followed by the photograph size.
pub fn tilted_placement(
    sheet_width: usize,
    sheet_height: usize,
    quarter_turns: usize,
) -> ([Point2<f32>; 4], usize, usize) {
    let mut w = (sheet_width as f32 * 1.25).round();
    let mut h = (sheet_height as f32 * 1.2).round();
    let mut corners = [
        Point2::new(0.10 * w, 0.07 * h),
        Point2::new(0.92 * w, 0.09 * h),
        Point2::new(0.89 * w, 0.95 * h),
        Point2::new(0.06 * w, 0.93 * h),
    ];
    for _ in 0..quarter_turns % 4 {
        for c in &mut corners {
            *c = Point2::new(h - c.y, c.x);
        }
        std::mem::swap(&mut w, &mut h);
    }
    (corners, w as usize, h as usize)
}

/// The sheet scaled by `scale` and turned clockwise by `degrees` about the
/// centre of a square photograph with some table showing around it.
///
/// Returns the image positions of the canonical TL, TR, BR, BL corners
/// followed by the photograph size.
pub fn rotated_placement(
    sheet_width: usize,
    sheet_height: usize,
    degrees: f32,
    scale: f32,
) -> ([Point2<f32>; 4], usize, usize) {
    let hw = 0.5 * scale * sheet_width as f32;
    let hh = 0.5 * scale * sheet_height as f32;
    let size = (2.3 * hw.hypot(hh)).ceil() as usize;
    let mid = 0.5 * size as f32;
    let (sin, cos) = degrees.to_radians().sin_cos();
    let corners = [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)]
        .map(|(x, y)| Point2::new(mid + cos * x - sin * y, mid + sin * x + cos * y));
    (corners, size, size)
}

fn fill_rect(img: &mut GrayImage, rect: &MarkRect, value: u8) {
    let x0 = rect.x.max(0.0).round() as usize;
    let y0 = rect.y.max(0.0).round() as usize;
    let x1 = ((rect.x + rect.w).round().max(0.0) as usize).min(img.width);
    let y1 = ((rect.y + rect.h).round().max(0.0) as usize).min(img.height);
    for y in y0..y1 {
        for x in x0..x1 {
            img.put(x, y, value);
        }
    }
}

fn outline_rect(img: &mut GrayImage, rect: &MarkRect, width: f32, value: u8) {
    let w = width.min(0.5 * rect.w).min(0.5 * rect.h);
    for band in [
        MarkRect::new(rect.x, rect.y, rect.w, w),
        MarkRect::new(rect.x, rect.y + rect.h - w, rect.w, w),
        MarkRect::new(rect.x, rect.y, w, rect.h),
        MarkRect::new(rect.x + rect.w - w, rect.y, w, rect.h),
    ] {
        fill_rect(img, &band, value);
    }
}

/// Pixels whose centre lies at distance `[inner, outer]` from `c`.
pub(crate) fn draw_annulus(img: &mut GrayImage, c: Point2<f32>, inner: f32, outer: f32, value: u8) {
    let x0 = (c.x - outer).floor().max(0.0) as usize;
    let y0 = (c.y - outer).floor().max(0.0) as usize;
    let x1 = ((c.x + outer).ceil().max(0.0) as usize).min(img.width);
    let y1 = ((c.y + outer).ceil().max(0.0) as usize).min(img.height);
    for y in y0..y1 {
        for x in x0..x1 {
            let d = (Point2::new(x as f32 + 0.5, y as f32 + 0.5) - c).norm();
            if d >= inner && d <= outer {
                img.put(x, y, value);
            }
        }
    }
}

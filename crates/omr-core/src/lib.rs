//! Core types for answer-sheet grading.
//!
//! Grayscale buffers, bilinear sampling, quadrilateral geometry and the
//! four-point homography used to map a photographed sheet onto its canonical
//! frame. Nothing here knows about bubbles or answer keys.

mod homography;
mod image;
mod logger;
mod quad;
mod rect;
mod rotation;

pub use homography::{
    homography_from_4pt, warp_perspective_gray, warp_perspective_gray_filled, Homography,
};
pub use image::{
    sample_bilinear, sample_bilinear_clamped, sample_bilinear_u8, sample_point, GrayImage,
    GrayImageView, ImageError, PixelFormat, RawImage,
};
pub use quad::{
    approx_polygon, convex_hull, fit_quad, order_corners, polygon_perimeter, polygon_signed_area,
    quad_cost, Quad, QuadError, QuadFitError, QuadFitParams,
};
pub use rect::{CanonicalSize, MarkRect};
pub use rotation::CornerRotation;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;
pub use logger::{default_directive, init_with_level, parse_level};

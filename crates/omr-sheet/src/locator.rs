use crate::binarize::{adaptive_threshold, downsample_box};
use crate::components::{connected_components, Component};
use log::debug;
use nalgebra::Point2;
use omr_core::{fit_quad, CanonicalSize, GrayImageView, Quad, QuadError, QuadFitError, QuadFitParams};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Tuning knobs for [`SheetLocator`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorParams {
    /// Smallest accepted photograph (orientation-agnostic).
    pub min_image_width: usize,
    pub min_image_height: usize,
    /// Larger photographs are box-downsampled until their long side fits.
    pub max_working_side: usize,
    /// Half-size of the local-mean window, in working pixels.
    pub threshold_radius: usize,
    /// Grey levels below the local mean for a pixel to count as ink.
    pub threshold_offset: f32,
    /// Allowed deviation of the candidate's bounding-box aspect
    /// (`short / long`) from the canonical sheet aspect.
    pub aspect_tolerance: f32,
    /// Bounding-box area of a candidate as a fraction of the image.
    pub min_area_frac: f32,
    pub max_area_frac: f32,
    /// Regions with fewer pixels are ignored outright.
    pub min_region_pixels: usize,
    /// Minimum quad area as a fraction of the image.
    pub min_quad_area_frac: f32,
    /// Smallest corner triangle relative to the quad area.
    pub min_corner_triangle_ratio: f32,
    pub quad_fit: QuadFitParams,
}

impl Default for LocatorParams {
    fn default() -> Self {
        Self {
            min_image_width: 400,
            min_image_height: 300,
            max_working_side: 1600,
            threshold_radius: 15,
            threshold_offset: 10.0,
            aspect_tolerance: 0.25,
            min_area_frac: 0.2,
            max_area_frac: 0.98,
            min_region_pixels: 500,
            min_quad_area_frac: 0.1,
            min_corner_triangle_ratio: 0.05,
            quad_fit: QuadFitParams::default(),
        }
    }
}

/// Why a sheet could not be located.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LocateError {
    #[error("image {width}x{height} is below the minimum {min_width}x{min_height}")]
    ImageTooSmall {
        width: usize,
        height: usize,
        min_width: usize,
        min_height: usize,
    },
    #[error("no sheet-like region among {regions} candidate regions")]
    NoSheetRegion { regions: usize },
    #[error("sheet outline could not be reduced to four corners: {0}")]
    ApproximationFailed(#[from] QuadFitError),
    #[error("sheet outline is degenerate: {0}")]
    Degenerate(#[from] QuadError),
}

impl LocateError {
    /// Stable fine-grained reason, finer than the pipeline-level code.
    pub fn reason_code(&self) -> &'static str {
        match self {
            LocateError::ImageTooSmall { .. } => "image-too-small",
            LocateError::NoSheetRegion { .. } => "no-sheet-region",
            LocateError::ApproximationFailed(_) => "quad-approximation-failed",
            LocateError::Degenerate(_) => "quad-degenerate",
        }
    }
}

/// A located sheet outline in raw-image pixels.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SheetLocation {
    pub quad: Quad,
    /// Pixels in the chosen region (working resolution).
    pub region_pixels: usize,
    /// Bounding-box area of the chosen region relative to the image.
    pub region_area_frac: f32,
    /// Downsampling factor the search ran at.
    pub scale: usize,
}

/// Finds the sheet boundary in a photograph.
#[derive(Clone, Debug)]
pub struct SheetLocator {
    params: LocatorParams,
    expected_aspect: f32,
}

impl SheetLocator {
    pub fn new(canonical: CanonicalSize, params: LocatorParams) -> Self {
        Self {
            params,
            expected_aspect: canonical.aspect(),
        }
    }

    pub fn params(&self) -> &LocatorParams {
        &self.params
    }

    /// Binarize, pick the largest plausible region and fit its outline.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(width = gray.width, height = gray.height))
    )]
    pub fn locate(&self, gray: &GrayImageView<'_>) -> Result<SheetLocation, LocateError> {
        let p = &self.params;
        let (long, short) = (gray.width.max(gray.height), gray.width.min(gray.height));
        let (min_long, min_short) = (
            p.min_image_width.max(p.min_image_height),
            p.min_image_width.min(p.min_image_height),
        );
        if long < min_long || short < min_short {
            return Err(LocateError::ImageTooSmall {
                width: gray.width,
                height: gray.height,
                min_width: p.min_image_width,
                min_height: p.min_image_height,
            });
        }

        let scale = if p.max_working_side > 0 {
            long.div_ceil(p.max_working_side).max(1)
        } else {
            1
        };
        let small;
        let work = if scale > 1 {
            small = downsample_box(gray, scale);
            small.view()
        } else {
            *gray
        };

        let mask = adaptive_threshold(&work, p.threshold_radius, p.threshold_offset);
        let regions = connected_components(&mask, work.width, work.height, p.min_region_pixels);
        debug!(
            "locator: {} regions of >= {} px at scale 1/{}",
            regions.len(),
            p.min_region_pixels,
            scale
        );

        let image_area = (work.width * work.height) as f32;
        let best = regions
            .iter()
            .filter(|c| self.is_plausible(c, image_area))
            .max_by_key(|c| c.bbox_area())
            .ok_or(LocateError::NoSheetRegion {
                regions: regions.len(),
            })?;

        let outline = best.extreme_points();
        let quad = fit_quad(&outline, &p.quad_fit)?;
        quad.validate(image_area, p.min_quad_area_frac, p.min_corner_triangle_ratio)?;

        let s = scale as f32;
        let quad = Quad {
            corners: quad.corners.map(|c| Point2::new(c.x * s, c.y * s)),
        };
        debug!("locator: quad {:?}", quad.corners);

        Ok(SheetLocation {
            quad,
            region_pixels: best.pixels,
            region_area_frac: best.bbox_area() as f32 / image_area,
            scale,
        })
    }

    fn is_plausible(&self, c: &Component, image_area: f32) -> bool {
        let p = &self.params;
        let area_frac = c.bbox_area() as f32 / image_area;
        if area_frac < p.min_area_frac || area_frac > p.max_area_frac {
            return false;
        }
        let (w, h) = (c.bbox_width() as f32, c.bbox_height() as f32);
        let aspect = w.min(h) / w.max(h);
        (aspect - self.expected_aspect).abs() <= p.aspect_tolerance
    }
}

use log::debug;
use nalgebra::Point2;
use omr_core::{
    homography_from_4pt, sample_point, warp_perspective_gray_filled, CanonicalSize, CornerRotation,
    GrayImage, GrayImageView, Homography, MarkRect, Quad,
};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// How the printed orientation marker is sampled.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationParams {
    /// Fraction of the marker side shaved off before sampling its interior.
    pub marker_inset: f32,
    /// Reference band: the marker grown by this fraction per side, minus
    /// the marker itself.
    pub band_grow: f32,
    /// Samples per side of the marker interior grid.
    pub samples: usize,
    /// Grey-level contrast (band minus marker) required to accept a rotation.
    pub min_contrast: f32,
    /// Required lead of the best rotation over the runner-up.
    pub min_margin: f32,
    /// Value written where the canonical view falls outside the photograph.
    pub border_value: u8,
}

impl Default for OrientationParams {
    fn default() -> Self {
        Self {
            marker_inset: 0.2,
            band_grow: 0.5,
            samples: 7,
            min_contrast: 40.0,
            min_margin: 30.0,
            border_value: 255,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RectifyError {
    #[error("orientation marker not resolvable (best contrast {best:.1}, runner-up {runner_up:.1})")]
    OrientationAmbiguous { best: f32, runner_up: f32 },
    #[error("sheet quadrilateral does not define a valid projective mapping")]
    DegenerateMapping,
}

/// Winning corner assignment and the evidence for it.
#[derive(Clone, Copy, Debug)]
pub struct OrientationEstimate {
    pub rotation: CornerRotation,
    pub contrast: f32,
    pub runner_up: f32,
    /// Canonical -> raw mapping under `rotation`.
    pub h_raw_from_canonical: Homography,
}

/// Rectified, fixed-size top-down view of a sheet.
#[derive(Clone, Debug)]
pub struct CanonicalImage {
    pub image: GrayImage,
    pub rotation: CornerRotation,
    pub marker_contrast: f32,
    pub h_raw_from_canonical: Homography,
}

impl CanonicalImage {
    /// Wrap an already top-down image (e.g. a scanner output).
    pub fn from_aligned(image: GrayImage) -> Self {
        Self {
            image,
            rotation: CornerRotation::Deg0,
            marker_contrast: 0.0,
            h_raw_from_canonical: Homography::new(nalgebra::Matrix3::identity()),
        }
    }

    #[inline]
    pub fn view(&self) -> GrayImageView<'_> {
        self.image.view()
    }
}

/// Maps a located quadrilateral onto the canonical frame.
#[derive(Clone, Debug)]
pub struct Rectifier {
    canonical: CanonicalSize,
    marker: MarkRect,
    params: OrientationParams,
}

impl Rectifier {
    pub fn new(canonical: CanonicalSize, marker: MarkRect, params: OrientationParams) -> Self {
        Self {
            canonical,
            marker,
            params,
        }
    }

    pub fn canonical(&self) -> CanonicalSize {
        self.canonical
    }

    /// Dark-minus-surround contrast of the marker under one corner assignment.
    pub fn marker_contrast(&self, gray: &GrayImageView<'_>, h_raw_from_canonical: &Homography) -> f32 {
        let p = &self.params;
        let n = p.samples.max(1);
        let inner = self.marker.inset(p.marker_inset);
        let outer = self.marker.inset(-p.band_grow);
        let marker = &self.marker;

        let mean_of = |pts: &mut dyn Iterator<Item = Point2<f32>>| -> Option<f32> {
            let mut acc = 0.0f32;
            let mut count = 0usize;
            for q in pts {
                let raw = h_raw_from_canonical.try_apply(q)?;
                acc += sample_point(gray, raw);
                count += 1;
            }
            (count > 0).then(|| acc / count as f32)
        };

        let dark = mean_of(&mut inner.grid_points(n));
        let mut band = outer.grid_points(2 * n + 1).filter(|q| {
            q.x < marker.x || q.y < marker.y || q.x > marker.x + marker.w || q.y > marker.y + marker.h
        });
        let light = mean_of(&mut band);
        match (dark, light) {
            (Some(d), Some(l)) => l - d,
            _ => f32::NEG_INFINITY,
        }
    }

    /// Try all four corner assignments and keep the one that puts the marker
    /// where the layout expects it.
    pub fn resolve_orientation(
        &self,
        gray: &GrayImageView<'_>,
        quad: &Quad,
    ) -> Result<OrientationEstimate, RectifyError> {
        let dst_canonical = self.canonical.corners();
        let mut scored: Vec<(f32, CornerRotation, Homography)> = Vec::with_capacity(4);
        for rotation in CornerRotation::ALL {
            let raw_corners = rotation.apply(&quad.corners);
            let Some(h) = homography_from_4pt(&dst_canonical, &raw_corners) else {
                continue;
            };
            let contrast = self.marker_contrast(gray, &h);
            debug!("orientation {}deg: marker contrast {:.1}", rotation.degrees(), contrast);
            scored.push((contrast, rotation, h));
        }
        if scored.is_empty() {
            return Err(RectifyError::DegenerateMapping);
        }
        // stable: ties keep the lower rotation
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        let (best, rotation, h) = scored[0];
        let runner_up = scored.get(1).map(|s| s.0).unwrap_or(f32::NEG_INFINITY);

        if !best.is_finite()
            || best < self.params.min_contrast
            || best - runner_up < self.params.min_margin
        {
            return Err(RectifyError::OrientationAmbiguous {
                best: finite_or_zero(best),
                runner_up: finite_or_zero(runner_up),
            });
        }
        Ok(OrientationEstimate {
            rotation,
            contrast: best,
            runner_up,
            h_raw_from_canonical: h,
        })
    }

    /// Resolve orientation and resample the sheet into the canonical frame.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
    pub fn rectify(&self, gray: &GrayImageView<'_>, quad: &Quad) -> Result<CanonicalImage, RectifyError> {
        let est = self.resolve_orientation(gray, quad)?;
        Ok(self.warp(gray, est.rotation, est.h_raw_from_canonical, est.contrast))
    }

    /// Resample with a known corner rotation, skipping marker detection.
    pub fn rectify_with_rotation(
        &self,
        gray: &GrayImageView<'_>,
        quad: &Quad,
        rotation: CornerRotation,
    ) -> Result<CanonicalImage, RectifyError> {
        let raw_corners = rotation.apply(&quad.corners);
        let h = homography_from_4pt(&self.canonical.corners(), &raw_corners)
            .ok_or(RectifyError::DegenerateMapping)?;
        let contrast = self.marker_contrast(gray, &h);
        Ok(self.warp(gray, rotation, h, contrast))
    }

    fn warp(
        &self,
        gray: &GrayImageView<'_>,
        rotation: CornerRotation,
        h: Homography,
        contrast: f32,
    ) -> CanonicalImage {
        let image = warp_perspective_gray_filled(
            gray,
            h,
            self.canonical.width,
            self.canonical.height,
            self.params.border_value,
        );
        CanonicalImage {
            image,
            rotation,
            marker_contrast: contrast,
            h_raw_from_canonical: h,
        }
    }
}

fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

use crate::{sample_bilinear_u8, GrayImage, GrayImageView};
use nalgebra::{Matrix3, Point2, SMatrix, SVector, Vector3};

/// Planar projective transform `dst ~ H * src`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn to_array(&self) -> [[f64; 3]; 3] {
        [
            [self.h[(0, 0)], self.h[(0, 1)], self.h[(0, 2)]],
            [self.h[(1, 0)], self.h[(1, 1)], self.h[(1, 2)]],
            [self.h[(2, 0)], self.h[(2, 1)], self.h[(2, 2)]],
        ]
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        let w = v[2];
        Point2::new((v[0] / w) as f32, (v[1] / w) as f32)
    }

    /// Like [`apply`](Self::apply) but refuses points mapped to (or behind) the
    /// line at infinity.
    #[inline]
    pub fn try_apply(&self, p: Point2<f32>) -> Option<Point2<f32>> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        let w = v[2];
        if !w.is_finite() || w.abs() < 1e-12 {
            return None;
        }
        let q = Point2::new((v[0] / w) as f32, (v[1] / w) as f32);
        (q.x.is_finite() && q.y.is_finite()).then_some(q)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }
}

fn hartley_normalization(cx: f64, cy: f64, mean_dist: f64) -> Matrix3<f64> {
    let s = if mean_dist > 1e-12 {
        (2.0_f64).sqrt() / mean_dist
    } else {
        1.0
    };

    Matrix3::<f64>::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

fn normalize_points4(pts: &[Point2<f32>; 4]) -> Option<([Point2<f64>; 4], Matrix3<f64>)> {
    let mut cx = 0.0_f64;
    let mut cy = 0.0_f64;
    for p in pts {
        cx += p.x as f64;
        cy += p.y as f64;
    }
    cx /= 4.0;
    cy /= 4.0;

    let mut mean_dist = 0.0_f64;
    for p in pts {
        let dx = p.x as f64 - cx;
        let dy = p.y as f64 - cy;
        mean_dist += (dx * dx + dy * dy).sqrt();
    }
    mean_dist /= 4.0;
    if !mean_dist.is_finite() || mean_dist < 1e-9 {
        return None;
    }

    let t = hartley_normalization(cx, cy, mean_dist);

    let mut out = [Point2::new(0.0_f64, 0.0_f64); 4];
    for (i, p) in pts.iter().enumerate() {
        let v = t * Vector3::new(p.x as f64, p.y as f64, 1.0);
        out[i] = Point2::new(v[0], v[1]);
    }

    Some((out, t))
}

fn normalize_homography(h: Matrix3<f64>) -> Option<Matrix3<f64>> {
    let s = h[(2, 2)];
    if s.abs() < 1e-12 || h.iter().any(|v| !v.is_finite()) {
        return None;
    }
    Some(h / s)
}

/// Smallest |det(H)| accepted in Hartley-normalized coordinates.
///
/// Normalized points are O(1), so a well-posed H has a determinant of the same
/// order; a (near) rank-deficient H maps the plane onto a line.
const MIN_NORMALIZED_DET: f64 = 1e-6;

/// Compute H such that `dst ~ H * src` from 4 point correspondences.
///
/// Corner order must be consistent between `src` and `dst`. Returns `None`
/// for near-degenerate configurations instead of a garbage matrix.
pub fn homography_from_4pt(src: &[Point2<f32>; 4], dst: &[Point2<f32>; 4]) -> Option<Homography> {
    // Unknowns: [h11 h12 h13 h21 h22 h23 h31 h32], with h33 = 1
    // For each correspondence (x,y)->(u,v):
    // h11 x + h12 y + h13 - u h31 x - u h32 y = u
    // h21 x + h22 y + h23 - v h31 x - v h32 y = v
    let (src_n, t_src) = normalize_points4(src)?;
    let (dst_n, t_dst) = normalize_points4(dst)?;

    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for k in 0..4 {
        let (x, y) = (src_n[k].x, src_n[k].y);
        let (u, v) = (dst_n[k].x, dst_n[k].y);

        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -u * x;
        a[(r0, 7)] = -u * y;
        b[r0] = u;

        let r1 = 2 * k + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -v * x;
        a[(r1, 7)] = -v * y;
        b[r1] = v;
    }

    let x = a.lu().solve(&b)?;
    if x.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let hn = Matrix3::<f64>::new(
        x[0], x[1], x[2], //
        x[3], x[4], x[5], //
        x[6], x[7], 1.0,
    );
    if hn.determinant().abs() < MIN_NORMALIZED_DET {
        return None;
    }

    let t_dst_inv = t_dst.try_inverse()?;
    let h = normalize_homography(t_dst_inv * hn * t_src)?;
    Some(Homography::new(h))
}

/// Warp into a destination grid: for each destination pixel centre, map into
/// the source through `h_src_from_dst` and sample bilinearly.
pub fn warp_perspective_gray(
    src: &GrayImageView<'_>,
    h_src_from_dst: Homography,
    out_w: usize,
    out_h: usize,
) -> GrayImage {
    warp_with_border(src, h_src_from_dst, out_w, out_h, None)
}

/// Same as [`warp_perspective_gray`], but destination pixels whose source
/// position falls outside `src` are set to `border`.
pub fn warp_perspective_gray_filled(
    src: &GrayImageView<'_>,
    h_src_from_dst: Homography,
    out_w: usize,
    out_h: usize,
    border: u8,
) -> GrayImage {
    warp_with_border(src, h_src_from_dst, out_w, out_h, Some(border))
}

fn warp_with_border(
    src: &GrayImageView<'_>,
    h: Homography,
    out_w: usize,
    out_h: usize,
    border: Option<u8>,
) -> GrayImage {
    let mut out = vec![border.unwrap_or(0); out_w * out_h];
    let (sw, sh) = (src.width as f32, src.height as f32);

    for y in 0..out_h {
        for x in 0..out_w {
            // sample at pixel center; source pixel i is centred at i + 0.5
            let Some(p) = h.try_apply(Point2::new(x as f32 + 0.5, y as f32 + 0.5)) else {
                continue;
            };
            if border.is_some() && (p.x < 0.0 || p.y < 0.0 || p.x >= sw || p.y >= sh) {
                continue;
            }
            out[y * out_w + x] = sample_bilinear_u8(src, p.x - 0.5, p.y - 0.5);
        }
    }

    GrayImage {
        width: out_w,
        height: out_h,
        data: out,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point2<f32>, b: Point2<f32>, tol: f32) {
        let dx = (a.x - b.x).abs();
        let dy = (a.y - b.y).abs();
        assert!(
            dx < tol && dy < tol,
            "expected ({:.6},{:.6}) ~ ({:.6},{:.6}) within {}",
            a.x,
            a.y,
            b.x,
            b.y,
            tol
        );
    }

    #[test]
    fn inverse_round_trips_points() {
        let h = Homography::new(Matrix3::new(
            1.2, 0.1, 5.0, //
            -0.05, 0.9, 3.0, //
            0.001, 0.0005, 1.0,
        ));
        let inv = h.inverse().expect("invertible");

        for p in [
            Point2::new(0.0_f32, 0.0),
            Point2::new(50.0_f32, -20.0),
            Point2::new(320.0_f32, 200.0),
        ] {
            let back = inv.apply(h.apply(p));
            assert_close(back, p, 1e-3);
        }
    }

    #[test]
    fn four_point_solution_recovers_sheet_projection() {
        let ground_truth = Homography::new(Matrix3::new(
            0.8, 0.05, 120.0, //
            -0.02, 1.1, 80.0, //
            0.0002, -0.0001, 1.0,
        ));

        let canonical = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(800.0_f32, 0.0),
            Point2::new(800.0_f32, 1000.0),
            Point2::new(0.0_f32, 1000.0),
        ];
        let photo = canonical.map(|p| ground_truth.apply(p));

        let recovered = homography_from_4pt(&canonical, &photo).expect("recoverable");

        for p in [
            Point2::new(0.0_f32, 0.0),
            Point2::new(400.0, 250.0),
            Point2::new(760.0, 940.0),
        ] {
            assert_close(recovered.apply(p), ground_truth.apply(p), 1e-2);
        }
    }

    #[test]
    fn collinear_points_are_rejected() {
        let src = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ];
        let dst = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(5.0, 5.0),
            Point2::new(10.0, 10.0),
            Point2::new(20.0, 20.0),
        ];
        assert!(homography_from_4pt(&src, &dst).is_none());

        let collapsed = [Point2::new(3.0_f32, 3.0); 4];
        assert!(homography_from_4pt(&src, &collapsed).is_none());
    }

    #[test]
    fn identity_warp_preserves_pixels() {
        let mut img = GrayImage::filled(6, 4, 10);
        img.put(2, 1, 200);
        let id = Homography::new(Matrix3::identity());
        let out = warp_perspective_gray(&img.view(), id, 6, 4);
        assert_eq!(out, img);
    }

    #[test]
    fn filled_warp_uses_border_outside_source() {
        let img = GrayImage::filled(4, 4, 50);
        let shift = Homography::new(Matrix3::new(
            1.0, 0.0, 10.0, //
            0.0, 1.0, 0.0, //
            0.0, 0.0, 1.0,
        ));
        let out = warp_perspective_gray_filled(&img.view(), shift, 4, 4, 222);
        assert!(out.data.iter().all(|&v| v == 222));
    }
}

//! Quadrilateral geometry: corner ordering, degeneracy checks, convex hulls
//! and polygon approximation down to four corners.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Four corners in image space, ordered TL, TR, BR, BL (clockwise on screen,
/// y pointing down).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    pub corners: [Point2<f32>; 4],
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum QuadError {
    #[error("quadrilateral has non-finite coordinates")]
    NonFinite,
    #[error("quadrilateral is not convex")]
    NonConvex,
    #[error("three corners are nearly collinear (min corner triangle {ratio:.4} of area)")]
    NearCollinear { ratio: f32 },
    #[error("quadrilateral covers {area_frac:.3} of the image (min {min_frac:.3})")]
    TooSmall { area_frac: f32, min_frac: f32 },
}

impl Quad {
    /// Build a quad from corners in arbitrary order.
    pub fn from_unordered(points: [Point2<f32>; 4]) -> Self {
        Self {
            corners: order_corners(points),
        }
    }

    /// Signed shoelace area (positive for clockwise-on-screen order).
    pub fn signed_area(&self) -> f32 {
        polygon_signed_area(&self.corners)
    }

    pub fn area(&self) -> f32 {
        self.signed_area().abs()
    }

    pub fn perimeter(&self) -> f32 {
        (0..4)
            .map(|i| distance(self.corners[i], self.corners[(i + 1) % 4]))
            .sum()
    }

    /// All turns have the same orientation and none is flat.
    pub fn is_convex(&self) -> bool {
        let mut sign = 0.0f32;
        for i in 0..4 {
            let c = cross(
                self.corners[i],
                self.corners[(i + 1) % 4],
                self.corners[(i + 2) % 4],
            );
            if c == 0.0 {
                return false;
            }
            if sign == 0.0 {
                sign = c.signum();
            } else if c.signum() != sign {
                return false;
            }
        }
        true
    }

    /// Check the invariants a sheet quadrilateral must satisfy before a
    /// homography is derived from it.
    ///
    /// - every coordinate finite,
    /// - convex,
    /// - no three corners nearly collinear (`min_triangle_ratio` of area),
    /// - area at least `min_area_frac` of `image_area`.
    pub fn validate(
        &self,
        image_area: f32,
        min_area_frac: f32,
        min_triangle_ratio: f32,
    ) -> Result<(), QuadError> {
        if self
            .corners
            .iter()
            .any(|p| !p.x.is_finite() || !p.y.is_finite())
        {
            return Err(QuadError::NonFinite);
        }
        if !self.is_convex() {
            return Err(QuadError::NonConvex);
        }
        let area = self.area();
        let min_tri = (0..4)
            .map(|skip| {
                let pts: Vec<Point2<f32>> = (0..4)
                    .filter(|&i| i != skip)
                    .map(|i| self.corners[i])
                    .collect();
                0.5 * cross(pts[0], pts[1], pts[2]).abs()
            })
            .fold(f32::INFINITY, f32::min);
        let ratio = if area > 0.0 { min_tri / area } else { 0.0 };
        if ratio < min_triangle_ratio {
            return Err(QuadError::NearCollinear { ratio });
        }
        let area_frac = if image_area > 0.0 {
            area / image_area
        } else {
            0.0
        };
        if area_frac < min_area_frac {
            return Err(QuadError::TooSmall {
                area_frac,
                min_frac: min_area_frac,
            });
        }
        Ok(())
    }
}

/// Order four points TL, TR, BR, BL by angle around their centroid.
///
/// The start corner is the one with the smallest `x + y`; ties in a
/// perfectly 45° rotated quad resolve to the lowest angle.
pub fn order_corners(points: [Point2<f32>; 4]) -> [Point2<f32>; 4] {
    let cx = points.iter().map(|p| p.x).sum::<f32>() / 4.0;
    let cy = points.iter().map(|p| p.y).sum::<f32>() / 4.0;
    let mut sorted = points;
    // y points down, so increasing atan2 walks clockwise on screen
    sorted.sort_by(|a, b| {
        let ta = (a.y - cy).atan2(a.x - cx);
        let tb = (b.y - cy).atan2(b.x - cx);
        ta.total_cmp(&tb)
    });
    let start = (0..4)
        .min_by(|&i, &j| {
            let si = sorted[i].x + sorted[i].y;
            let sj = sorted[j].x + sorted[j].y;
            si.total_cmp(&sj)
        })
        .unwrap_or(0);
    [
        sorted[start],
        sorted[(start + 1) % 4],
        sorted[(start + 2) % 4],
        sorted[(start + 3) % 4],
    ]
}

#[inline]
fn cross(o: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> f32 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

#[inline]
fn distance(a: Point2<f32>, b: Point2<f32>) -> f32 {
    (a - b).norm()
}

pub fn polygon_signed_area(poly: &[Point2<f32>]) -> f32 {
    let n = poly.len();
    if n < 3 {
        return 0.0;
    }
    let mut acc = 0.0f64;
    for i in 0..n {
        let p = poly[i];
        let q = poly[(i + 1) % n];
        acc += p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
    }
    (0.5 * acc) as f32
}

pub fn polygon_perimeter(poly: &[Point2<f32>]) -> f32 {
    let n = poly.len();
    if n < 2 {
        return 0.0;
    }
    (0..n).map(|i| distance(poly[i], poly[(i + 1) % n])).sum()
}

/// Convex hull (Andrew's monotone chain), collinear points dropped.
///
/// The hull is returned clockwise on screen (counter-clockwise in a y-up frame).
pub fn convex_hull(points: &[Point2<f32>]) -> Vec<Point2<f32>> {
    let mut pts: Vec<Point2<f32>> = points
        .iter()
        .copied()
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .collect();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let mut lower: Vec<Point2<f32>> = Vec::with_capacity(pts.len());
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0
        {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<Point2<f32>> = Vec::with_capacity(pts.len());
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0
        {
            upper.pop();
        }
        upper.push(p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

fn point_segment_distance(p: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> f32 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 <= f32::EPSILON {
        return distance(p, a);
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    distance(p, a + ab * t)
}

/// Douglas–Peucker on an open chain; keeps both endpoints.
fn simplify_chain(chain: &[Point2<f32>], epsilon: f32, out: &mut Vec<Point2<f32>>) {
    if chain.len() < 3 {
        out.extend_from_slice(&chain[..chain.len().saturating_sub(1)]);
        return;
    }
    let first = chain[0];
    let last = chain[chain.len() - 1];
    let (idx, dmax) = chain[1..chain.len() - 1]
        .iter()
        .enumerate()
        .map(|(i, &p)| (i + 1, point_segment_distance(p, first, last)))
        .fold((0, -1.0f32), |best, cur| if cur.1 > best.1 { cur } else { best });
    if dmax > epsilon {
        simplify_chain(&chain[..=idx], epsilon, out);
        simplify_chain(&chain[idx..], epsilon, out);
    } else {
        out.push(first);
    }
}

/// Indices of the two mutually farthest vertices, `i < j`.
fn diameter_pair(poly: &[Point2<f32>]) -> (usize, usize) {
    let mut best = (0, poly.len() / 2, -1.0f32);
    for i in 0..poly.len() {
        for j in (i + 1)..poly.len() {
            let d = (poly[i] - poly[j]).norm_squared();
            if d > best.2 {
                best = (i, j, d);
            }
        }
    }
    (best.0, best.1)
}

/// Douglas–Peucker approximation of a closed convex polygon.
///
/// The ring is cut at its two mutually farthest vertices. Both are extreme
/// points of the shape, so on a quadrilateral outline they are opposite
/// corners and no vertex is kept merely because the ring happened to start
/// there.
pub fn approx_polygon(poly: &[Point2<f32>], epsilon: f32) -> Vec<Point2<f32>> {
    let n = poly.len();
    if n <= 3 {
        return poly.to_vec();
    }
    let (a, b) = diameter_pair(poly);

    let mut back: Vec<Point2<f32>> = poly[b..].to_vec();
    back.extend_from_slice(&poly[..=a]);

    let mut out = Vec::new();
    simplify_chain(&poly[a..=b], epsilon, &mut out);
    simplify_chain(&back, epsilon, &mut out);
    out
}

/// Iterative relaxation settings for [`fit_quad`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadFitParams {
    /// Initial Douglas–Peucker tolerance as a fraction of the perimeter.
    pub initial_epsilon_frac: f32,
    /// Multiplicative relaxation per iteration.
    pub epsilon_growth: f32,
    /// Iteration budget.
    pub max_iterations: usize,
    /// Largest polygon from which a best 4-subset is still searched when the
    /// relaxation jumps over exactly four vertices.
    pub max_subset_vertices: usize,
    /// Re-fit each side to the boundary points along it and move the corners
    /// to the intersections of adjacent sides.
    pub refine_corners: bool,
    /// Half-width of the band around a rough side, as a fraction of the quad
    /// perimeter, inside which boundary points count towards that side.
    pub refine_band_frac: f32,
}

impl Default for QuadFitParams {
    fn default() -> Self {
        Self {
            initial_epsilon_frac: 0.005,
            epsilon_growth: 1.5,
            max_iterations: 12,
            max_subset_vertices: 12,
            refine_corners: true,
            refine_band_frac: 0.005,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuadFitError {
    #[error("contour has only {points} usable points")]
    TooFewPoints { points: usize },
    #[error("polygon approximation did not reach four corners in {iterations} iterations (last had {vertices})")]
    NoConvergence { iterations: usize, vertices: usize },
}

/// Fit a quadrilateral to a closed boundary (typically a convex hull).
///
/// The approximation tolerance is relaxed until exactly four vertices remain.
/// If the relaxation skips from more than four straight to fewer, the best
/// four-vertex subset of the last larger polygon is chosen by
/// [`quad_cost`]. With `refine_corners` the rough corners are then replaced
/// by intersections of lines fitted to each side. Corners come back ordered
/// TL, TR, BR, BL.
pub fn fit_quad(boundary: &[Point2<f32>], params: &QuadFitParams) -> Result<Quad, QuadFitError> {
    let hull = convex_hull(boundary);
    if hull.len() < 4 {
        return Err(QuadFitError::TooFewPoints { points: hull.len() });
    }
    let perimeter = polygon_perimeter(&hull);
    let mut epsilon = params.initial_epsilon_frac.max(1e-6) * perimeter;
    let mut last_larger: Option<Vec<Point2<f32>>> = None;
    let mut vertices = hull.len();
    let mut rough = None;

    for _ in 0..params.max_iterations.max(1) {
        let poly = approx_polygon(&hull, epsilon);
        vertices = poly.len();
        match poly.len() {
            4 => {
                rough = Some(Quad::from_unordered([poly[0], poly[1], poly[2], poly[3]]));
                break;
            }
            n if n < 4 => break,
            _ => last_larger = Some(poly),
        }
        epsilon *= params.epsilon_growth.max(1.01);
    }

    if rough.is_none() {
        let hull_area = polygon_signed_area(&hull).abs();
        rough = last_larger
            .filter(|p| p.len() <= params.max_subset_vertices)
            .and_then(|poly| best_quad_subset(&poly, hull_area));
    }
    let Some(quad) = rough else {
        return Err(QuadFitError::NoConvergence {
            iterations: params.max_iterations,
            vertices,
        });
    };

    if !params.refine_corners {
        return Ok(quad);
    }
    let band = (params.refine_band_frac * quad.perimeter()).max(1.5);
    Ok(refine_corners(&quad, boundary, band))
}

/// Line through `point` with unit `direction`.
#[derive(Clone, Copy, Debug)]
struct Line {
    point: Point2<f32>,
    direction: Vector2<f32>,
}

impl Line {
    fn through(a: Point2<f32>, b: Point2<f32>) -> Option<Self> {
        let d = b - a;
        let len = d.norm();
        (len > f32::EPSILON).then(|| Self {
            point: a,
            direction: d / len,
        })
    }

    /// Total least squares: centroid plus the principal axis of the scatter.
    fn fit(points: &[Point2<f32>]) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }
        let n = points.len() as f64;
        let (mx, my) = points.iter().fold((0.0f64, 0.0f64), |(x, y), p| {
            (x + p.x as f64, y + p.y as f64)
        });
        let (mx, my) = (mx / n, my / n);
        let (mut sxx, mut sxy, mut syy) = (0.0f64, 0.0f64, 0.0f64);
        for p in points {
            let (dx, dy) = (p.x as f64 - mx, p.y as f64 - my);
            sxx += dx * dx;
            sxy += dx * dy;
            syy += dy * dy;
        }
        let theta = 0.5 * (2.0 * sxy).atan2(sxx - syy);
        Some(Self {
            point: Point2::new(mx as f32, my as f32),
            direction: Vector2::new(theta.cos() as f32, theta.sin() as f32),
        })
    }

    fn intersect(&self, other: &Line) -> Option<Point2<f32>> {
        let denom = self.direction.perp(&other.direction);
        if denom.abs() < 1e-6 {
            return None;
        }
        let t = (other.point - self.point).perp(&other.direction) / denom;
        let p = self.point + self.direction * t;
        (p.x.is_finite() && p.y.is_finite()).then_some(p)
    }
}

/// Move each corner to the intersection of the two sides meeting there, each
/// side re-fitted to the boundary points within `band` of its middle part.
///
/// A side without enough support keeps the line through its rough corners; a
/// corner whose refined position moves further than `2 * band` is kept.
fn refine_corners(quad: &Quad, boundary: &[Point2<f32>], band: f32) -> Quad {
    let c = &quad.corners;
    let sides: Vec<Option<Line>> = (0..4)
        .map(|k| {
            let (a, b) = (c[k], c[(k + 1) % 4]);
            let ab = b - a;
            let len2 = ab.norm_squared();
            if len2 <= f32::EPSILON {
                return None;
            }
            let support: Vec<Point2<f32>> = boundary
                .iter()
                .copied()
                .filter(|p| {
                    let t = (*p - a).dot(&ab) / len2;
                    (0.1..=0.9).contains(&t) && point_segment_distance(*p, a, b) <= band
                })
                .collect();
            Line::fit(&support).or_else(|| Line::through(a, b))
        })
        .collect();

    let mut corners = *c;
    for (k, corner) in corners.iter_mut().enumerate() {
        let (Some(before), Some(after)) = (sides[(k + 3) % 4], sides[k]) else {
            continue;
        };
        if let Some(p) = before.intersect(&after) {
            if distance(p, *corner) <= 2.0 * band {
                *corner = p;
            }
        }
    }
    Quad { corners }
}

/// Corner-angle / area-deviation cost of a candidate quad relative to the
/// polygon it approximates. Zero for a perfect rectangle covering the polygon.
pub fn quad_cost(quad: &Quad, reference_area: f32) -> f32 {
    let c = &quad.corners;
    let mut angle_cost = 0.0f32;
    for i in 0..4 {
        let prev = c[(i + 3) % 4];
        let cur = c[i];
        let next = c[(i + 1) % 4];
        let a = prev - cur;
        let b = next - cur;
        let denom = a.norm() * b.norm();
        if denom <= f32::EPSILON {
            return f32::INFINITY;
        }
        let angle = (a.dot(&b) / denom).clamp(-1.0, 1.0).acos();
        angle_cost += (angle - std::f32::consts::FRAC_PI_2).abs() / std::f32::consts::FRAC_PI_2;
    }
    let area_cost = if reference_area > 0.0 {
        (1.0 - quad.area() / reference_area).abs()
    } else {
        1.0
    };
    angle_cost / 4.0 + area_cost
}

fn best_quad_subset(poly: &[Point2<f32>], reference_area: f32) -> Option<Quad> {
    let n = poly.len();
    let mut best: Option<(f32, Quad)> = None;
    for a in 0..n {
        for b in (a + 1)..n {
            for c in (b + 1)..n {
                for d in (c + 1)..n {
                    let quad = Quad::from_unordered([poly[a], poly[b], poly[c], poly[d]]);
                    if !quad.is_convex() {
                        continue;
                    }
                    let cost = quad_cost(&quad, reference_area);
                    if best.map(|(bc, _)| cost < bc).unwrap_or(true) {
                        best = Some((cost, quad));
                    }
                }
            }
        }
    }
    best.map(|(_, q)| q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rect_quad() -> Quad {
        Quad::from_unordered([
            Point2::new(100.0, 20.0),
            Point2::new(10.0, 120.0),
            Point2::new(10.0, 20.0),
            Point2::new(100.0, 120.0),
        ])
    }

    #[test]
    fn corners_are_ordered_clockwise_from_top_left() {
        let q = rect_quad();
        assert_eq!(q.corners[0], Point2::new(10.0, 20.0));
        assert_eq!(q.corners[1], Point2::new(100.0, 20.0));
        assert_eq!(q.corners[2], Point2::new(100.0, 120.0));
        assert_eq!(q.corners[3], Point2::new(10.0, 120.0));
        assert!(q.signed_area() > 0.0);
        assert_relative_eq!(q.area(), 9000.0);
        assert!(q.is_convex());
    }

    #[test]
    fn validate_rejects_degenerate_quads() {
        let ok = rect_quad();
        assert!(ok.validate(20_000.0, 0.1, 0.05).is_ok());

        let small = ok.validate(1_000_000.0, 0.1, 0.05);
        assert!(matches!(small, Err(QuadError::TooSmall { .. })));

        let sliver = Quad {
            corners: [
                Point2::new(0.0, 0.0),
                Point2::new(100.0, 0.1),
                Point2::new(200.0, 0.4),
                Point2::new(100.0, 3.0),
            ],
        };
        assert!(matches!(
            sliver.validate(100.0, 0.0, 0.05),
            Err(QuadError::NearCollinear { .. })
        ));

        let nan = Quad {
            corners: [Point2::new(f32::NAN, 0.0); 4],
        };
        assert_eq!(nan.validate(1.0, 0.0, 0.0), Err(QuadError::NonFinite));
    }

    #[test]
    fn hull_drops_interior_and_collinear_points() {
        let mut pts = vec![
            Point2::new(0.0, 0.0),
            Point2::new(5.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ];
        pts.push(Point2::new(4.0, 6.0));
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
        assert_relative_eq!(polygon_signed_area(&hull).abs(), 100.0);
    }

    #[test]
    fn fit_quad_recovers_rotated_rectangle_from_noisy_boundary() {
        let (cx, cy) = (300.0f32, 400.0f32);
        let (hw, hh) = (200.0f32, 260.0f32);
        let theta = 0.2f32;
        let (s, c) = theta.sin_cos();
        let rot = |x: f32, y: f32| Point2::new(cx + c * x - s * y, cy + s * x + c * y);

        let mut boundary = Vec::new();
        for k in 0..=100 {
            let t = k as f32 / 100.0;
            let wobble = if k % 2 == 0 { 0.8 } else { -0.8 };
            boundary.push(rot(-hw + 2.0 * hw * t, -hh + wobble));
            boundary.push(rot(hw + wobble, -hh + 2.0 * hh * t));
            boundary.push(rot(hw - 2.0 * hw * t, hh + wobble));
            boundary.push(rot(-hw + wobble, hh - 2.0 * hh * t));
        }

        let quad = fit_quad(&boundary, &QuadFitParams::default()).expect("quad");
        let expected = Quad::from_unordered([
            rot(-hw, -hh),
            rot(hw, -hh),
            rot(hw, hh),
            rot(-hw, hh),
        ]);
        for (a, b) in quad.corners.iter().zip(expected.corners.iter()) {
            assert!((a - b).norm() < 3.0, "{a:?} vs {b:?}");
        }
    }

    /// Integer samples every pixel along the edges of `corners`.
    fn rasterized_outline(corners: [Point2<f32>; 4]) -> Vec<Point2<f32>> {
        let mut pts = Vec::new();
        for k in 0..4 {
            let (a, b) = (corners[k], corners[(k + 1) % 4]);
            let steps = (b - a).norm().ceil() as usize;
            for s in 0..steps {
                let p = a + (b - a) * (s as f32 / steps as f32);
                pts.push(Point2::new(p.x.round(), p.y.round()));
            }
        }
        pts
    }

    #[test]
    fn nearly_vertical_left_edge_keeps_true_corners() {
        // the leftmost hull point sits on the left edge, not at a corner
        let truth = [
            Point2::new(100.0, 84.0),
            Point2::new(920.0, 108.0),
            Point2::new(890.0, 1140.0),
            Point2::new(60.0, 1116.0),
        ];
        let quad = fit_quad(&rasterized_outline(truth), &QuadFitParams::default()).expect("quad");
        for (got, want) in quad.corners.iter().zip(truth.iter()) {
            assert!((got - want).norm() < 1.5, "{got:?} vs {want:?}");
        }

        let rough = QuadFitParams {
            refine_corners: false,
            ..QuadFitParams::default()
        };
        let quad = fit_quad(&rasterized_outline(truth), &rough).expect("quad");
        for (got, want) in quad.corners.iter().zip(truth.iter()) {
            assert!((got - want).norm() < 2.0, "{got:?} vs {want:?}");
        }
    }

    #[test]
    fn approximation_ignores_where_the_ring_starts() {
        let truth = [
            Point2::new(100.0, 84.0),
            Point2::new(920.0, 108.0),
            Point2::new(890.0, 1140.0),
            Point2::new(60.0, 1116.0),
        ];
        let hull = convex_hull(&rasterized_outline(truth));
        let eps = 0.01 * polygon_perimeter(&hull);
        let base = approx_polygon(&hull, eps);
        assert_eq!(base.len(), 4);
        for shift in [1, hull.len() / 3, hull.len() - 1] {
            let mut rotated = hull.clone();
            rotated.rotate_left(shift);
            let mut got = approx_polygon(&rotated, eps);
            assert_eq!(got.len(), 4, "shift={shift}");
            let mut want = base.clone();
            let key = |p: &Point2<f32>| (p.x as i32, p.y as i32);
            got.sort_by_key(key);
            want.sort_by_key(key);
            assert_eq!(got, want, "shift={shift}");
        }
    }

    #[test]
    fn refinement_moves_a_rounded_corner_onto_the_sides() {
        // a 300 x 200 rectangle with its top-left corner cut by a 6 px chamfer
        let mut boundary = Vec::new();
        for x in 6..=300 {
            boundary.push(Point2::new(x as f32, 0.0));
            boundary.push(Point2::new(x as f32, 200.0));
        }
        for y in 6..=200 {
            boundary.push(Point2::new(0.0, y as f32));
            boundary.push(Point2::new(300.0, y as f32));
        }
        let quad = fit_quad(&boundary, &QuadFitParams::default()).expect("quad");
        assert!(quad.corners[0].coords.norm() < 0.5, "{:?}", quad.corners[0]);
        assert_relative_eq!(quad.corners[2].x, 300.0, epsilon = 0.5);
        assert_relative_eq!(quad.corners[2].y, 200.0, epsilon = 0.5);
    }

    #[test]
    fn fit_quad_fails_on_triangle() {
        let tri = vec![
            Point2::new(0.0, 0.0),
            Point2::new(100.0, 0.0),
            Point2::new(50.0, 80.0),
        ];
        assert!(matches!(
            fit_quad(&tri, &QuadFitParams::default()),
            Err(QuadFitError::TooFewPoints { points: 3 })
        ));
    }

    #[test]
    fn cost_prefers_rectangles() {
        let square = rect_quad();
        let skewed = Quad::from_unordered([
            Point2::new(10.0, 20.0),
            Point2::new(100.0, 20.0),
            Point2::new(60.0, 120.0),
            Point2::new(40.0, 120.0),
        ]);
        assert!(quad_cost(&square, 9000.0) < quad_cost(&skewed, 9000.0));
        assert_relative_eq!(quad_cost(&square, 9000.0), 0.0, epsilon = 1e-4);
    }
}

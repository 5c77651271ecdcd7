//! Debug overlays: where the sheet outline was found on the photograph and
//! how every bubble on the canonical view was read.
//!
//! Both images are grey: the source is washed out to `[128, 255]` and the
//! annotations are drawn dark on top of it.

use crate::classify::{BubbleState, Classification};
use crate::layout::LayoutModel;
use crate::render::draw_annulus;
use nalgebra::Point2;
use omr_core::{GrayImage, GrayImageView, Quad};

const STROKE: u8 = 0;
const FAINT: u8 = 110;

/// Angular dash count of the ring drawn around an ambiguous bubble.
const DASHES: f32 = 12.0;

fn washed(src: &GrayImageView<'_>) -> GrayImage {
    GrayImage {
        width: src.width,
        height: src.height,
        data: src.data.iter().map(|&v| 128 + v / 2).collect(),
    }
}

fn draw_segment(img: &mut GrayImage, a: Point2<f32>, b: Point2<f32>, width: f32, value: u8) {
    let steps = ((b - a).norm() * 2.0).ceil().max(1.0) as usize;
    for s in 0..=steps {
        let p = a + (b - a) * (s as f32 / steps as f32);
        draw_annulus(img, p, 0.0, 0.5 * width, value);
    }
}

fn draw_dashed_ring(img: &mut GrayImage, c: Point2<f32>, inner: f32, outer: f32, value: u8) {
    let x0 = (c.x - outer).floor().max(0.0) as usize;
    let y0 = (c.y - outer).floor().max(0.0) as usize;
    let x1 = ((c.x + outer).ceil().max(0.0) as usize).min(img.width);
    let y1 = ((c.y + outer).ceil().max(0.0) as usize).min(img.height);
    for y in y0..y1 {
        for x in x0..x1 {
            let d = Point2::new(x as f32 + 0.5, y as f32 + 0.5) - c;
            let r = d.norm();
            let turn = (d.y.atan2(d.x) / std::f32::consts::TAU + 0.5) * DASHES;
            if r >= inner && r <= outer && (turn as usize) % 2 == 0 {
                img.put(x, y, value);
            }
        }
    }
}

/// The photograph with the located outline drawn over it. A filled disk
/// sits on the first (top-left after ordering) corner.
pub fn located_overlay(photo: &GrayImageView<'_>, quad: &Quad) -> GrayImage {
    let mut img = washed(photo);
    let width = (photo.width.max(photo.height) as f32 / 400.0).max(2.0);
    for k in 0..4 {
        draw_segment(
            &mut img,
            quad.corners[k],
            quad.corners[(k + 1) % 4],
            width,
            STROKE,
        );
    }
    draw_annulus(&mut img, quad.corners[0], 0.0, 3.0 * width, STROKE);
    img
}

/// The canonical view with a ring just outside each sampled region: heavy
/// for marked bubbles, dashed for ambiguous ones, a faint hairline for the
/// rest.
pub fn bubble_overlay(
    canonical: &GrayImageView<'_>,
    model: &LayoutModel,
    classification: &Classification,
) -> GrayImage {
    let mut img = washed(canonical);
    for q in &classification.questions {
        let Some(slot) = model.slot(q.question) else {
            continue;
        };
        for (region, state) in slot.options.iter().zip(&q.states) {
            let (c, r) = (region.center, region.radius);
            match state {
                BubbleState::Marked => draw_annulus(&mut img, c, r + 1.0, r + 3.5, STROKE),
                BubbleState::Ambiguous => draw_dashed_ring(&mut img, c, r + 1.0, r + 3.0, STROKE),
                BubbleState::Unmarked => draw_annulus(&mut img, c, r + 1.0, r + 2.0, FAINT),
            }
        }
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{ClassifiedQuestion, FillMeasurement};
    use crate::layout::{LayoutSpec, SheetVersion};
    use crate::threshold::FillThresholds;

    fn ring_pixels(img: &GrayImage, c: Point2<f32>, radius: f32, value: u8) -> usize {
        (0..64)
            .map(|i| {
                let a = i as f32 / 64.0 * std::f32::consts::TAU;
                let p = c + nalgebra::Vector2::new(a.cos(), a.sin()) * radius;
                img.get(p.x as usize, p.y as usize)
            })
            .filter(|&v| v == Some(value))
            .count()
    }

    #[test]
    fn bubble_states_get_distinct_rings() {
        let spec = LayoutSpec::reference();
        let model = spec.model(&SheetVersion::new("A")).expect("model");
        let page = GrayImage::filled(800, 1000, 255);
        let fill = FillMeasurement {
            fill: 0.0,
            interior: 255.0,
            background: 255.0,
        };
        let classification = Classification {
            thresholds: FillThresholds::fixed(0.3, 0.6),
            questions: vec![ClassifiedQuestion {
                question: 1,
                fills: vec![fill; 5],
                states: vec![
                    BubbleState::Marked,
                    BubbleState::Ambiguous,
                    BubbleState::Unmarked,
                    BubbleState::Unmarked,
                    BubbleState::Unmarked,
                ],
            }],
        };
        let img = bubble_overlay(&page.view(), &model, &classification);
        let slot = model.slot(1).expect("slot");
        let r = slot.options[0].radius;

        let marked = ring_pixels(&img, slot.options[0].center, r + 2.5, STROKE);
        let dashed = ring_pixels(&img, slot.options[1].center, r + 2.0, STROKE);
        let faint = ring_pixels(&img, slot.options[2].center, r + 1.5, FAINT);
        assert!(marked > 56, "{marked}");
        assert!(dashed > 16 && dashed < 48, "{dashed}");
        assert!(faint > 40, "{faint}");

        // question 2 has no classification entry and stays white
        let untouched = model.slot(2).expect("slot").options[0].center;
        assert_eq!(ring_pixels(&img, untouched, r + 2.0, 255), 64);
    }

    #[test]
    fn located_outline_is_drawn_on_the_photo() {
        let photo = GrayImage::filled(400, 300, 200);
        let quad = Quad::from_unordered([
            Point2::new(50.0, 40.0),
            Point2::new(350.0, 60.0),
            Point2::new(330.0, 260.0),
            Point2::new(70.0, 250.0),
        ]);
        let img = located_overlay(&photo.view(), &quad);
        assert_eq!((img.width, img.height), (400, 300));
        // washed background
        assert_eq!(img.get(200, 150), Some(228));
        // midpoint of the top side
        assert_eq!(img.get(200, 50), Some(STROKE));
        // corner disk
        assert_eq!(img.get(52, 42), Some(STROKE));
    }
}

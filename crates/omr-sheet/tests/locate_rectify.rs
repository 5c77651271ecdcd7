use nalgebra::Point2;
use omr_core::{
    homography_from_4pt, sample_point, warp_perspective_gray_filled, CanonicalSize, CornerRotation,
    GrayImage, MarkRect,
};
use omr_sheet::{LocatorParams, OrientationParams, Rectifier, SheetLocator};

const CANONICAL: CanonicalSize = CanonicalSize::new(800, 1000);
const MARKER: MarkRect = MarkRect::new(24.0, 24.0, 40.0, 40.0);

fn canonical_sheet() -> GrayImage {
    let mut img = GrayImage::filled(CANONICAL.width, CANONICAL.height, 240);
    for y in 0..CANONICAL.height {
        for x in 0..CANONICAL.width {
            let on_frame = x < 10 || y < 10 || x >= CANONICAL.width - 10 || y >= CANONICAL.height - 10;
            let on_marker = (24..64).contains(&x) && (24..64).contains(&y);
            // a few grey blocks so the interior is not featureless
            let on_block = (200..260).contains(&x) && (300..320).contains(&y);
            if on_frame || on_marker {
                img.put(x, y, 20);
            } else if on_block {
                img.put(x, y, 90);
            }
        }
    }
    img
}

fn photograph(sheet: &GrayImage, corners: [Point2<f32>; 4], w: usize, h: usize) -> GrayImage {
    let h_raw_from_can = homography_from_4pt(&CANONICAL.corners(), &corners).expect("projection");
    let h_can_from_raw = h_raw_from_can.inverse().expect("invertible");
    warp_perspective_gray_filled(&sheet.view(), h_can_from_raw, w, h, 225)
}

fn assert_corners_near(found: &[Point2<f32>; 4], expected: &[Point2<f32>; 4], tol: f32) {
    for (f, e) in found.iter().zip(expected.iter()) {
        assert!((f - e).norm() < tol, "corner {f:?} expected near {e:?}");
    }
}

#[test]
fn tilted_photo_is_located_and_rectified_upright() {
    let sheet = canonical_sheet();
    let truth = [
        Point2::new(140.0, 110.0),
        Point2::new(905.0, 190.0),
        Point2::new(850.0, 1150.0),
        Point2::new(70.0, 1080.0),
    ];
    let photo = photograph(&sheet, truth, 1000, 1200);

    let locator = SheetLocator::new(CANONICAL, LocatorParams::default());
    let loc = locator.locate(&photo.view()).expect("sheet located");
    assert_corners_near(&loc.quad.corners, &truth, 4.0);

    let rectifier = Rectifier::new(CANONICAL, MARKER, OrientationParams::default());
    let canon = rectifier.rectify(&photo.view(), &loc.quad).expect("rectified");
    assert_eq!(canon.rotation, CornerRotation::Deg0);
    let view = canon.view();
    assert!(sample_point(&view, MARKER.center()) < 80.0);
    assert!(sample_point(&view, Point2::new(230.0, 310.0)) < 150.0);
    assert!(sample_point(&view, Point2::new(400.0, 500.0)) > 200.0);
}

#[test]
fn quarter_turned_photo_resolves_rotation() {
    let sheet = canonical_sheet();
    // canonical TL, TR, BR, BL placed with the sheet lying on its side
    let placement = [
        Point2::new(1150.0, 100.0),
        Point2::new(1140.0, 880.0),
        Point2::new(150.0, 900.0),
        Point2::new(130.0, 120.0),
    ];
    let photo = photograph(&sheet, placement, 1250, 1000);

    let locator = SheetLocator::new(CANONICAL, LocatorParams::default());
    let loc = locator.locate(&photo.view()).expect("sheet located");
    // located corners follow image order, starting at the image top-left
    let image_order = [placement[3], placement[0], placement[1], placement[2]];
    assert_corners_near(&loc.quad.corners, &image_order, 4.0);

    let rectifier = Rectifier::new(CANONICAL, MARKER, OrientationParams::default());
    let canon = rectifier.rectify(&photo.view(), &loc.quad).expect("rectified");
    assert_eq!(canon.rotation, CornerRotation::Deg90);
    assert!(sample_point(&canon.view(), MARKER.center()) < 80.0);
    assert!(sample_point(&canon.view(), Point2::new(230.0, 310.0)) < 150.0);
}

#[test]
fn empty_photo_has_no_sheet() {
    let mut photo = GrayImage::filled(900, 700, 210);
    // a few small dark blobs, far too small to be a sheet
    for (cx, cy) in [(100usize, 100usize), (600, 400), (300, 550)] {
        for y in cy..cy + 30 {
            for x in cx..cx + 30 {
                photo.put(x, y, 30);
            }
        }
    }
    let locator = SheetLocator::new(CANONICAL, LocatorParams::default());
    let err = locator.locate(&photo.view()).unwrap_err();
    assert_eq!(err.reason_code(), "no-sheet-region");
}

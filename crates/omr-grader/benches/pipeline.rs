use criterion::{black_box, criterion_group, criterion_main, Criterion};
use omr_core::RawImage;
use omr_grader::{grade_batch, GradeConfig, SheetInput};
use omr_score::render::{photograph, render_sheet, tilted_placement, PencilMark, PhotoOptions, RenderOptions};
use omr_score::SheetVersion;
use omr_sheet::SheetLocator;

fn synthetic_photo(version: &str, turns: usize) -> RawImage {
    let cfg = GradeConfig::reference();
    let marks: Vec<PencilMark> = (1..=100).map(|q| PencilMark::new(q, (q % 5) as u8)).collect();
    let sheet = render_sheet(&cfg.layout, &SheetVersion::new(version), &marks, &RenderOptions::default())
        .expect("render");
    let (corners, w, h) = tilted_placement(sheet.width, sheet.height, turns);
    let photo = photograph(&sheet, corners, w, h, &PhotoOptions::default()).expect("photo");
    RawImage::from_gray(photo)
}

fn bench_pipeline(c: &mut Criterion) {
    let cfg = GradeConfig::reference();
    let grader = cfg.build_grader().expect("grader");
    let photo = synthetic_photo("B", 0);
    let gray = photo.to_gray();

    c.bench_function("locate_sheet", |b| {
        let locator = SheetLocator::new(cfg.layout.canonical, cfg.params.locator.clone());
        b.iter(|| black_box(locator.locate(&gray.view())))
    });

    c.bench_function("grade_sheet", |b| {
        b.iter(|| black_box(grader.grade(black_box(&photo), None)))
    });

    let inputs: Vec<SheetInput> = ["A", "B", "C", "D"]
        .iter()
        .enumerate()
        .map(|(i, v)| SheetInput::new(format!("sheet-{i}"), synthetic_photo(v, i)))
        .collect();
    let mut group = c.benchmark_group("batch");
    group.sample_size(10);
    group.bench_function("grade_batch_4", |b| b.iter(|| black_box(grade_batch(&grader, &inputs))));
    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);

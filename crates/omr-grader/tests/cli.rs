#![cfg(feature = "cli")]

use assert_cmd::Command;
use omr_grader::{GradeReport, ReportOutcome};
use predicates::prelude::*;

fn omr_grade() -> Command {
    Command::cargo_bin("omr-grade").expect("binary built")
}

#[test]
fn render_then_grade_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = dir.path().join("grading.json");
    let photo = dir.path().join("sheet-b.png");
    let missing = dir.path().join("nope.png");

    omr_grade()
        .args(["reference-config", "--out"])
        .arg(&cfg)
        .assert()
        .success();
    assert!(cfg.exists());

    // version B expects option q % 5 on question q
    let answers = "BCDEA".repeat(20);
    omr_grade()
        .args(["render", "--sheet-version", "B", "--turns", "1", "--answers", &answers, "--config"])
        .arg(&cfg)
        .arg("--out")
        .arg(&photo)
        .assert()
        .success();

    let output = omr_grade()
        .args(["grade", "--config"])
        .arg(&cfg)
        .arg(&photo)
        .arg(&missing)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"graded\""))
        .get_output()
        .stdout
        .clone();

    let reports: Vec<GradeReport> = serde_json::from_slice(&output).expect("json reports");
    assert_eq!(reports.len(), 2);
    match &reports[0].outcome {
        ReportOutcome::Graded { sheet } => {
            assert_eq!(sheet.result.version.as_str(), "B");
            assert_eq!(sheet.result.total_correct, 100);
        }
        other => panic!("expected graded, got {other:?}"),
    }
    match &reports[1].outcome {
        ReportOutcome::Failed { reason, .. } => assert_eq!(reason, "image-unreadable"),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn debug_dir_collects_overlays_per_image() {
    let dir = tempfile::tempdir().expect("tempdir");
    let photo = dir.path().join("sheet-a.png");
    let blank = dir.path().join("table.png");
    let debug = dir.path().join("debug");

    omr_grade()
        .args(["render", "--sheet-version", "A", "--turns", "3", "--answers", "ABCDE", "--out"])
        .arg(&photo)
        .assert()
        .success();
    omr_grader::image_io::save_gray(&omr_grader::core::GrayImage::filled(900, 700, 190), &blank)
        .expect("write blank photo");

    omr_grade()
        .args(["grade", "--debug-dir"])
        .arg(&debug)
        .arg(&photo)
        .arg(&blank)
        .assert()
        .success()
        .stdout(predicate::str::contains("sheet-not-found"));

    assert!(debug.join("sheet-a-located.png").exists());
    assert!(debug.join("sheet-a-bubbles.png").exists());
    assert!(!debug.join("table-located.png").exists());

    let overlay = omr_grader::image_io::load_raw_image(debug.join("sheet-a-bubbles.png"))
        .expect("overlay decodes");
    assert_eq!((overlay.width(), overlay.height()), (800, 1000));
}

#[test]
fn grade_requires_images() {
    omr_grade().arg("grade").assert().failure();
}

#[test]
fn bad_answers_string_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    omr_grade()
        .args(["render", "--sheet-version", "A", "--answers", "AB?", "--out"])
        .arg(dir.path().join("x.png"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid answer"));
}

//! End-to-end grading of photographed multiple-choice answer sheets.
//!
//! This crate provides:
//! - stable re-exports of the stage crates (`omr-core`, `omr-sheet`,
//!   `omr-score`)
//! - [`SheetGrader`]: locate, rectify, classify, resolve and score one photo
//! - typed failures with stable reason codes ([`GradeError`])
//! - JSON configuration and reports ([`GradeConfig`], [`GradeReport`])
//! - [`grade_batch`] for many independent sheets (parallel with `rayon`)
//! - [`SheetGrader::debug_overlays`]: the located outline and per-bubble
//!   states drawn as grey images
//! - (feature `image`) decoding of encoded images via the `image` crate
//!
//! ## Quickstart
//!
//! ```no_run
//! use omr_grader::{image_io, GradeConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let grader = GradeConfig::load_json("grading.json")?.build_grader()?;
//! let photo = image_io::load_raw_image("scan.jpg")?;
//! match grader.grade(&photo, None) {
//!     Ok(sheet) => println!("{:.1}%", sheet.result.percentage),
//!     Err(e) => println!("{}: {e}", e.reason_code()),
//! }
//! # Ok(())
//! # }
//! ```

pub use omr_core as core;
pub use omr_score as score;
pub use omr_sheet as sheet;

mod batch;
mod error;
mod io;
mod pipeline;

#[cfg(feature = "image")]
pub mod image_io;

pub use batch::{grade_batch, BatchOutcome, SheetInput};
pub use error::{FailureCategory, GradeError};
pub use io::{GradeConfig, GradeReport, GraderIoError, ReportOutcome};
pub use pipeline::{
    DebugOverlays, GradeStages, GradedSheet, GraderParams, SheetDiagnostics, SheetGrader,
    VersionSource,
};

//! Grading many independent sheets.

use crate::error::GradeError;
use crate::pipeline::{GradedSheet, SheetGrader};
use omr_core::RawImage;
use omr_score::SheetVersion;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// One photograph with the caller's correlation id.
#[derive(Clone, Debug)]
pub struct SheetInput {
    pub id: String,
    pub image: RawImage,
    pub version_hint: Option<SheetVersion>,
}

impl SheetInput {
    pub fn new(id: impl Into<String>, image: RawImage) -> Self {
        Self {
            id: id.into(),
            image,
            version_hint: None,
        }
    }

    pub fn with_version(mut self, version: SheetVersion) -> Self {
        self.version_hint = Some(version);
        self
    }
}

#[derive(Clone, Debug)]
pub struct BatchOutcome {
    pub id: String,
    pub outcome: Result<GradedSheet, GradeError>,
}

/// Grade every input; results come back in input order, one per input.
///
/// Sheets share nothing but the grader, so with the `rayon` feature they
/// run on the global pool.
pub fn grade_batch(grader: &SheetGrader, inputs: &[SheetInput]) -> Vec<BatchOutcome> {
    let grade_one = |input: &SheetInput| BatchOutcome {
        id: input.id.clone(),
        outcome: grader.grade(&input.image, input.version_hint.as_ref()),
    };

    #[cfg(feature = "rayon")]
    let out: Vec<BatchOutcome> = inputs.par_iter().map(grade_one).collect();
    #[cfg(not(feature = "rayon"))]
    let out: Vec<BatchOutcome> = inputs.iter().map(grade_one).collect();

    let failed = out.iter().filter(|o| o.outcome.is_err()).count();
    log::info!("graded {} sheets ({} failed)", out.len(), failed);
    out
}

use omr_score::{LayoutError, ScoreError, SheetVersion, SubjectMapError};
use omr_sheet::{LocateError, RectifyError};
use serde::{Deserialize, Serialize};

/// Who has to act on a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// Retake the photograph.
    InputQuality,
    /// Fix the layout, answer keys or subject map.
    Configuration,
}

/// Typed failure of one grading run.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GradeError {
    #[error("sheet not found: {0}")]
    Locate(#[from] LocateError),
    #[error(transparent)]
    Rectify(#[from] RectifyError),
    #[error("sheet version could not be read from the version marks (set: {set:?})")]
    VersionUnresolved { set: Vec<SheetVersion> },
    #[error("sheet version {0} was supplied but is not defined by the layout")]
    UnknownVersion(SheetVersion),
    #[error("no answer key for sheet version {0}")]
    MissingAnswerKey(SheetVersion),
    #[error("two answer keys for sheet version {0}")]
    DuplicateAnswerKey(SheetVersion),
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

impl From<SubjectMapError> for GradeError {
    fn from(e: SubjectMapError) -> Self {
        GradeError::Score(ScoreError::SubjectMap(e))
    }
}

impl GradeError {
    /// Stable reason code for callers and reports.
    pub fn reason_code(&self) -> &'static str {
        match self {
            GradeError::Locate(_) | GradeError::Rectify(RectifyError::DegenerateMapping) => {
                "sheet-not-found"
            }
            GradeError::Rectify(RectifyError::OrientationAmbiguous { .. }) => "orientation-ambiguous",
            GradeError::VersionUnresolved { .. } | GradeError::UnknownVersion(_) => {
                "version-unresolved"
            }
            GradeError::MissingAnswerKey(_)
            | GradeError::Score(ScoreError::AnswerKeyIncomplete { .. }) => "answer-key-incomplete",
            GradeError::DuplicateAnswerKey(_)
            | GradeError::Score(ScoreError::AnswerKeyInvalid { .. })
            | GradeError::Score(ScoreError::VersionMismatch { .. }) => "answer-key-invalid",
            GradeError::Score(ScoreError::SubjectMap(_)) => "subject-map-invalid",
            GradeError::Layout(_) => "layout-invalid",
        }
    }

    /// Finer reason where one exists (currently the locator's).
    pub fn detail_code(&self) -> Option<&'static str> {
        match self {
            GradeError::Locate(e) => Some(e.reason_code()),
            _ => None,
        }
    }

    pub fn category(&self) -> FailureCategory {
        match self {
            GradeError::Locate(_) | GradeError::Rectify(_) | GradeError::VersionUnresolved { .. } => {
                FailureCategory::InputQuality
            }
            _ => FailureCategory::Configuration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_codes_match_the_contract() {
        let cases: Vec<(GradeError, &str, FailureCategory)> = vec![
            (
                LocateError::NoSheetRegion { regions: 0 }.into(),
                "sheet-not-found",
                FailureCategory::InputQuality,
            ),
            (
                RectifyError::OrientationAmbiguous {
                    best: 1.0,
                    runner_up: 0.5,
                }
                .into(),
                "orientation-ambiguous",
                FailureCategory::InputQuality,
            ),
            (
                GradeError::VersionUnresolved { set: vec![] },
                "version-unresolved",
                FailureCategory::InputQuality,
            ),
            (
                GradeError::MissingAnswerKey(SheetVersion::new("C")),
                "answer-key-incomplete",
                FailureCategory::Configuration,
            ),
            (
                SubjectMapError::Gap { question: 3 }.into(),
                "subject-map-invalid",
                FailureCategory::Configuration,
            ),
            (
                LayoutError::NoVersions.into(),
                "layout-invalid",
                FailureCategory::Configuration,
            ),
        ];
        for (err, code, category) in cases {
            assert_eq!(err.reason_code(), code, "{err}");
            assert_eq!(err.category(), category, "{err}");
        }
        let small: GradeError = LocateError::ImageTooSmall {
            width: 10,
            height: 10,
            min_width: 400,
            min_height: 300,
        }
        .into();
        assert_eq!(small.detail_code(), Some("image-too-small"));
    }
}

//! JSON configuration and report helpers.

use crate::error::{FailureCategory, GradeError};
use crate::pipeline::{GradedSheet, GraderParams, SheetGrader};
use omr_score::{AnswerKey, LayoutSpec, SubjectMap};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(thiserror::Error, Debug)]
pub enum GraderIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Everything needed to grade sheets: layout, one answer key per version,
/// subject ranges and optional parameter overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeConfig {
    pub layout: LayoutSpec,
    pub answer_keys: Vec<AnswerKey>,
    pub subjects: SubjectMap,
    #[serde(default)]
    pub params: GraderParams,
}

impl GradeConfig {
    /// Reference layout with four versions, keyed so that version `i`
    /// expects option `(q - 1 + i) % 5` on question `q`.
    pub fn reference() -> Self {
        let layout = LayoutSpec::reference();
        let answer_keys = layout
            .version_ids()
            .enumerate()
            .map(|(i, v)| {
                let shift = i as u32;
                AnswerKey::new(
                    v.clone(),
                    (1..=100u32).map(move |q| (q, ((q - 1 + shift) % 5) as u8)),
                )
            })
            .collect();
        Self {
            layout,
            answer_keys,
            subjects: SubjectMap::reference(),
            params: GraderParams::default(),
        }
    }

    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, GraderIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), GraderIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Validate the config and build a grader from it.
    pub fn build_grader(&self) -> Result<SheetGrader, GradeError> {
        SheetGrader::new(
            self.layout.clone(),
            &self.answer_keys,
            &self.subjects,
            self.params.clone(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportOutcome {
    Graded {
        sheet: Box<GradedSheet>,
    },
    Failed {
        reason: String,
        #[serde(default)]
        detail: Option<String>,
        category: FailureCategory,
        message: String,
    },
}

/// One line of grading output, correlated by the caller's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeReport {
    pub id: String,
    #[serde(flatten)]
    pub outcome: ReportOutcome,
}

impl GradeReport {
    pub fn from_outcome(id: impl Into<String>, outcome: Result<GradedSheet, GradeError>) -> Self {
        let outcome = match outcome {
            Ok(sheet) => ReportOutcome::Graded {
                sheet: Box::new(sheet),
            },
            Err(e) => ReportOutcome::Failed {
                reason: e.reason_code().to_string(),
                detail: e.detail_code().map(str::to_string),
                category: e.category(),
                message: e.to_string(),
            },
        };
        Self {
            id: id.into(),
            outcome,
        }
    }

    /// Failure report for an input that never reached the pipeline.
    pub fn unreadable(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            outcome: ReportOutcome::Failed {
                reason: "image-unreadable".to_string(),
                detail: None,
                category: FailureCategory::InputQuality,
                message: message.into(),
            },
        }
    }

    pub fn is_graded(&self) -> bool {
        matches!(self.outcome, ReportOutcome::Graded { .. })
    }

    /// Write reports to disk as a pretty JSON array.
    pub fn write_all_json(reports: &[GradeReport], path: impl AsRef<Path>) -> Result<(), GraderIoError> {
        let json = serde_json::to_string_pretty(reports)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omr_score::SheetVersion;
    use omr_sheet::LocateError;

    #[test]
    fn reference_config_builds_and_survives_json() {
        let cfg = GradeConfig::reference();
        assert_eq!(cfg.answer_keys.len(), 4);
        assert_eq!(cfg.answer_keys[1].answers.get(&1), Some(&1));
        assert_eq!(cfg.answer_keys[0].answers.get(&100), Some(&4));
        cfg.build_grader().expect("reference config is valid");

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        cfg.write_json(&path).expect("write");
        let back = GradeConfig::load_json(&path).expect("load");
        assert_eq!(back.layout, cfg.layout);
        assert_eq!(back.answer_keys, cfg.answer_keys);
    }

    #[test]
    fn partial_params_merge_with_defaults() {
        let mut value = serde_json::to_value(GradeConfig::reference()).expect("json");
        value["params"] = serde_json::json!({ "locator": { "threshold_radius": 9 } });
        let cfg: GradeConfig = serde_json::from_value(value).expect("parse");
        assert_eq!(cfg.params.locator.threshold_radius, 9);
        assert_eq!(cfg.params.locator.min_image_width, 400);
        assert_eq!(cfg.params.classifier.lut_samples, 24);
    }

    #[test]
    fn missing_key_is_reported_as_configuration_error() {
        let mut cfg = GradeConfig::reference();
        cfg.answer_keys.retain(|k| k.version != SheetVersion::new("C"));
        let err = cfg.build_grader().unwrap_err();
        assert_eq!(err.reason_code(), "answer-key-incomplete");
        assert_eq!(err.category(), FailureCategory::Configuration);
    }

    #[test]
    fn failed_report_carries_reason_and_detail() {
        let report = GradeReport::from_outcome(
            "scan-7",
            Err(LocateError::NoSheetRegion { regions: 3 }.into()),
        );
        let json = serde_json::to_value(&report).expect("json");
        assert_eq!(json["id"], "scan-7");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "sheet-not-found");
        assert_eq!(json["detail"], "no-sheet-region");
        assert_eq!(json["category"], "input_quality");
        let back: GradeReport = serde_json::from_value(json).expect("parse");
        assert_eq!(back, report);
    }
}

//! Photograph in, graded result out.

use crate::error::GradeError;
use log::{debug, info, warn};
use omr_core::{CornerRotation, GrayImage, GrayImageView, Quad, RawImage};
use omr_score::overlay::{bubble_overlay, located_overlay};
use omr_score::{
    resolve_answers, version_from_marks, AnswerKey, BubbleClassifier, Classification,
    ClassifierParams, FillThresholds, GradedResult, LayoutModel, LayoutSpec, QuestionAnswer, ScoringEngine,
    SheetVersion, SubjectMap, VersionMarkReading,
};
use omr_sheet::{CanonicalImage, LocatorParams, OrientationParams, Rectifier, SheetLocator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// All tuning parameters of the pipeline; every field falls back to its
/// default when omitted from JSON.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraderParams {
    pub locator: LocatorParams,
    pub orientation: OrientationParams,
    pub classifier: ClassifierParams,
}

/// Where the sheet version came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionSource {
    Hint,
    Marks,
    SingleVersion,
}

/// How the result was obtained, for logging and troubleshooting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SheetDiagnostics {
    /// Located outline in raw pixels; `None` for pre-rectified input.
    pub quad: Option<Quad>,
    pub rotation: CornerRotation,
    pub marker_contrast: f32,
    pub version_source: VersionSource,
    pub version_marks: Vec<VersionMarkReading>,
    pub thresholds: FillThresholds,
    pub ambiguous_bubbles: usize,
}

/// Successful grading of one sheet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradedSheet {
    pub result: GradedResult,
    pub answers: Vec<QuestionAnswer>,
    pub diagnostics: SheetDiagnostics,
}

/// Intermediate products of one grading run, filled in as far as the run
/// got before it finished or failed.
#[derive(Clone, Debug, Default)]
pub struct GradeStages {
    pub quad: Option<Quad>,
    pub canonical: Option<CanonicalImage>,
    pub version: Option<SheetVersion>,
    pub classification: Option<Classification>,
}

/// Debug images for one run; each is `None` when its stage was not reached.
#[derive(Clone, Debug, Default)]
pub struct DebugOverlays {
    /// The photograph with the located sheet outline.
    pub located: Option<GrayImage>,
    /// The canonical view with every bubble ringed by its state.
    pub bubbles: Option<GrayImage>,
}

/// Validated, immutable grading setup shared by every sheet.
///
/// Construction surfaces all configuration errors; afterwards only input
/// quality can make [`SheetGrader::grade`] fail.
#[derive(Clone, Debug)]
pub struct SheetGrader {
    layout: LayoutSpec,
    models: BTreeMap<SheetVersion, LayoutModel>,
    engines: BTreeMap<SheetVersion, ScoringEngine>,
    locator: SheetLocator,
    rectifier: Rectifier,
    classifier: BubbleClassifier,
}

impl SheetGrader {
    pub fn new(
        layout: LayoutSpec,
        answer_keys: &[AnswerKey],
        subjects: &SubjectMap,
        params: GraderParams,
    ) -> Result<Self, GradeError> {
        let models = layout.models()?;

        let mut keys: BTreeMap<&SheetVersion, &AnswerKey> = BTreeMap::new();
        for key in answer_keys {
            if !models.contains_key(&key.version) {
                warn!("answer key for unknown sheet version {} ignored", key.version);
                continue;
            }
            if keys.insert(&key.version, key).is_some() {
                return Err(GradeError::DuplicateAnswerKey(key.version.clone()));
            }
        }

        let mut engines = BTreeMap::new();
        for (version, model) in &models {
            let key = keys
                .get(version)
                .ok_or_else(|| GradeError::MissingAnswerKey(version.clone()))?;
            engines.insert(version.clone(), ScoringEngine::new(model, key, subjects)?);
        }

        let locator = SheetLocator::new(layout.canonical, params.locator);
        let rectifier = Rectifier::new(layout.canonical, layout.orientation_marker, params.orientation);
        let classifier = BubbleClassifier::new(params.classifier);
        Ok(Self {
            layout,
            models,
            engines,
            locator,
            rectifier,
            classifier,
        })
    }

    pub fn layout(&self) -> &LayoutSpec {
        &self.layout
    }

    pub fn model(&self, version: &SheetVersion) -> Option<&LayoutModel> {
        self.models.get(version)
    }

    /// Grade one photograph. `version_hint` overrides the printed marks.
    pub fn grade(&self, image: &RawImage, version_hint: Option<&SheetVersion>) -> Result<GradedSheet, GradeError> {
        let gray = image.to_gray();
        self.grade_gray(&gray.view(), version_hint)
    }

    pub fn grade_gray(
        &self,
        gray: &GrayImageView<'_>,
        version_hint: Option<&SheetVersion>,
    ) -> Result<GradedSheet, GradeError> {
        self.grade_gray_with_stages(gray, version_hint, &mut GradeStages::default())
    }

    /// [`SheetGrader::grade_gray`], keeping every intermediate result in
    /// `stages` for [`SheetGrader::debug_overlays`].
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(width = gray.width, height = gray.height))
    )]
    pub fn grade_gray_with_stages(
        &self,
        gray: &GrayImageView<'_>,
        version_hint: Option<&SheetVersion>,
        stages: &mut GradeStages,
    ) -> Result<GradedSheet, GradeError> {
        let location = self.locator.locate(gray)?;
        stages.quad = Some(location.quad);
        let canonical = self.rectifier.rectify(gray, &location.quad)?;
        debug!(
            "rectified with {}deg corner rotation (marker contrast {:.1})",
            canonical.rotation.degrees(),
            canonical.marker_contrast
        );
        let graded = self.grade_rectified(&canonical, version_hint, Some(location.quad), stages);
        stages.canonical = Some(canonical);
        graded
    }

    /// Render the debug images for a run recorded in `stages`.
    pub fn debug_overlays(&self, photo: &GrayImageView<'_>, stages: &GradeStages) -> DebugOverlays {
        let located = stages.quad.map(|quad| located_overlay(photo, &quad));
        let bubbles = match (&stages.canonical, &stages.version, &stages.classification) {
            (Some(canonical), Some(version), Some(classification)) => self
                .models
                .get(version)
                .map(|model| bubble_overlay(&canonical.view(), model, classification)),
            _ => None,
        };
        DebugOverlays { located, bubbles }
    }

    /// Grade an image that is already in the canonical frame.
    pub fn grade_canonical(
        &self,
        canonical: &CanonicalImage,
        version_hint: Option<&SheetVersion>,
    ) -> Result<GradedSheet, GradeError> {
        self.grade_rectified(canonical, version_hint, None, &mut GradeStages::default())
    }

    fn grade_rectified(
        &self,
        canonical: &CanonicalImage,
        version_hint: Option<&SheetVersion>,
        quad: Option<Quad>,
        stages: &mut GradeStages,
    ) -> Result<GradedSheet, GradeError> {
        let view = canonical.view();
        let (version, version_source, version_marks) = self.resolve_version(&view, version_hint)?;
        let (Some(model), Some(engine)) = (self.models.get(&version), self.engines.get(&version)) else {
            return Err(GradeError::UnknownVersion(version));
        };
        stages.version = Some(version.clone());

        let classification = self.classifier.classify(&view, model);
        let answers = resolve_answers(&classification);
        let result = engine.score(&answers);
        info!(
            "graded version {}: {}/{} correct ({} blank, {} multiple, {} ambiguous bubbles)",
            version,
            result.total_correct,
            result.total_questions,
            result.blank,
            result.multiple,
            classification.ambiguous_count()
        );

        let diagnostics = SheetDiagnostics {
            quad,
            rotation: canonical.rotation,
            marker_contrast: canonical.marker_contrast,
            version_source,
            version_marks,
            thresholds: classification.thresholds,
            ambiguous_bubbles: classification.ambiguous_count(),
        };
        stages.classification = Some(classification);
        Ok(GradedSheet {
            result,
            answers,
            diagnostics,
        })
    }

    /// Pick the sheet version: explicit hint, else exactly one set mark,
    /// else the only version of a single-version layout with no mark set.
    pub fn resolve_version(
        &self,
        canonical: &GrayImageView<'_>,
        hint: Option<&SheetVersion>,
    ) -> Result<(SheetVersion, VersionSource, Vec<VersionMarkReading>), GradeError> {
        let readings = self
            .classifier
            .read_version_marks(canonical, &self.layout.version_marks);
        if let Some(hint) = hint {
            if !self.models.contains_key(hint) {
                return Err(GradeError::UnknownVersion(hint.clone()));
            }
            if let Some(read) = version_from_marks(&readings).filter(|v| v != hint) {
                warn!("version hint {hint} overrides printed version mark {read}");
            }
            return Ok((hint.clone(), VersionSource::Hint, readings));
        }
        if let Some(v) = version_from_marks(&readings) {
            return Ok((v, VersionSource::Marks, readings));
        }
        let set: Vec<SheetVersion> = readings
            .iter()
            .filter(|r| r.set)
            .map(|r| r.version.clone())
            .collect();
        if set.is_empty() && self.models.len() == 1 {
            if let Some(only) = self.models.keys().next() {
                return Ok((only.clone(), VersionSource::SingleVersion, readings));
            }
        }
        Err(GradeError::VersionUnresolved { set })
    }
}

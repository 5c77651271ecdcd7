//! From a canonical sheet image to a graded result.
//!
//! - [`LayoutSpec`] / [`LayoutModel`]: declarative bubble positions per sheet
//!   version.
//! - [`BubbleClassifier`]: per-bubble fill measurement and tri-state
//!   classification with per-sheet [`adaptive_thresholds`].
//! - [`resolve_answers`]: one [`AnswerRecord`] per question.
//! - [`ScoringEngine`]: correctness, subject subtotals and totals.
//! - [`render`]: synthetic sheets and photographs for tests and demos.
//! - [`overlay`]: debug images of the located outline and bubble states.

mod classify;
mod layout;
pub mod overlay;
pub mod render;
mod resolve;
mod score;
mod threshold;

pub use classify::{
    classify_with, version_from_marks, BubbleClassifier, BubbleState, Classification,
    ClassifiedQuestion, ClassifierParams, FillMeasurement, VersionMarkReading,
};
pub use layout::{
    BubbleBlock, LayoutError, LayoutModel, LayoutSpec, OptionRegion, QuestionSlot, SheetVersion,
    VersionLayout, VersionMark,
};
pub use resolve::{resolve_answers, resolve_question, AnswerRecord, QuestionAnswer};
pub use score::{
    score, AnswerKey, GradedResult, QuestionOutcome, ScoreError, ScoringEngine, SubjectMap,
    SubjectMapError, SubjectRange, SubjectScore,
};
pub use threshold::{adaptive_thresholds, FillThresholds, ThresholdParams};

//! Declarative bubble layout and its per-version expansion.
//!
//! A [`LayoutSpec`] is pure data: canonical frame, printed markers and, per
//! sheet version, a list of rectangular [`BubbleBlock`]s. New versions or
//! question counts are added by editing data, never code.

use nalgebra::Point2;
use omr_core::{CanonicalSize, MarkRect};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Sheet version identifier (`"A"`, `"B"`, ...).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SheetVersion(String);

impl SheetVersion {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SheetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SheetVersion {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl FromStr for SheetVersion {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s.trim()))
    }
}

/// Printed one-hot mark identifying a version.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VersionMark {
    pub version: SheetVersion,
    pub rect: MarkRect,
}

/// Grid of `questions` rows by `options` columns of bubbles.
///
/// Question `first_question + r` sits in row `r`; option `k` is the `k`-th
/// bubble from the left.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BubbleBlock {
    pub first_question: u32,
    pub questions: u32,
    pub options: u8,
    /// Centre of option 0 of the first question, canonical pixels.
    pub origin: [f32; 2],
    /// Horizontal distance between option centres.
    pub option_pitch: f32,
    /// Vertical distance between question rows.
    pub question_pitch: f32,
}

impl BubbleBlock {
    fn min_pitch(&self) -> f32 {
        self.option_pitch.min(self.question_pitch)
    }

    pub fn center(&self, row: u32, option: u8) -> Point2<f32> {
        Point2::new(
            self.origin[0] + option as f32 * self.option_pitch,
            self.origin[1] + row as f32 * self.question_pitch,
        )
    }

    /// Cells of the block, each extended by half a pitch around the centres.
    pub fn extent(&self) -> MarkRect {
        let w = self.options as f32 * self.option_pitch;
        let h = self.questions as f32 * self.question_pitch;
        MarkRect::new(
            self.origin[0] - 0.5 * self.option_pitch,
            self.origin[1] - 0.5 * self.question_pitch,
            w,
            h,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VersionLayout {
    pub id: SheetVersion,
    pub blocks: Vec<BubbleBlock>,
}

fn default_region_fraction() -> f32 {
    0.5
}

/// Complete printed-sheet description shared by all versions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutSpec {
    pub canonical: CanonicalSize,
    /// Width of the dark border the locator looks for.
    pub frame_thickness: f32,
    /// Solid mark near the canonical top-left corner.
    pub orientation_marker: MarkRect,
    #[serde(default)]
    pub version_marks: Vec<VersionMark>,
    pub versions: Vec<VersionLayout>,
    /// Sampled region diameter as a fraction of the smaller bubble pitch.
    #[serde(default = "default_region_fraction")]
    pub region_fraction: f32,
}

/// Layout validation errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("layout defines no sheet versions")]
    NoVersions,
    #[error("sheet version {0} is defined twice")]
    DuplicateVersion(SheetVersion),
    #[error("sheet version {0} is not defined by the layout")]
    UnknownVersion(SheetVersion),
    #[error("region_fraction must be in (0, 1], got {0}")]
    InvalidRegionFraction(f32),
    #[error("version {version}: block {block} has invalid geometry")]
    InvalidBlock { version: SheetVersion, block: usize },
    #[error("version {version}: expected {expected} options per question, block {block} has {got}")]
    OptionCountMismatch {
        version: SheetVersion,
        block: usize,
        expected: u8,
        got: u8,
    },
    #[error("version {version}: questions must run 1..=N without gaps (question {question} missing or repeated)")]
    QuestionNumbering { version: SheetVersion, question: u32 },
    #[error("version {version}: blocks {a} and {b} overlap")]
    BlockOverlap {
        version: SheetVersion,
        a: usize,
        b: usize,
    },
    #[error("version {version}: block {block} leaves the canonical frame")]
    OutOfBounds { version: SheetVersion, block: usize },
    #[error("{what} lies outside the canonical frame or on a bubble block")]
    MarkerPlacement { what: String },
    #[error("version {version} has {got} questions, other versions have {expected}")]
    QuestionCountMismatch {
        version: SheetVersion,
        expected: u32,
        got: u32,
    },
}

/// One sampled bubble position in canonical coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptionRegion {
    pub center: Point2<f32>,
    /// Radius of the sampled disk.
    pub radius: f32,
    /// Free radius around the centre before the neighbouring cell starts.
    pub clearance: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuestionSlot {
    pub question: u32,
    pub options: Vec<OptionRegion>,
}

/// Expanded, validated layout for one version; slots sorted by question.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutModel {
    pub version: SheetVersion,
    pub canonical: CanonicalSize,
    pub options_per_question: u8,
    pub slots: Vec<QuestionSlot>,
}

impl LayoutModel {
    pub fn question_count(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Slot for a 1-based question index.
    pub fn slot(&self, question: u32) -> Option<&QuestionSlot> {
        let idx = question.checked_sub(1)? as usize;
        self.slots.get(idx).filter(|s| s.question == question)
    }

    pub fn regions(&self) -> impl Iterator<Item = &OptionRegion> {
        self.slots.iter().flat_map(|s| s.options.iter())
    }
}

impl LayoutSpec {
    pub fn version(&self, id: &SheetVersion) -> Option<&VersionLayout> {
        self.versions.iter().find(|v| &v.id == id)
    }

    pub fn version_ids(&self) -> impl Iterator<Item = &SheetVersion> {
        self.versions.iter().map(|v| &v.id)
    }

    /// Expand and validate the layout of one version.
    pub fn model(&self, id: &SheetVersion) -> Result<LayoutModel, LayoutError> {
        if !(self.region_fraction > 0.0 && self.region_fraction <= 1.0) {
            return Err(LayoutError::InvalidRegionFraction(self.region_fraction));
        }
        let version = self
            .version(id)
            .ok_or_else(|| LayoutError::UnknownVersion(id.clone()))?;
        let blocks = &version.blocks;
        let options = blocks.first().map(|b| b.options).unwrap_or(0);

        for (i, b) in blocks.iter().enumerate() {
            let finite = b.origin.iter().all(|v| v.is_finite())
                && b.option_pitch.is_finite()
                && b.question_pitch.is_finite();
            let numbered = b
                .questions
                .checked_sub(1)
                .and_then(|last_row| b.first_question.checked_add(last_row))
                .is_some();
            if !finite
                || !numbered
                || b.options == 0
                || b.option_pitch <= 0.0
                || b.question_pitch <= 0.0
            {
                return Err(LayoutError::InvalidBlock {
                    version: id.clone(),
                    block: i,
                });
            }
            if b.options != options {
                return Err(LayoutError::OptionCountMismatch {
                    version: id.clone(),
                    block: i,
                    expected: options,
                    got: b.options,
                });
            }
            if !self.canonical.contains(&b.extent()) {
                return Err(LayoutError::OutOfBounds {
                    version: id.clone(),
                    block: i,
                });
            }
        }
        for a in 0..blocks.len() {
            for b in (a + 1)..blocks.len() {
                if blocks[a].extent().intersects(&blocks[b].extent()) {
                    return Err(LayoutError::BlockOverlap {
                        version: id.clone(),
                        a,
                        b,
                    });
                }
            }
        }

        let mut by_question: BTreeMap<u32, QuestionSlot> = BTreeMap::new();
        for (i, b) in blocks.iter().enumerate() {
            let clearance = 0.5 * b.min_pitch();
            let radius = self.region_fraction * clearance;
            for row in 0..b.questions {
                let question = b.first_question.checked_add(row).ok_or_else(|| {
                    LayoutError::InvalidBlock {
                        version: id.clone(),
                        block: i,
                    }
                })?;
                let slot = QuestionSlot {
                    question,
                    options: (0..b.options)
                        .map(|k| OptionRegion {
                            center: b.center(row, k),
                            radius,
                            clearance,
                        })
                        .collect(),
                };
                if by_question.insert(question, slot).is_some() {
                    return Err(LayoutError::QuestionNumbering {
                        version: id.clone(),
                        question,
                    });
                }
            }
        }
        for (expected, &question) in (1u32..).zip(by_question.keys()) {
            if question != expected {
                return Err(LayoutError::QuestionNumbering {
                    version: id.clone(),
                    question: expected,
                });
            }
        }
        if by_question.is_empty() {
            return Err(LayoutError::QuestionNumbering {
                version: id.clone(),
                question: 1,
            });
        }

        self.check_marker(&self.orientation_marker, "orientation marker", blocks)?;
        for m in &self.version_marks {
            self.check_marker(&m.rect, &format!("version mark {}", m.version), blocks)?;
        }

        Ok(LayoutModel {
            version: id.clone(),
            canonical: self.canonical,
            options_per_question: options,
            slots: by_question.into_values().collect(),
        })
    }

    fn check_marker(&self, rect: &MarkRect, what: &str, blocks: &[BubbleBlock]) -> Result<(), LayoutError> {
        if !rect.is_valid()
            || !self.canonical.contains(rect)
            || blocks.iter().any(|b| b.extent().intersects(rect))
        {
            return Err(LayoutError::MarkerPlacement {
                what: what.to_string(),
            });
        }
        Ok(())
    }

    /// Validate every version and expand them all.
    ///
    /// All versions must share the question count so a single subject map
    /// applies regardless of the version read from the sheet.
    pub fn models(&self) -> Result<BTreeMap<SheetVersion, LayoutModel>, LayoutError> {
        if self.versions.is_empty() {
            return Err(LayoutError::NoVersions);
        }
        let mut seen = BTreeSet::new();
        for v in &self.versions {
            if !seen.insert(&v.id) {
                return Err(LayoutError::DuplicateVersion(v.id.clone()));
            }
        }
        for m in &self.version_marks {
            if self.version(&m.version).is_none() {
                return Err(LayoutError::UnknownVersion(m.version.clone()));
            }
        }

        let mut out = BTreeMap::new();
        let mut expected: Option<u32> = None;
        for v in &self.versions {
            let model = self.model(&v.id)?;
            let got = model.question_count();
            match expected {
                Some(n) if n != got => {
                    return Err(LayoutError::QuestionCountMismatch {
                        version: v.id.clone(),
                        expected: n,
                        got,
                    });
                }
                _ => expected = Some(got),
            }
            out.insert(v.id.clone(), model);
        }
        Ok(out)
    }

    /// Reference sheet: 800x1000 canonical, 100 questions x 5 options in five
    /// columns of 20, versions A-D printing the columns in different orders.
    pub fn reference() -> Self {
        const COLUMN_ORDERS: [(&str, [u32; 5]); 4] = [
            ("A", [0, 1, 2, 3, 4]),
            ("B", [4, 3, 2, 1, 0]),
            ("C", [2, 3, 4, 0, 1]),
            ("D", [1, 0, 4, 3, 2]),
        ];
        let versions = COLUMN_ORDERS
            .iter()
            .map(|(id, order)| VersionLayout {
                id: SheetVersion::new(*id),
                blocks: order
                    .iter()
                    .enumerate()
                    .map(|(column, &group)| BubbleBlock {
                        first_question: group * 20 + 1,
                        questions: 20,
                        options: 5,
                        origin: [50.0 + 150.0 * column as f32, 120.0],
                        option_pitch: 28.0,
                        question_pitch: 40.0,
                    })
                    .collect(),
            })
            .collect();
        let version_marks = COLUMN_ORDERS
            .iter()
            .enumerate()
            .map(|(i, (id, _))| VersionMark {
                version: SheetVersion::new(*id),
                rect: MarkRect::new(560.0 + 40.0 * i as f32, 40.0, 24.0, 24.0),
            })
            .collect();
        Self {
            canonical: CanonicalSize::new(800, 1000),
            frame_thickness: 10.0,
            orientation_marker: MarkRect::new(24.0, 24.0, 40.0, 40.0),
            version_marks,
            versions,
            region_fraction: default_region_fraction(),
        }
    }
}

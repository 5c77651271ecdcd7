use crate::layout::{LayoutModel, OptionRegion, SheetVersion, VersionMark};
use crate::threshold::{adaptive_thresholds, FillThresholds, ThresholdParams};
use log::debug;
use nalgebra::Point2;
use omr_core::{sample_point, GrayImageView};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Per-bubble decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BubbleState {
    Unmarked,
    Marked,
    Ambiguous,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierParams {
    /// Directions in the shared unit-circle table.
    pub lut_samples: usize,
    /// Concentric sampling circles inside the region (plus its centre).
    pub disk_circles: usize,
    /// Background annulus radii as multiples of the region radius; the outer
    /// radius is capped by the region clearance.
    pub ring_inner_mul: f32,
    pub ring_outer_mul: f32,
    pub ring_circles: usize,
    pub thresholds: ThresholdParams,
    /// Version-mark sampling: interior inset, surround growth and the fill a
    /// mark needs to count as set.
    pub version_mark_inset: f32,
    pub version_mark_band: f32,
    pub version_mark_min_fill: f32,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            lut_samples: 24,
            disk_circles: 3,
            ring_inner_mul: 1.65,
            ring_outer_mul: 1.95,
            ring_circles: 2,
            thresholds: ThresholdParams::default(),
            version_mark_inset: 0.2,
            version_mark_band: 0.5,
            version_mark_min_fill: 0.5,
        }
    }
}

/// Darkness of one bubble relative to its surroundings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FillMeasurement {
    /// Normalized fill in `[0, 1]`.
    pub fill: f32,
    /// Mean grey level inside the region.
    pub interior: f32,
    /// Local paper estimate from the annulus.
    pub background: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedQuestion {
    pub question: u32,
    pub fills: Vec<FillMeasurement>,
    pub states: Vec<BubbleState>,
}

/// Classifier output for a whole sheet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub thresholds: FillThresholds,
    pub questions: Vec<ClassifiedQuestion>,
}

impl Classification {
    pub fn ambiguous_count(&self) -> usize {
        self.count(BubbleState::Ambiguous)
    }

    pub fn marked_count(&self) -> usize {
        self.count(BubbleState::Marked)
    }

    fn count(&self, state: BubbleState) -> usize {
        self.questions
            .iter()
            .flat_map(|q| q.states.iter())
            .filter(|&&s| s == state)
            .count()
    }
}

/// Fill reading of one printed version mark.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VersionMarkReading {
    pub version: SheetVersion,
    pub fill: f32,
    pub set: bool,
}

/// Measures bubbles on a canonical image and classifies them with
/// thresholds derived from the same sheet.
#[derive(Clone, Debug)]
pub struct BubbleClassifier {
    params: ClassifierParams,
    dirs: Vec<(f32, f32)>,
}

impl BubbleClassifier {
    pub fn new(params: ClassifierParams) -> Self {
        let dirs = build_unit_circle_lut(params.lut_samples.max(4));
        Self { params, dirs }
    }

    pub fn params(&self) -> &ClassifierParams {
        &self.params
    }

    /// Interior vs annulus darkness of one region.
    pub fn measure(&self, img: &GrayImageView<'_>, region: &OptionRegion) -> FillMeasurement {
        let p = &self.params;
        let c = region.center;
        let r = region.radius.max(0.5);

        let mut acc = sample_point(img, c);
        let mut n = 1usize;
        let disk_circles = p.disk_circles.max(1);
        for k in 1..=disk_circles {
            let rad = r * k as f32 / disk_circles as f32;
            for &(dx, dy) in &self.dirs {
                acc += sample_point(img, Point2::new(c.x + rad * dx, c.y + rad * dy));
                n += 1;
            }
        }
        let interior = acc / n as f32;

        let clearance = region.clearance.max(r);
        let r0 = (p.ring_inner_mul * r).min(clearance);
        let r1 = (p.ring_outer_mul * r).min(clearance).max(r0);
        let ring_circles = p.ring_circles.max(1);
        let mut ring = Vec::with_capacity(ring_circles * self.dirs.len());
        for k in 0..ring_circles {
            let t = if ring_circles == 1 {
                0.5
            } else {
                k as f32 / (ring_circles - 1) as f32
            };
            let rad = r0 + t * (r1 - r0);
            for &(dx, dy) in &self.dirs {
                ring.push(sample_point(img, Point2::new(c.x + rad * dx, c.y + rad * dy)));
            }
        }
        let background = median(&mut ring).unwrap_or(interior);

        FillMeasurement {
            fill: normalized_fill(interior, background),
            interior,
            background,
        }
    }

    /// Measure every bubble of the layout, question by question.
    pub fn measure_all(&self, img: &GrayImageView<'_>, layout: &LayoutModel) -> Vec<(u32, Vec<FillMeasurement>)> {
        layout
            .slots
            .iter()
            .map(|slot| {
                let fills = slot.options.iter().map(|r| self.measure(img, r)).collect();
                (slot.question, fills)
            })
            .collect()
    }

    /// Measure, derive this sheet's thresholds, classify.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(questions = layout.slots.len()))
    )]
    pub fn classify(&self, img: &GrayImageView<'_>, layout: &LayoutModel) -> Classification {
        let measured = self.measure_all(img, layout);
        let all: Vec<f32> = measured
            .iter()
            .flat_map(|(_, f)| f.iter().map(|m| m.fill))
            .collect();
        let thresholds = adaptive_thresholds(&all, &self.params.thresholds);
        debug!(
            "classifier: {} bubbles, thresholds low={:.3} high={:.3} bimodal={}",
            all.len(),
            thresholds.low,
            thresholds.high,
            thresholds.bimodal
        );
        classify_with(measured, thresholds)
    }

    /// Fill of each printed version mark; `set` when above the mark threshold.
    pub fn read_version_marks(&self, img: &GrayImageView<'_>, marks: &[VersionMark]) -> Vec<VersionMarkReading> {
        let p = &self.params;
        marks
            .iter()
            .map(|m| {
                let inner = m.rect.inset(p.version_mark_inset);
                let outer = m.rect.inset(-p.version_mark_band);
                let interior = mean(inner.grid_points(5).map(|q| sample_point(img, q)));
                let mut band: Vec<f32> = outer
                    .grid_points(11)
                    .filter(|q| !inside(&m.rect, *q))
                    .map(|q| sample_point(img, q))
                    .collect();
                let background = median(&mut band).unwrap_or(interior);
                let fill = normalized_fill(interior, background);
                VersionMarkReading {
                    version: m.version.clone(),
                    fill,
                    set: fill > p.version_mark_min_fill,
                }
            })
            .collect()
    }
}

impl Default for BubbleClassifier {
    fn default() -> Self {
        Self::new(ClassifierParams::default())
    }
}

/// Apply fixed thresholds to already measured fills.
pub fn classify_with(measured: Vec<(u32, Vec<FillMeasurement>)>, thresholds: FillThresholds) -> Classification {
    let questions = measured
        .into_iter()
        .map(|(question, fills)| {
            let states = fills.iter().map(|m| thresholds.classify(m.fill)).collect();
            ClassifiedQuestion {
                question,
                fills,
                states,
            }
        })
        .collect();
    Classification {
        thresholds,
        questions,
    }
}

/// The one version whose mark is set, if exactly one is.
pub fn version_from_marks(readings: &[VersionMarkReading]) -> Option<SheetVersion> {
    let mut set = readings.iter().filter(|r| r.set);
    match (set.next(), set.next()) {
        (Some(only), None) => Some(only.version.clone()),
        _ => None,
    }
}

#[inline]
fn normalized_fill(interior: f32, background: f32) -> f32 {
    ((background - interior) / background.max(1.0)).clamp(0.0, 1.0)
}

fn inside(rect: &omr_core::MarkRect, q: Point2<f32>) -> bool {
    q.x >= rect.x && q.y >= rect.y && q.x <= rect.x + rect.w && q.y <= rect.y + rect.h
}

fn mean(values: impl Iterator<Item = f32>) -> f32 {
    let (sum, n) = values.fold((0.0f32, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f32
    }
}

fn median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    Some(values[values.len() / 2])
}

fn build_unit_circle_lut(samples: usize) -> Vec<(f32, f32)> {
    let step = std::f32::consts::TAU / samples as f32;
    (0..samples)
        .map(|k| {
            let (sin_t, cos_t) = (k as f32 * step).sin_cos();
            (cos_t, sin_t)
        })
        .collect()
}

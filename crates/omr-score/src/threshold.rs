//! Per-sheet decision thresholds derived from the sheet's own fill values.

use crate::classify::BubbleState;
use serde::{Deserialize, Serialize};

/// Tuning of [`adaptive_thresholds`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdParams {
    /// Minimum gap between the two class means to trust a bimodal split.
    pub min_separation: f32,
    /// Half-width of the ambiguous band as a fraction of the class gap.
    pub ambiguity_frac: f32,
    /// Decision centre used when the distribution is not bimodal.
    pub unimodal_center: f32,
    pub unimodal_half_band: f32,
    /// Floors and ceilings applied to the final thresholds.
    pub min_low: f32,
    pub min_high: f32,
    pub max_high: f32,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self {
            min_separation: 0.3,
            ambiguity_frac: 0.2,
            unimodal_center: 0.5,
            unimodal_half_band: 0.1,
            min_low: 0.2,
            min_high: 0.35,
            max_high: 0.85,
        }
    }
}

/// Two-threshold decision rule for one sheet.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FillThresholds {
    pub low: f32,
    pub high: f32,
    pub center: f32,
    /// Whether the thresholds came from a bimodal split.
    pub bimodal: bool,
}

impl FillThresholds {
    pub fn fixed(low: f32, high: f32) -> Self {
        Self {
            low,
            high,
            center: 0.5 * (low + high),
            bimodal: false,
        }
    }

    /// `< low` unmarked, `> high` marked, otherwise ambiguous.
    #[inline]
    pub fn classify(&self, fill: f32) -> BubbleState {
        if fill < self.low {
            BubbleState::Unmarked
        } else if fill > self.high {
            BubbleState::Marked
        } else {
            BubbleState::Ambiguous
        }
    }
}

/// Derive low/high thresholds from the distribution of one sheet's fills.
///
/// Fills are split with Otsu's method. When the two class means are far
/// enough apart the decision centre is their midpoint and the ambiguous band
/// scales with the gap; otherwise the sheet is treated as unimodal (all blank
/// or all filled) and the fallback centre is used.
pub fn adaptive_thresholds(fills: &[f32], params: &ThresholdParams) -> FillThresholds {
    let samples: Vec<u8> = fills
        .iter()
        .filter(|f| f.is_finite())
        .map(|f| (f.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();

    let split = otsu_threshold(&samples).and_then(|t| class_means(&samples, t));
    let (center, half_band, bimodal) = match split {
        Some((lo, hi)) if hi - lo >= params.min_separation => {
            let gap = hi - lo;
            (0.5 * (lo + hi), params.ambiguity_frac * gap, true)
        }
        _ => (params.unimodal_center, params.unimodal_half_band, false),
    };

    let high = (center + half_band).min(params.max_high).max(params.min_high);
    let low = (center - half_band).max(params.min_low).min(high);
    FillThresholds {
        low,
        high,
        center,
        bimodal,
    }
}

/// Mean fill (0..1) of the samples at or below and above `t`.
fn class_means(samples: &[u8], t: u8) -> Option<(f32, f32)> {
    let (mut sum_lo, mut n_lo, mut sum_hi, mut n_hi) = (0u64, 0u64, 0u64, 0u64);
    for &v in samples {
        if v <= t {
            sum_lo += v as u64;
            n_lo += 1;
        } else {
            sum_hi += v as u64;
            n_hi += 1;
        }
    }
    if n_lo == 0 || n_hi == 0 {
        return None;
    }
    let lo = sum_lo as f32 / n_lo as f32 / 255.0;
    let hi = sum_hi as f32 / n_hi as f32 / 255.0;
    Some((lo, hi))
}

/// Otsu threshold on 8-bit samples; `None` for empty input.
fn otsu_threshold(samples: &[u8]) -> Option<u8> {
    let (&first, rest) = samples.split_first()?;
    let (min_v, max_v) = rest
        .iter()
        .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if min_v == max_v {
        return Some(min_v);
    }

    let mut hist = [0u32; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }
    if hist.iter().filter(|&&h| h > 0).count() <= 2 {
        return Some(((min_v as u16 + max_v as u16) / 2) as u8);
    }

    let total = samples.len() as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = min_v;
    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }
        sum_b += t as f64 * h as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;
        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }
    Some(best_t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn bimodal_sheet_gets_midpoint_thresholds() {
        let mut fills = vec![0.02f32; 380];
        fills.extend(std::iter::repeat(0.82).take(20));
        let t = adaptive_thresholds(&fills, &ThresholdParams::default());
        assert!(t.bimodal);
        assert_relative_eq!(t.center, 0.42, epsilon = 0.01);
        assert!(t.low < t.center && t.center < t.high);
        assert_eq!(t.classify(0.05), BubbleState::Unmarked);
        assert_eq!(t.classify(0.8), BubbleState::Marked);
        assert_eq!(t.classify(0.42), BubbleState::Ambiguous);
    }

    #[test]
    fn faint_exposure_shifts_thresholds_down() {
        let mut bright = vec![0.0f32; 90];
        bright.extend(std::iter::repeat(0.9).take(10));
        let mut faint = vec![0.0f32; 90];
        faint.extend(std::iter::repeat(0.5).take(10));
        let p = ThresholdParams::default();
        let tb = adaptive_thresholds(&bright, &p);
        let tf = adaptive_thresholds(&faint, &p);
        assert!(tf.high < tb.high);
        assert_eq!(tf.classify(0.5), BubbleState::Marked);
    }

    #[test]
    fn blank_sheet_falls_back_to_unimodal_rule() {
        let fills: Vec<f32> = (0..500).map(|i| (i % 7) as f32 * 0.01).collect();
        let t = adaptive_thresholds(&fills, &ThresholdParams::default());
        assert!(!t.bimodal);
        assert_relative_eq!(t.low, 0.4);
        assert_relative_eq!(t.high, 0.6);
        assert!(fills.iter().all(|&f| t.classify(f) == BubbleState::Unmarked));
    }

    #[test]
    fn empty_and_non_finite_inputs_do_not_panic() {
        let p = ThresholdParams::default();
        let t = adaptive_thresholds(&[], &p);
        assert!(!t.bimodal);
        let t = adaptive_thresholds(&[f32::NAN, 0.1], &p);
        assert!(t.low <= t.high);
    }

    #[test]
    fn thresholds_respect_clamps() {
        let mut fills = vec![0.6f32; 50];
        fills.extend(std::iter::repeat(1.0).take(50));
        let p = ThresholdParams {
            min_separation: 0.1,
            ..ThresholdParams::default()
        };
        let t = adaptive_thresholds(&fills, &p);
        assert!(t.high <= p.max_high + 1e-6);
        assert!(t.low >= p.min_low);
    }
}

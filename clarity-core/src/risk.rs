//! Window risk, clarity score, tiers, and flagging
//!
//! Global invariants enforced:
//! - Risk is linear in weights and severities
//! - Risk values are clamped into [0, 10] before aggregation across windows
//! - Clarity scores are integers in [0, 100]
//! - One tier lookup, driven by the tier table it is given

use crate::signal::{SeverityMap, WeightTable};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Upper bound of the stable risk band
pub const MAX_RISK: f64 = 10.0;

/// Score reported when there are no windows to average
pub const DEFAULT_CLARITY_SCORE: u32 = 50;

pub const DEFAULT_CLARITY_NORMALIZATION: f64 = 8.0;

/// Clamp a risk value into [0, 10]; NaN becomes 0
pub fn clamp_risk(risk: f64) -> f64 {
    if risk.is_nan() {
        0.0
    } else {
        risk.clamp(0.0, MAX_RISK)
    }
}

/// Weighted risk for one window
///
/// Formula:
/// risk = sum(weight[signal] * severity[signal]) over the signals in the map
pub fn compute_risk(severities: &SeverityMap, weights: &WeightTable) -> f64 {
    severities
        .iter()
        .map(|(signal, severity)| weights.weight(signal) * f64::from(severity.value()))
        .sum()
}

/// Overall clarity from accumulated window risk
///
/// Formula:
/// clarity = clamp(100 - (total_risk / num_windows) * normalization, 0, 100), truncated
pub fn clarity_score(total_risk: f64, num_windows: usize, normalization: f64) -> u32 {
    if num_windows == 0 {
        return DEFAULT_CLARITY_SCORE;
    }

    let avg_risk = total_risk / num_windows as f64;
    let penalty = avg_risk * normalization;
    let clarity = (100.0 - penalty).clamp(0.0, 100.0);
    // NaN casts to 0
    clarity as u32
}

/// One entry of the tier table: scores at or above `min_score` get `label`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(u32, String)", into = "(u32, String)")]
pub struct ClarityTier {
    pub min_score: u32,
    pub label: String,
}

impl ClarityTier {
    pub fn new(min_score: u32, label: &str) -> Self {
        ClarityTier {
            min_score,
            label: label.to_string(),
        }
    }
}

impl From<(u32, String)> for ClarityTier {
    fn from((min_score, label): (u32, String)) -> Self {
        ClarityTier { min_score, label }
    }
}

impl From<ClarityTier> for (u32, String) {
    fn from(tier: ClarityTier) -> Self {
        (tier.min_score, tier.label)
    }
}

pub fn default_tiers() -> Vec<ClarityTier> {
    vec![
        ClarityTier::new(90, "Judge Whisperer"),
        ClarityTier::new(70, "Solid Senior Engineer"),
        ClarityTier::new(50, "Wait...what are we building?"),
        ClarityTier::new(0, "3AM Red Bull PowerPoint"),
    ]
}

/// Check that a tier table is usable by `clarity_tier`
///
/// The table must be non-empty, strictly descending, within 0..=100, and end
/// with a catch-all entry at 0.
pub fn validate_tiers(tiers: &[ClarityTier]) -> Result<()> {
    let Some(last) = tiers.last() else {
        anyhow::bail!("clarity_tiers must not be empty");
    };

    for tier in tiers {
        if tier.min_score > 100 {
            anyhow::bail!(
                "clarity tier '{}' has min_score {} (must be at most 100)",
                tier.label,
                tier.min_score
            );
        }
    }

    for pair in tiers.windows(2) {
        if pair[0].min_score <= pair[1].min_score {
            anyhow::bail!(
                "clarity_tiers must be strictly descending ({} then {})",
                pair[0].min_score,
                pair[1].min_score
            );
        }
    }

    if last.min_score != 0 {
        anyhow::bail!(
            "last clarity tier must have min_score 0 (got {})",
            last.min_score
        );
    }

    Ok(())
}

/// Tier label for a clarity score
///
/// Tiers are scanned from highest threshold to lowest; the first one the score
/// meets wins, and the last entry is the catch-all.
pub fn clarity_tier(score: u32, tiers: &[ClarityTier]) -> &str {
    tiers
        .iter()
        .find(|tier| score >= tier.min_score)
        .or_else(|| tiers.last())
        .map(|tier| tier.label.as_str())
        .unwrap_or_default()
}

/// Thresholds for surfacing a window to the user
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlagPolicy {
    pub risk_threshold: f64,
    pub min_active_signals: usize,
}

impl Default for FlagPolicy {
    fn default() -> Self {
        FlagPolicy {
            risk_threshold: 4.0,
            min_active_signals: 2,
        }
    }
}

/// Flag a window when its risk reaches the threshold, or when enough
/// signals are active; either condition alone is sufficient
pub fn should_flag(risk: f64, severities: &SeverityMap, policy: &FlagPolicy) -> bool {
    risk >= policy.risk_threshold || severities.active_count() >= policy.min_active_signals
}

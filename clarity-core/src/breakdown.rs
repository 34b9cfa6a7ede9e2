//! Signal breakdown - which signals dominate overall risk
//!
//! Produces the donut-chart summary: one row per signal with its accumulated
//! weight, share of the total, and the number of segments it touched.
//!
//! Global invariants enforced:
//! - A signal repeated within one segment counts once for that segment
//! - Known signals lead in canonical order, unknown signals follow in first-seen order
//! - Returned percentages sum to exactly 100.00 when total weight > 0
//! - Rows with zero weight are tallied but not returned

use crate::risk::clamp_risk;
use crate::round_to;
use crate::segment::Segment;
use crate::signal::Signal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// How a segment contributes to each signal it triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakdownMode {
    /// Contribute the segment's clamped risk
    #[default]
    Weighted,
    /// Contribute 1.0
    Count,
}

impl BreakdownMode {
    /// Parse a mode name, falling back to `Weighted` for anything unrecognised
    pub fn parse_or_default(name: &str) -> Self {
        match name {
            "weighted" => BreakdownMode::Weighted,
            "count" => BreakdownMode::Count,
            other => {
                log::warn!("unknown breakdown mode '{}', using weighted", other);
                BreakdownMode::Weighted
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BreakdownMode::Weighted => "weighted",
            BreakdownMode::Count => "count",
        }
    }
}

/// Accumulated totals for one signal, before rounding or filtering
#[derive(Debug, Clone, PartialEq)]
pub struct SignalTally {
    pub signal: Signal,
    pub weight: f64,
    pub segments: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BreakdownItem {
    pub signal: Signal,
    pub weight: f64,
    /// Share of the total in hundredths, by largest remainder
    ///
    /// Rows sum to exactly 100.00, so a row may sit 0.01 away from its own
    /// rounded share (1/7 can come out as 14.28).
    pub percent: f64,
    pub segments: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SignalBreakdown {
    pub mode: BreakdownMode,
    pub total_weight: f64,
    pub items: Vec<BreakdownItem>,
}

/// Builds breakdowns against a list of always-present signals
#[derive(Debug, Clone)]
pub struct BreakdownBuilder {
    known: Vec<Signal>,
}

impl Default for BreakdownBuilder {
    fn default() -> Self {
        BreakdownBuilder {
            known: Signal::KNOWN.to_vec(),
        }
    }
}

impl BreakdownBuilder {
    /// Use a custom list of signals that are always seeded at zero
    pub fn with_known(known: Vec<Signal>) -> Self {
        BreakdownBuilder { known }
    }

    /// Every signal's totals, zero rows included, in output order
    pub fn tally(&self, segments: &[Segment], mode: BreakdownMode) -> Vec<SignalTally> {
        let mut rows: Vec<SignalTally> = Vec::with_capacity(self.known.len());
        let mut index: HashMap<Signal, usize> = HashMap::new();

        for signal in &self.known {
            if !index.contains_key(signal) {
                index.insert(signal.clone(), rows.len());
                rows.push(SignalTally {
                    signal: signal.clone(),
                    weight: 0.0,
                    segments: 0,
                });
            }
        }

        for segment in segments {
            let contribution = match mode {
                BreakdownMode::Count => 1.0,
                BreakdownMode::Weighted => clamp_risk(segment.risk),
            };

            let mut seen: HashSet<&Signal> = HashSet::new();
            for signal in &segment.signals_triggered {
                if !seen.insert(signal) {
                    continue;
                }
                let row = *index.entry(signal.clone()).or_insert_with(|| {
                    rows.push(SignalTally {
                        signal: signal.clone(),
                        weight: 0.0,
                        segments: 0,
                    });
                    rows.len() - 1
                });
                rows[row].weight += contribution;
                rows[row].segments += 1;
            }
        }

        rows
    }

    pub fn build(&self, segments: &[Segment], mode: BreakdownMode) -> SignalBreakdown {
        let rows = self.tally(segments, mode);
        let total: f64 = rows.iter().map(|r| r.weight).sum();
        let weights: Vec<f64> = rows.iter().map(|r| r.weight).collect();
        let percents = distribute_percent(&weights, total);

        let items = rows
            .into_iter()
            .zip(percents)
            .filter(|(row, _)| row.weight > 0.0)
            .map(|(row, percent)| BreakdownItem {
                signal: row.signal,
                weight: round_to(row.weight, 2),
                percent,
                segments: row.segments,
            })
            .collect();

        SignalBreakdown {
            mode,
            total_weight: round_to(total, 2),
            items,
        }
    }
}

/// Breakdown over the six known signals, accepting any mode string
pub fn compute_signal_breakdown(segments: &[Segment], mode: &str) -> SignalBreakdown {
    BreakdownBuilder::default().build(segments, BreakdownMode::parse_or_default(mode))
}

/// Percent shares rounded to hundredths by largest remainder
///
/// Every share lands within 0.01 of its exact value and the shares sum to
/// exactly 100.00. Ties go to the earlier row.
fn distribute_percent(weights: &[f64], total: f64) -> Vec<f64> {
    if total <= 0.0 {
        return vec![0.0; weights.len()];
    }

    const UNITS: u64 = 10_000;
    let exact: Vec<f64> = weights
        .iter()
        .map(|w| w / total * UNITS as f64)
        .collect();
    let mut units: Vec<u64> = exact.iter().map(|e| e.floor() as u64).collect();
    let assigned: u64 = units.iter().sum();
    let leftover = UNITS.saturating_sub(assigned) as usize;

    let mut by_remainder: Vec<usize> = (0..weights.len()).filter(|&i| weights[i] > 0.0).collect();
    by_remainder.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.partial_cmp(&ra)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.cmp(&b))
    });
    for &i in by_remainder.iter().take(leftover) {
        units[i] += 1;
    }

    units.iter().map(|&u| u as f64 / 100.0).collect()
}

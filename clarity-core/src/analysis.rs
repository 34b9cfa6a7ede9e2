//! Per-window scoring pipeline
//!
//! Global invariants enforced:
//! - Every window is validated before any window is scored
//! - Order-dependent inputs (prior term averages, role prefixes) are computed
//!   sequentially; severity evaluation then runs in parallel
//! - Results keep input order regardless of evaluation order
//! - Window risk is clamped into [0, 10] before it enters the clarity total

use crate::breakdown::{BreakdownBuilder, BreakdownMode, SignalBreakdown};
use crate::config::ResolvedConfig;
use crate::lexicon::{ClaimEvidence, ClaimLexicon, FillerLexicon};
use crate::ramble::{RambleAnalyzer, RambleResult};
use crate::risk::{
    clamp_risk, clarity_score, clarity_tier, compute_risk, should_flag, ClarityTier, FlagPolicy,
};
use crate::segment::Segment;
use crate::severity::{
    concept_spike_severity, grounding_gap_severity, structure_order_severity, tmb_severity,
    SpikeThresholds, StructureCheck,
};
use crate::signal::{SeverityMap, Signal, WeightTable};
use crate::timeline::{build_timeline, Timeline};
use crate::window::WindowObservation;
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Scored outcome for one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WindowResult {
    pub window_id: String,
    pub start_sec: f64,
    pub end_sec: f64,
    pub risk: f64,
    pub flagged: bool,
    pub severities: SeverityMap,
    pub signals_triggered: Vec<Signal>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub structure_violations: Vec<String>,
    pub claims: Vec<String>,
    pub evidence: Vec<String>,
    pub ramble: RambleResult,
}

impl WindowResult {
    pub fn to_segment(&self) -> Result<Segment> {
        Segment::new(
            self.window_id.clone(),
            self.start_sec,
            self.end_sec,
            self.risk,
            self.signals_triggered.clone(),
        )
    }
}

/// Complete analysis of one presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ClarityReport {
    pub clarity_score: u32,
    pub tier: String,
    pub window_count: usize,
    pub total_risk: f64,
    pub flagged_count: usize,
    pub windows: Vec<WindowResult>,
    pub breakdown: SignalBreakdown,
    pub timeline: Timeline,
}

impl ClarityReport {
    pub fn flagged(&self) -> impl Iterator<Item = &WindowResult> {
        self.windows.iter().filter(|w| w.flagged)
    }
}

/// Order-dependent context for one window, computed before parallel scoring
struct WindowContext {
    previous_avg: f64,
    structure: StructureCheck,
}

/// Scoring engine holding the per-run configuration and injected lexicons
#[derive(Debug, Clone)]
pub struct ClarityEngine {
    weights: WeightTable,
    flag_policy: FlagPolicy,
    spike: SpikeThresholds,
    ramble: RambleAnalyzer,
    claims: ClaimLexicon,
    normalization: f64,
    tiers: Vec<ClarityTier>,
    bin_size_sec: f64,
    breakdown: BreakdownBuilder,
    breakdown_mode: BreakdownMode,
}

impl Default for ClarityEngine {
    fn default() -> Self {
        ClarityEngine::new(&ResolvedConfig::default())
    }
}

impl ClarityEngine {
    pub fn new(config: &ResolvedConfig) -> Self {
        ClarityEngine {
            weights: config.signal_weights.clone(),
            flag_policy: config.flag_policy(),
            spike: config.spike_thresholds(),
            ramble: RambleAnalyzer::new(FillerLexicon::default(), config.ramble_thresholds()),
            claims: ClaimLexicon::default(),
            normalization: config.clarity_normalization,
            tiers: config.clarity_tiers.clone(),
            bin_size_sec: config.bin_size_sec,
            breakdown: BreakdownBuilder::default(),
            breakdown_mode: config.breakdown_mode,
        }
    }

    /// Replace the default filler and claim/evidence word lists
    pub fn with_lexicons(mut self, fillers: FillerLexicon, claims: ClaimLexicon) -> Self {
        self.ramble = RambleAnalyzer::new(fillers, self.ramble.thresholds());
        self.claims = claims;
        self
    }

    /// Score every window and build the summary artifacts
    ///
    /// `duration_sec` bounds the timeline; when absent it is derived from the
    /// last window end.
    pub fn analyze(
        &self,
        windows: &[WindowObservation],
        duration_sec: Option<f64>,
    ) -> Result<ClarityReport> {
        for (index, window) in windows.iter().enumerate() {
            window
                .validate()
                .with_context(|| format!("invalid window at index {}", index))?;
        }

        let contexts = window_contexts(windows);
        let results: Vec<WindowResult> = windows
            .par_iter()
            .zip(contexts.par_iter())
            .map(|(window, ctx)| self.score_window(window, ctx))
            .collect();

        let segments = results
            .iter()
            .map(WindowResult::to_segment)
            .collect::<Result<Vec<_>>>()?;

        let total_risk: f64 = results.iter().map(|r| clamp_risk(r.risk)).sum();
        let score = clarity_score(total_risk, results.len(), self.normalization);
        let tier = clarity_tier(score, &self.tiers).to_string();
        let flagged_count = results.iter().filter(|r| r.flagged).count();

        log::debug!(
            "scored {} windows: total risk {:.2}, clarity {} ({}), {} flagged",
            results.len(),
            total_risk,
            score,
            tier,
            flagged_count
        );

        Ok(ClarityReport {
            clarity_score: score,
            tier,
            window_count: results.len(),
            total_risk,
            flagged_count,
            breakdown: self.breakdown.build(&segments, self.breakdown_mode),
            timeline: build_timeline(&segments, duration_sec, self.bin_size_sec),
            windows: results,
        })
    }

    fn score_window(&self, window: &WindowObservation, ctx: &WindowContext) -> WindowResult {
        let ClaimEvidence { claims, evidence } = match (&window.claims, &window.evidence) {
            (None, None) => self.claims.detect(&window.text),
            (claims, evidence) => ClaimEvidence {
                claims: claims.clone().unwrap_or_default(),
                evidence: evidence.clone().unwrap_or_default(),
            },
        };

        let ramble = self.ramble.analyze(&window.text);

        let mut severities = SeverityMap::new()
            .with(
                Signal::ConceptSpike,
                concept_spike_severity(window.new_terms.len(), ctx.previous_avg, &self.spike),
            )
            .with(
                Signal::GroundingGap,
                grounding_gap_severity(&window.ungrounded_terms),
            )
            .with(Signal::Tmb, tmb_severity(&claims, &evidence))
            .with(Signal::RambleRatio, ramble.severity)
            .with(Signal::StructureOrder, ctx.structure.severity);
        if let Some(visual) = window.visual_mismatch {
            severities = severities.with(Signal::VisualMismatch, visual);
        }

        let risk = compute_risk(&severities, &self.weights);
        let flagged = should_flag(risk, &severities, &self.flag_policy);

        log::debug!(
            "window {}: risk {:.2}, flagged {}, active {}",
            window.window_id,
            risk,
            flagged,
            severities.active_count()
        );

        WindowResult {
            window_id: window.window_id.clone(),
            start_sec: window.start_sec,
            end_sec: window.end_sec,
            risk,
            flagged,
            signals_triggered: severities.triggered(),
            severities,
            structure_violations: ctx
                .structure
                .messages()
                .into_iter()
                .map(String::from)
                .collect(),
            claims,
            evidence,
            ramble,
        }
    }
}

/// Prior term averages and per-window structure results, in input order
///
/// A window carries structure-order severity only when its own role adds a
/// violation the prefix before it did not have; the carried violations are
/// just the new ones.
fn window_contexts(windows: &[WindowObservation]) -> Vec<WindowContext> {
    let mut contexts = Vec::with_capacity(windows.len());
    let mut term_total = 0usize;
    let mut roles: Vec<(usize, &str)> = Vec::new();
    let mut previous = StructureCheck::default();

    for (index, window) in windows.iter().enumerate() {
        let previous_avg = if index == 0 {
            0.0
        } else {
            term_total as f64 / index as f64
        };
        term_total += window.new_terms.len();

        let structure = match window.role.as_deref() {
            Some(role) => {
                roles.push((index, role));
                let check = structure_order_severity(&roles);
                let introduced: Vec<_> = check
                    .violations
                    .iter()
                    .copied()
                    .filter(|v| !previous.violations.contains(v))
                    .collect();
                let own = if introduced.is_empty() {
                    StructureCheck::default()
                } else {
                    StructureCheck {
                        severity: check.severity,
                        violations: introduced,
                    }
                };
                previous = check;
                own
            }
            None => StructureCheck::default(),
        };

        contexts.push(WindowContext {
            previous_avg,
            structure,
        });
    }

    contexts
}

/// Analyze windows with the given configuration, or defaults
pub fn analyze_windows(
    windows: &[WindowObservation],
    config: Option<&ResolvedConfig>,
) -> Result<ClarityReport> {
    match config {
        Some(config) => ClarityEngine::new(config).analyze(windows, None),
        None => ClarityEngine::default().analyze(windows, None),
    }
}

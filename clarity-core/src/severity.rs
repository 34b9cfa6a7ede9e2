//! Per-window severity evaluators
//!
//! Each evaluator is a total function from raw window observations to a
//! severity in {0, 1, 2}. Ramble severity lives in `ramble`; visual mismatch
//! is judged upstream and only consumed here.

use crate::signal::Severity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Role names recognised by the structure-order rules
pub mod roles {
    pub const PROBLEM: &str = "problem";
    pub const SOLUTION: &str = "solution";
    pub const DEMO: &str = "demo";
    pub const ARCHITECTURE: &str = "architecture";
    pub const METRICS: &str = "metrics";
    pub const USER_CONTEXT: &str = "user_context";
}

/// Ratio thresholds for concept-spike severity (strictly-greater comparisons)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpikeThresholds {
    pub medium: f64,
    pub high: f64,
}

impl Default for SpikeThresholds {
    fn default() -> Self {
        SpikeThresholds {
            medium: 1.5,
            high: 2.5,
        }
    }
}

/// Severity of a jump in new technical terms relative to earlier windows
///
/// A zero `previous_avg` is replaced by 1 so the first window is judged
/// against a baseline of one term.
pub fn concept_spike_severity(
    current_terms: usize,
    previous_avg: f64,
    thresholds: &SpikeThresholds,
) -> Severity {
    let baseline = if previous_avg == 0.0 { 1.0 } else { previous_avg };
    let ratio = current_terms as f64 / baseline;

    if ratio > thresholds.high {
        Severity::High
    } else if ratio > thresholds.medium {
        Severity::Moderate
    } else {
        Severity::None
    }
}

/// Severity of terms used without a prior definition
pub fn grounding_gap_severity<T>(ungrounded_terms: &[T]) -> Severity {
    match ungrounded_terms.len() {
        0 => Severity::None,
        1 => Severity::Moderate,
        _ => Severity::High,
    }
}

/// Trust-me-bro severity: claims weighed against evidence cues
pub fn tmb_severity<C, E>(claims: &[C], evidence: &[E]) -> Severity {
    if claims.is_empty() {
        return Severity::None;
    }
    match evidence.len() {
        0 => Severity::High,
        n if n < claims.len() => Severity::Moderate,
        _ => Severity::None,
    }
}

/// A pitch-ordering rule that was broken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureViolation {
    SolutionBeforeProblem,
    DemoBeforeProblem,
    MetricsBeforeProblem,
    DemoBeforeProblemCritical,
    ArchitectureBeforeSolution,
    MetricsWithoutContext,
}

impl StructureViolation {
    pub fn message(&self) -> &'static str {
        match self {
            StructureViolation::SolutionBeforeProblem => "Solution presented before problem",
            StructureViolation::DemoBeforeProblem => "Demo shown before problem explained",
            StructureViolation::MetricsBeforeProblem => "Metrics shown before problem context",
            StructureViolation::DemoBeforeProblemCritical => {
                "CRITICAL: Demo before problem (instant confusion)"
            }
            StructureViolation::ArchitectureBeforeSolution => {
                "Architecture details before high-level solution"
            }
            StructureViolation::MetricsWithoutContext => "Metrics without context or baseline",
        }
    }

    pub fn is_critical(&self) -> bool {
        matches!(self, StructureViolation::DemoBeforeProblemCritical)
    }
}

/// Outcome of the structure-order rules over a role sequence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructureCheck {
    pub severity: Severity,
    /// In rule evaluation order
    pub violations: Vec<StructureViolation>,
}

impl StructureCheck {
    pub fn messages(&self) -> Vec<&'static str> {
        self.violations.iter().map(|v| v.message()).collect()
    }
}

/// Check pitch ordering over `(window_index, role)` pairs
///
/// Only the first occurrence of each role matters. Rules, in order:
/// solution/demo/metrics before problem, the critical demo-before-problem
/// case, architecture before solution, and metrics with neither problem
/// nor user context present.
pub fn structure_order_severity<R: AsRef<str>>(role_sequence: &[(usize, R)]) -> StructureCheck {
    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    for (window_index, role) in role_sequence {
        first_seen.entry(role.as_ref()).or_insert(*window_index);
    }

    let position = |role: &str| first_seen.get(role).copied();
    let before = |earlier: &str, later: &str| match (position(earlier), position(later)) {
        (Some(a), Some(b)) => a < b,
        _ => false,
    };

    let mut violations = Vec::new();
    if before(roles::SOLUTION, roles::PROBLEM) {
        violations.push(StructureViolation::SolutionBeforeProblem);
    }
    if before(roles::DEMO, roles::PROBLEM) {
        violations.push(StructureViolation::DemoBeforeProblem);
    }
    if before(roles::METRICS, roles::PROBLEM) {
        violations.push(StructureViolation::MetricsBeforeProblem);
    }
    if before(roles::DEMO, roles::PROBLEM) {
        violations.push(StructureViolation::DemoBeforeProblemCritical);
    }
    if before(roles::ARCHITECTURE, roles::SOLUTION) {
        violations.push(StructureViolation::ArchitectureBeforeSolution);
    }
    if position(roles::METRICS).is_some()
        && position(roles::PROBLEM).is_none()
        && position(roles::USER_CONTEXT).is_none()
    {
        violations.push(StructureViolation::MetricsWithoutContext);
    }

    let severity = match violations.as_slice() {
        [] => Severity::None,
        [only] if !only.is_critical() => Severity::Moderate,
        _ => Severity::High,
    };

    StructureCheck {
        severity,
        violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concept_spike_boundaries_are_strict() {
        let t = SpikeThresholds::default();
        // ratio exactly 2.5 stays at severity 1
        assert_eq!(concept_spike_severity(5, 2.0, &t), Severity::Moderate);
        assert_eq!(concept_spike_severity(6, 2.0, &t), Severity::High);
        // ratio exactly 1.5 stays at severity 0
        assert_eq!(concept_spike_severity(3, 2.0, &t), Severity::None);
        assert_eq!(concept_spike_severity(4, 2.0, &t), Severity::Moderate);
    }

    #[test]
    fn test_concept_spike_zero_average_uses_baseline_of_one() {
        let t = SpikeThresholds::default();
        assert_eq!(concept_spike_severity(1, 0.0, &t), Severity::None);
        assert_eq!(concept_spike_severity(2, 0.0, &t), Severity::Moderate);
        assert_eq!(concept_spike_severity(3, 0.0, &t), Severity::High);
        assert_eq!(concept_spike_severity(0, 0.0, &t), Severity::None);
    }

    #[test]
    fn test_concept_spike_custom_thresholds() {
        let t = SpikeThresholds {
            medium: 1.0,
            high: 1.2,
        };
        assert_eq!(concept_spike_severity(11, 10.0, &t), Severity::Moderate);
        assert_eq!(concept_spike_severity(13, 10.0, &t), Severity::High);
    }

    #[test]
    fn test_grounding_gap_counts_terms() {
        let none: [&str; 0] = [];
        assert_eq!(grounding_gap_severity(&none), Severity::None);
        assert_eq!(grounding_gap_severity(&["RAG"]), Severity::Moderate);
        assert_eq!(grounding_gap_severity(&["RAG", "FAISS"]), Severity::High);
        assert_eq!(
            grounding_gap_severity(&["RAG", "FAISS", "Marengo"]),
            Severity::High
        );
    }

    #[test]
    fn test_tmb_without_claims_is_zero_regardless_of_evidence() {
        let no_claims: [&str; 0] = [];
        let no_evidence: [&str; 0] = [];
        assert_eq!(tmb_severity(&no_claims, &no_evidence), Severity::None);
        assert_eq!(tmb_severity(&no_claims, &["chart"]), Severity::None);
    }

    #[test]
    fn test_tmb_evidence_balance() {
        let no_evidence: [&str; 0] = [];
        assert_eq!(tmb_severity(&["faster"], &no_evidence), Severity::High);
        assert_eq!(
            tmb_severity(&["faster", "cheaper"], &["benchmark"]),
            Severity::Moderate
        );
        assert_eq!(
            tmb_severity(&["faster", "cheaper"], &["benchmark", "chart"]),
            Severity::None
        );
        assert_eq!(
            tmb_severity(&["faster"], &["benchmark", "chart"]),
            Severity::None
        );
    }

    #[test]
    fn test_demo_first_pitch_is_critical() {
        let sequence = [(0, "demo"), (1, "solution"), (2, "problem")];
        let check = structure_order_severity(&sequence);
        assert_eq!(check.severity, Severity::High);
        assert_eq!(
            check.messages(),
            vec![
                "Solution presented before problem",
                "Demo shown before problem explained",
                "CRITICAL: Demo before problem (instant confusion)",
            ]
        );
    }

    #[test]
    fn test_well_ordered_pitch_has_no_violations() {
        let sequence = [
            (0, "problem"),
            (1, "user_context"),
            (2, "solution"),
            (3, "architecture"),
            (4, "demo"),
            (5, "metrics"),
        ];
        let check = structure_order_severity(&sequence);
        assert_eq!(check.severity, Severity::None);
        assert!(check.violations.is_empty());
    }

    #[test]
    fn test_single_non_critical_violation_is_moderate() {
        let sequence = [(0, "architecture"), (1, "solution")];
        let check = structure_order_severity(&sequence);
        assert_eq!(
            check.violations,
            vec![StructureViolation::ArchitectureBeforeSolution]
        );
        assert_eq!(check.severity, Severity::Moderate);
    }

    #[test]
    fn test_metrics_without_context() {
        let check = structure_order_severity(&[(0, "solution"), (1, "metrics")]);
        assert_eq!(
            check.violations,
            vec![StructureViolation::MetricsWithoutContext]
        );
        assert_eq!(check.severity, Severity::Moderate);

        let with_context = structure_order_severity(&[(0, "user_context"), (1, "metrics")]);
        assert!(with_context.violations.is_empty());
    }

    #[test]
    fn test_only_first_occurrence_counts() {
        // the late repeat of "solution" must not mask its early position
        let sequence = [(0, "solution"), (1, "problem"), (2, "solution")];
        let check = structure_order_severity(&sequence);
        assert_eq!(
            check.violations,
            vec![StructureViolation::SolutionBeforeProblem]
        );
    }

    #[test]
    fn test_two_non_critical_violations_are_high() {
        let sequence = [(0, "metrics"), (1, "solution"), (2, "problem")];
        let check = structure_order_severity(&sequence);
        assert_eq!(check.violations.len(), 2);
        assert_eq!(check.severity, Severity::High);
    }

    #[test]
    fn test_empty_sequence() {
        let empty: [(usize, &str); 0] = [];
        assert_eq!(structure_order_severity(&empty), StructureCheck::default());
    }
}

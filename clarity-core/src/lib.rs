//! Clarity core library - signal scoring and timeline aggregation for pitch/demo presentations

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Severities are always in {0, 1, 2}
// - Risk values are clamped into [0, 10] before any cross-window use
// - No global mutable state; word lists are injected values
// - Identical input yields byte-for-byte identical output
// - Degenerate input (no windows, empty text) yields defaults, not errors

pub mod analysis;
pub mod breakdown;
pub mod config;
pub mod lexicon;
pub mod ramble;
pub mod report;
pub mod risk;
pub mod segment;
pub mod severity;
pub mod signal;
pub mod timeline;
pub mod window;

pub use analysis::{analyze_windows, ClarityEngine, ClarityReport, WindowResult};
pub use breakdown::{compute_signal_breakdown, BreakdownMode, SignalBreakdown};
pub use config::ResolvedConfig;
pub use report::{render_json, render_text};
pub use segment::{parse_segments, Segment};
pub use signal::{Severity, SeverityMap, Signal, WeightTable};
pub use timeline::{build_timeline, Timeline};
pub use window::{parse_utterances, parse_windows, segment_transcript, WindowObservation};

/// Round to a fixed number of decimal places
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.66666, 3), 0.667);
        assert_eq!(round_to(12.345678, 2), 12.35);
        assert_eq!(round_to(-0.0004, 3), 0.0);
    }
}

//! Reporting and output generation
//!
//! Global invariants enforced:
//! - Deterministic output ordering
//! - Byte-for-byte identical output across runs

use crate::analysis::ClarityReport;
use crate::breakdown::SignalBreakdown;
use crate::timeline::Timeline;
use crate::window::TranscriptWindow;
use serde::Serialize;

/// Text rendering of timeline intensity, one cell per bin
const HEAT_LEVELS: [char; 5] = [' ', '.', ':', '*', '#'];

/// Render the full report as text output
pub fn render_text(report: &ClarityReport) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Clarity: {}/100 ({})\n",
        report.clarity_score, report.tier
    ));
    output.push_str(&format!(
        "Windows: {}  Flagged: {}  Total risk: {:.2}\n",
        report.window_count, report.flagged_count, report.total_risk
    ));

    if report.flagged_count > 0 {
        output.push('\n');
        output.push_str(&format!(
            "{:<8} {:<14} {:<6} {}\n",
            "RISK", "WINDOW", "TIME", "SIGNALS"
        ));
        for window in report.flagged() {
            let signals = window
                .signals_triggered
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            output.push_str(&format!(
                "{:<8} {:<14} {:<6} {}\n",
                format!("{:.2}", window.risk),
                truncate_or_pad(&window.window_id, 14),
                format_time(window.start_sec),
                if signals.is_empty() { "-" } else { signals.as_str() },
            ));
            for violation in &window.structure_violations {
                output.push_str(&format!("         {}\n", violation));
            }
        }
    }

    output.push('\n');
    output.push_str(&render_breakdown_text(&report.breakdown));
    output.push('\n');
    output.push_str(&render_peaks_text(&report.timeline));

    output
}

/// Render a signal breakdown as text output
pub fn render_breakdown_text(breakdown: &SignalBreakdown) -> String {
    let mut output = format!(
        "Signal breakdown ({}, total {:.2})\n",
        breakdown.mode.as_str(),
        breakdown.total_weight
    );

    if breakdown.items.is_empty() {
        output.push_str("  no signals triggered\n");
        return output;
    }

    output.push_str(&format!(
        "{:<18} {:>8} {:>8} {:>9}\n",
        "SIGNAL", "WEIGHT", "PERCENT", "SEGMENTS"
    ));
    for item in &breakdown.items {
        output.push_str(&format!(
            "{:<18} {:>8.2} {:>7.2}% {:>9}\n",
            truncate_or_pad(item.signal.as_str(), 18),
            item.weight,
            item.percent,
            item.segments
        ));
    }

    output
}

/// Render the timeline heat strip and its peaks as text output
pub fn render_timeline_text(timeline: &Timeline) -> String {
    let mut output = format!(
        "Timeline ({} bins of {}s, {:.1}s)\n",
        timeline.values.len(),
        timeline.bin_size_sec,
        timeline.duration_sec
    );

    let strip: String = timeline.bins().map(|bin| heat_char(bin.intensity)).collect();
    output.push_str(&format!("|{}|\n", strip));
    output.push_str(&render_peaks_text(timeline));

    output
}

fn render_peaks_text(timeline: &Timeline) -> String {
    if timeline.peaks.is_empty() {
        return "Peaks: none\n".to_string();
    }

    let mut output = String::from("Peaks:\n");
    for peak in &timeline.peaks {
        output.push_str(&format!(
            "  {:>6}  {:.3}  {}\n",
            format_time(peak.t as f64 * timeline.bin_size_sec),
            peak.value,
            peak.segment_id
        ));
    }
    output
}

/// Render transcript windows as text output
pub fn render_windows_text(windows: &[TranscriptWindow]) -> String {
    let mut output = String::new();
    for window in windows {
        output.push_str(&format!(
            "{:<6} {}-{}  {}\n",
            window.window_id,
            format_time(window.start_sec),
            format_time(window.end_sec),
            if window.text.is_empty() {
                "(silence)"
            } else {
                window.text.as_str()
            }
        ));
    }
    output
}

/// Render any report value as pretty JSON output
pub fn render_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

fn heat_char(intensity: f64) -> char {
    let last = HEAT_LEVELS.len() - 1;
    let level = (intensity.clamp(0.0, 1.0) * last as f64).round() as usize;
    HEAT_LEVELS[level.min(last)]
}

/// Format seconds as m:ss
fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Truncate or pad string to fixed width
fn truncate_or_pad(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        format!("{:<width$}", s, width = width)
    }
}

//! Timeline heatmap - risk intensity over time with peak detection
//!
//! Global invariants enforced:
//! - Bins cover [0, duration) at a fixed width
//! - Intensities are in [0, 1]; overlapping segments combine by max, never sum
//! - Smoothing reads only the unsmoothed values
//! - At most five peaks, each strictly above 0.5, sorted by value descending

use crate::risk::{clamp_risk, MAX_RISK};
use crate::round_to;
use crate::segment::{Segment, MAX_TIME_SEC};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BIN_SIZE_SEC: f64 = 1.0;

/// Smoothed intensity a bin must exceed to count as a peak
pub const PEAK_THRESHOLD: f64 = 0.5;

pub const MAX_PEAKS: usize = 5;

/// Bins are widened so a timeline never holds more than this many
pub const MAX_BINS: usize = 100_000;

/// A local maximum of the smoothed curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Peak {
    /// Bin index
    pub t: usize,
    pub value: f64,
    pub segment_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Timeline {
    pub bin_size_sec: f64,
    pub duration_sec: f64,
    pub values: Vec<f64>,
    pub peaks: Vec<Peak>,
}

/// One fixed-width slice of the timeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineBin {
    pub index: usize,
    pub start_sec: f64,
    pub end_sec: f64,
    pub intensity: f64,
}

impl Timeline {
    pub fn bins(&self) -> impl Iterator<Item = TimelineBin> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(move |(index, &intensity)| TimelineBin {
                index,
                start_sec: index as f64 * self.bin_size_sec,
                end_sec: (index as f64 + 1.0) * self.bin_size_sec,
                intensity,
            })
    }
}

/// Build the intensity curve and its top peaks
///
/// `duration_sec` falls back to the latest segment end when absent or not
/// positive, and is capped at `MAX_TIME_SEC`. Intensity is a segment's
/// clamped risk over the highest segment risk (10.0 with no segments).
pub fn build_timeline(
    segments: &[Segment],
    duration_sec: Option<f64>,
    bin_size_sec: f64,
) -> Timeline {
    let bin_size = if bin_size_sec.is_finite() && bin_size_sec > 0.0 {
        bin_size_sec
    } else {
        log::warn!(
            "invalid bin size {}, using {}",
            bin_size_sec,
            DEFAULT_BIN_SIZE_SEC
        );
        DEFAULT_BIN_SIZE_SEC
    };

    let duration = match duration_sec {
        Some(d) if d.is_finite() && d > 0.0 => d,
        _ => segments.iter().map(|s| s.end_sec).fold(0.0, f64::max),
    };
    let duration = if duration > MAX_TIME_SEC {
        log::warn!("duration {}s capped at {}s", duration, MAX_TIME_SEC);
        MAX_TIME_SEC
    } else {
        duration
    };
    let bin_size = if duration / bin_size > MAX_BINS as f64 {
        let widened = duration / MAX_BINS as f64;
        log::warn!(
            "bin size {}s gives more than {} bins, using {}s",
            bin_size,
            MAX_BINS,
            widened
        );
        widened
    } else {
        bin_size
    };

    let num_bins = ((duration / bin_size).ceil() as usize).min(MAX_BINS);
    let raw = fill_bins(segments, num_bins, bin_size);
    let smoothed = smooth(&raw);
    let peaks = find_peaks(&smoothed, segments, bin_size);

    Timeline {
        bin_size_sec: bin_size,
        duration_sec: duration,
        values: smoothed.iter().map(|&v| round_to(v, 3)).collect(),
        peaks,
    }
}

/// Max-combine each segment's normalized risk into the bins it overlaps
fn fill_bins(segments: &[Segment], num_bins: usize, bin_size: f64) -> Vec<f64> {
    let mut values = vec![0.0; num_bins];

    let ceiling = if segments.is_empty() {
        MAX_RISK
    } else {
        segments
            .iter()
            .map(|s| clamp_risk(s.risk))
            .fold(0.0, f64::max)
    };
    if ceiling <= 0.0 {
        log::debug!("all segments have zero risk; timeline stays flat");
        return values;
    }

    let last_bin = num_bins as i64 - 1;
    for segment in segments {
        let intensity = clamp_risk(segment.risk) / ceiling;

        let start_bin = ((segment.start_sec / bin_size).floor() as i64)
            .min(last_bin)
            .max(0) as usize;
        let end_bin = ((segment.end_sec / bin_size).ceil() as i64)
            .min(num_bins as i64)
            .max(0) as usize;

        for value in values.iter_mut().take(end_bin).skip(start_bin) {
            *value = value.max(intensity);
        }
    }

    values
}

/// One pass of 3-point moving average over interior bins
fn smooth(values: &[f64]) -> Vec<f64> {
    let mut smoothed = values.to_vec();
    for i in 1..values.len().saturating_sub(1) {
        smoothed[i] = (values[i - 1] + values[i] + values[i + 1]) / 3.0;
    }
    smoothed
}

fn find_peaks(values: &[f64], segments: &[Segment], bin_size: f64) -> Vec<Peak> {
    let mut peaks = Vec::new();

    for (i, &value) in values.iter().enumerate() {
        let lo = i.saturating_sub(1);
        let hi = (i + 2).min(values.len());
        let is_local_max = (lo..hi).all(|j| j == i || values[j] <= value);
        if !is_local_max || value <= PEAK_THRESHOLD {
            continue;
        }

        let time = i as f64 * bin_size;
        // a peak no segment covers is dropped
        if let Some(segment) = segments.iter().find(|s| s.contains(time)) {
            peaks.push(Peak {
                t: i,
                value,
                segment_id: segment.segment_id.clone(),
            });
        }
    }

    // stable: equal values keep bin order
    peaks.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    peaks.truncate(MAX_PEAKS);
    peaks
}

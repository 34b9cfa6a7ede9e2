//! Fixed-size analysis windows and their upstream observations

use crate::segment::{deserialize_id, validate_span, MAX_TIME_SEC};
use crate::signal::Severity;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WINDOW_SIZE_SEC: f64 = 10.0;

/// Upper bound on the number of windows one transcript may produce
pub const MAX_WINDOWS: usize = 100_000;

/// One timed stretch of transcript text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub start_sec: f64,
    pub end_sec: f64,
    pub text: String,
}

/// Transcript text grouped into one fixed-size window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TranscriptWindow {
    pub window_id: String,
    pub index: usize,
    pub start_sec: f64,
    pub end_sec: f64,
    pub text: String,
}

/// Group utterances into consecutive windows `[k*w, (k+1)*w)` by start time
///
/// Windows with no speech between utterances are kept with empty text, so a
/// window's index always matches its position in the recording.
pub fn segment_transcript(
    utterances: &[Utterance],
    window_size_sec: f64,
) -> Result<Vec<TranscriptWindow>> {
    if !(window_size_sec.is_finite() && window_size_sec > 0.0) {
        anyhow::bail!(
            "window_size_sec must be positive (got {})",
            window_size_sec
        );
    }

    let mut texts: Vec<Vec<&str>> = Vec::new();
    for (i, utterance) in utterances.iter().enumerate() {
        if !utterance.start_sec.is_finite()
            || !utterance.end_sec.is_finite()
            || utterance.start_sec < 0.0
            || utterance.start_sec > utterance.end_sec
            || utterance.end_sec > MAX_TIME_SEC
        {
            anyhow::bail!(
                "utterance {} has an invalid span ({} .. {})",
                i,
                utterance.start_sec,
                utterance.end_sec
            );
        }

        let position = (utterance.start_sec / window_size_sec).floor();
        if position >= MAX_WINDOWS as f64 {
            anyhow::bail!(
                "utterance {} at {}s needs more than {} windows of {}s",
                i,
                utterance.start_sec,
                MAX_WINDOWS,
                window_size_sec
            );
        }
        let index = position as usize;
        if texts.len() <= index {
            texts.resize_with(index + 1, Vec::new);
        }
        let text = utterance.text.trim();
        if !text.is_empty() {
            texts[index].push(text);
        }
    }

    Ok(texts
        .into_iter()
        .enumerate()
        .map(|(index, parts)| TranscriptWindow {
            window_id: format!("w{}", index),
            index,
            start_sec: index as f64 * window_size_sec,
            end_sec: (index as f64 + 1.0) * window_size_sec,
            text: parts.join(" "),
        })
        .collect())
}

/// Everything upstream knows about one window
///
/// `claims` and `evidence` come from an external classifier; when both are
/// absent the local keyword fallback fills them in from `text`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WindowObservation {
    #[serde(deserialize_with = "deserialize_id")]
    pub window_id: String,
    pub start_sec: f64,
    pub end_sec: f64,
    #[serde(default)]
    pub text: String,
    /// Technical terms introduced in this window
    #[serde(default)]
    pub new_terms: Vec<String>,
    /// Terms used without a prior definition
    #[serde(default)]
    pub ungrounded_terms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_mismatch: Option<Severity>,
}

impl WindowObservation {
    pub fn validate(&self) -> Result<()> {
        validate_span(&self.window_id, self.start_sec, self.end_sec)
    }
}

impl From<TranscriptWindow> for WindowObservation {
    fn from(window: TranscriptWindow) -> Self {
        WindowObservation {
            window_id: window.window_id,
            start_sec: window.start_sec,
            end_sec: window.end_sec,
            text: window.text,
            ..WindowObservation::default()
        }
    }
}

/// Parse a JSON array of window observations
pub fn parse_windows(json: &str) -> Result<Vec<WindowObservation>> {
    serde_json::from_str(json).context("windows must be a JSON array of window observations")
}

/// Parse a JSON array of utterances
pub fn parse_utterances(json: &str) -> Result<Vec<Utterance>> {
    serde_json::from_str(json).context("utterances must be a JSON array of {start_sec, end_sec, text}")
}

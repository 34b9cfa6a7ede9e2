//! Ramble / filler analysis
//!
//! Detects low-density speaking: a high share of filler tokens or the same
//! two- and three-word phrases coming back within one window.

use crate::lexicon::{tokenize, FillerLexicon};
use crate::signal::Severity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Most repeated phrases reported per window
pub const MAX_REPEATED_PHRASES: usize = 5;

/// Repeated-phrase count that alone yields severity 2
const HIGH_REPEAT_COUNT: usize = 3;

/// Filler-ratio thresholds (inclusive comparisons)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RambleThresholds {
    pub low: f64,
    pub high: f64,
}

impl Default for RambleThresholds {
    fn default() -> Self {
        RambleThresholds {
            low: 0.03,
            high: 0.07,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RambleResult {
    pub filler_ratio: f64,
    pub filler_count: usize,
    pub total_words: usize,
    pub repeated_phrases: Vec<String>,
    pub severity: Severity,
}

#[derive(Debug, Clone, Default)]
pub struct RambleAnalyzer {
    lexicon: FillerLexicon,
    thresholds: RambleThresholds,
}

impl RambleAnalyzer {
    pub fn new(lexicon: FillerLexicon, thresholds: RambleThresholds) -> Self {
        RambleAnalyzer {
            lexicon,
            thresholds,
        }
    }

    pub fn thresholds(&self) -> RambleThresholds {
        self.thresholds
    }

    pub fn analyze(&self, text: &str) -> RambleResult {
        let words = tokenize(text);
        if words.is_empty() {
            return RambleResult::default();
        }

        let filler_count = self.lexicon.fillers.matched_token_count(&words);
        let filler_ratio = filler_count as f64 / words.len() as f64;
        let repeated_phrases = find_repeated_phrases(&words);

        let severity = if filler_ratio >= self.thresholds.high
            || repeated_phrases.len() >= HIGH_REPEAT_COUNT
        {
            Severity::High
        } else if filler_ratio >= self.thresholds.low || !repeated_phrases.is_empty() {
            Severity::Moderate
        } else {
            Severity::None
        };

        RambleResult {
            filler_ratio,
            filler_count,
            total_words: words.len(),
            repeated_phrases,
            severity,
        }
    }
}

/// Analyze with the default filler list
pub fn analyze_ramble(text: &str, thresholds: RambleThresholds) -> RambleResult {
    RambleAnalyzer::new(FillerLexicon::default(), thresholds).analyze(text)
}

/// Two- and three-word phrases seen more than once, in first-seen order
///
/// All bigrams are counted before trigrams, so bigrams lead the list.
fn find_repeated_phrases(words: &[String]) -> Vec<String> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for n in [2, 3] {
        for window in words.windows(n) {
            let phrase = window.join(" ");
            let count = counts.entry(phrase.clone()).or_insert(0);
            if *count == 0 {
                order.push(phrase);
            }
            *count += 1;
        }
    }

    order
        .into_iter()
        .filter(|phrase| counts.get(phrase).copied().unwrap_or(0) > 1)
        .take(MAX_REPEATED_PHRASES)
        .collect()
}

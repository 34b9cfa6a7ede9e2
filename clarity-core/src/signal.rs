//! Signal vocabulary, severities, and weights
//!
//! Global invariants enforced:
//! - Severities are always 0, 1, or 2
//! - Unknown signal names are tolerated and weigh 1.0
//! - Known signals iterate in canonical order

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Weight applied to signals missing from a weight table
pub const DEFAULT_UNKNOWN_WEIGHT: f64 = 1.0;

/// A heuristic category of clarity problem
///
/// Variant order is the canonical presentation order. Names that are not
/// one of the six known kinds are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Signal {
    ConceptSpike,
    GroundingGap,
    Tmb,
    VisualMismatch,
    StructureOrder,
    RambleRatio,
    Other(String),
}

impl Signal {
    /// The six known signals in canonical order
    pub const KNOWN: [Signal; 6] = [
        Signal::ConceptSpike,
        Signal::GroundingGap,
        Signal::Tmb,
        Signal::VisualMismatch,
        Signal::StructureOrder,
        Signal::RambleRatio,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Signal::ConceptSpike => "concept_spike",
            Signal::GroundingGap => "grounding_gap",
            Signal::Tmb => "tmb",
            Signal::VisualMismatch => "visual_mismatch",
            Signal::StructureOrder => "structure_order",
            Signal::RambleRatio => "ramble_ratio",
            Signal::Other(name) => name.as_str(),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Signal::Other(_))
    }
}

impl From<&str> for Signal {
    fn from(name: &str) -> Self {
        match name {
            "concept_spike" => Signal::ConceptSpike,
            "grounding_gap" => Signal::GroundingGap,
            "tmb" => Signal::Tmb,
            "visual_mismatch" => Signal::VisualMismatch,
            "structure_order" => Signal::StructureOrder,
            "ramble_ratio" => Signal::RambleRatio,
            other => Signal::Other(other.to_string()),
        }
    }
}

impl From<String> for Signal {
    fn from(name: String) -> Self {
        match Signal::from(name.as_str()) {
            Signal::Other(_) => Signal::Other(name),
            known => known,
        }
    }
}

impl From<Signal> for String {
    fn from(signal: Signal) -> Self {
        match signal {
            Signal::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discrete strength of one signal in one window
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(into = "u8", try_from = "u8")]
pub enum Severity {
    #[default]
    None,
    Moderate,
    High,
}

impl Severity {
    pub fn value(self) -> u8 {
        match self {
            Severity::None => 0,
            Severity::Moderate => 1,
            Severity::High => 2,
        }
    }

    /// A signal counts as active at severity 1 or above
    pub fn is_active(self) -> bool {
        self != Severity::None
    }
}

impl From<Severity> for u8 {
    fn from(severity: Severity) -> Self {
        severity.value()
    }
}

impl TryFrom<u8> for Severity {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Severity::None),
            1 => Ok(Severity::Moderate),
            2 => Ok(Severity::High),
            other => Err(format!("severity must be 0, 1, or 2 (got {})", other)),
        }
    }
}

/// Per-window severities keyed by signal
///
/// Built once per window and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeverityMap(BTreeMap<Signal, Severity>);

impl SeverityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert; a repeated signal keeps the last severity
    pub fn with(mut self, signal: Signal, severity: Severity) -> Self {
        self.0.insert(signal, severity);
        self
    }

    pub fn get(&self, signal: &Signal) -> Severity {
        self.0.get(signal).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Signal, Severity)> {
        self.0.iter().map(|(signal, severity)| (signal, *severity))
    }

    /// Number of signals at severity 1 or above
    pub fn active_count(&self) -> usize {
        self.0.values().filter(|s| s.is_active()).count()
    }

    /// Active signals in canonical order
    pub fn triggered(&self) -> Vec<Signal> {
        self.0
            .iter()
            .filter(|(_, severity)| severity.is_active())
            .map(|(signal, _)| signal.clone())
            .collect()
    }
}

impl FromIterator<(Signal, Severity)> for SeverityMap {
    fn from_iter<I: IntoIterator<Item = (Signal, Severity)>>(iter: I) -> Self {
        SeverityMap(iter.into_iter().collect())
    }
}

/// Positive per-signal weights used by the risk aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightTable(BTreeMap<Signal, f64>);

impl Default for WeightTable {
    fn default() -> Self {
        WeightTable(
            [
                (Signal::ConceptSpike, 1.0),
                (Signal::GroundingGap, 1.3),
                (Signal::Tmb, 1.2),
                (Signal::VisualMismatch, 1.5),
                (Signal::StructureOrder, 1.4),
                (Signal::RambleRatio, 0.8),
            ]
            .into_iter()
            .collect(),
        )
    }
}

impl WeightTable {
    /// Weight for a signal, `DEFAULT_UNKNOWN_WEIGHT` when absent
    pub fn weight(&self, signal: &Signal) -> f64 {
        self.0
            .get(signal)
            .copied()
            .unwrap_or(DEFAULT_UNKNOWN_WEIGHT)
    }

    /// Replace or add the named weights, keeping every other entry
    pub fn with_overrides<'a, I>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a f64)>,
    {
        for (name, weight) in overrides {
            self.0.insert(Signal::from(name.as_str()), *weight);
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Signal, f64)> {
        self.0.iter().map(|(signal, weight)| (signal, *weight))
    }
}

impl FromIterator<(Signal, f64)> for WeightTable {
    fn from_iter<I: IntoIterator<Item = (Signal, f64)>>(iter: I) -> Self {
        WeightTable(iter.into_iter().collect())
    }
}

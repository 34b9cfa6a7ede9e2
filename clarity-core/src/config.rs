//! Configuration file support
//!
//! Loads scoring configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.clarityrc.json` in the working directory
//! 3. `clarity.config.json` in the working directory
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::breakdown::BreakdownMode;
use crate::ramble::RambleThresholds;
use crate::risk::{default_tiers, validate_tiers, ClarityTier, FlagPolicy, DEFAULT_CLARITY_NORMALIZATION};
use crate::severity::SpikeThresholds;
use crate::signal::WeightTable;
use crate::timeline::DEFAULT_BIN_SIZE_SEC;
use crate::window::DEFAULT_WINDOW_SIZE_SEC;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Config file names probed during discovery, in priority order
const CONFIG_FILE_NAMES: &[&str] = &[".clarityrc.json", "clarity.config.json"];

/// Largest accepted signal weight
const MAX_SIGNAL_WEIGHT: f64 = 10.0;

/// Clarity configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClarityConfig {
    /// Per-signal weight overrides; unnamed signals keep their defaults
    #[serde(default)]
    pub signal_weights: Option<BTreeMap<String, f64>>,

    /// Risk at or above which a window is flagged (default: 4.0)
    #[serde(default)]
    pub risk_threshold: Option<f64>,

    /// Active signals that flag a window on their own (default: 2)
    #[serde(default)]
    pub min_active_signals: Option<usize>,

    /// Penalty multiplier on average window risk (default: 8.0)
    #[serde(default)]
    pub clarity_normalization: Option<f64>,

    /// Ordered `[min_score, label]` pairs, highest first, ending at 0
    #[serde(default)]
    pub clarity_tiers: Option<Vec<ClarityTier>>,

    /// Timeline bin width in seconds (default: 1.0)
    #[serde(default)]
    pub bin_size_sec: Option<f64>,

    /// Transcript window width in seconds (default: 10.0)
    #[serde(default)]
    pub window_size_sec: Option<f64>,

    #[serde(default)]
    pub ramble: Option<RambleConfig>,

    #[serde(default)]
    pub concept_spike: Option<ConceptSpikeConfig>,

    /// "weighted" or "count"; anything else means weighted (default: "weighted")
    #[serde(default)]
    pub breakdown_mode: Option<String>,
}

/// Filler-ratio thresholds for ramble severity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RambleConfig {
    /// Ratio for severity 1 (default: 0.03)
    pub low: Option<f64>,
    /// Ratio for severity 2 (default: 0.07)
    pub high: Option<f64>,
}

/// Term-ratio thresholds for concept-spike severity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConceptSpikeConfig {
    /// Ratio above which severity is 1 (default: 1.5)
    pub medium: Option<f64>,
    /// Ratio above which severity is 2 (default: 2.5)
    pub high: Option<f64>,
}

/// Resolved configuration with every default filled in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConfig {
    pub signal_weights: WeightTable,
    pub risk_threshold: f64,
    pub min_active_signals: usize,
    pub clarity_normalization: f64,
    pub clarity_tiers: Vec<ClarityTier>,
    pub bin_size_sec: f64,
    pub window_size_sec: f64,
    pub ramble_low: f64,
    pub ramble_high: f64,
    pub spike_medium: f64,
    pub spike_high: f64,
    pub breakdown_mode: BreakdownMode,
    /// Path the config was loaded from (None if defaults)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<PathBuf>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        let ramble = RambleThresholds::default();
        let spike = SpikeThresholds::default();
        let flag = FlagPolicy::default();
        ResolvedConfig {
            signal_weights: WeightTable::default(),
            risk_threshold: flag.risk_threshold,
            min_active_signals: flag.min_active_signals,
            clarity_normalization: DEFAULT_CLARITY_NORMALIZATION,
            clarity_tiers: default_tiers(),
            bin_size_sec: DEFAULT_BIN_SIZE_SEC,
            window_size_sec: DEFAULT_WINDOW_SIZE_SEC,
            ramble_low: ramble.low,
            ramble_high: ramble.high,
            spike_medium: spike.medium,
            spike_high: spike.high,
            breakdown_mode: BreakdownMode::default(),
            config_path: None,
        }
    }
}

fn require_positive(name: &str, value: Option<f64>) -> Result<()> {
    if let Some(v) = value {
        if !(v.is_finite() && v > 0.0) {
            anyhow::bail!("{} must be positive (got {})", name, v);
        }
    }
    Ok(())
}

impl ClarityConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if let Some(ref weights) = self.signal_weights {
            for (name, &w) in weights {
                if !w.is_finite() || w < 0.0 {
                    anyhow::bail!("signal_weights.{} must be non-negative (got {})", name, w);
                }
                if w > MAX_SIGNAL_WEIGHT {
                    anyhow::bail!(
                        "signal_weights.{} must be at most {} (got {})",
                        name,
                        MAX_SIGNAL_WEIGHT,
                        w
                    );
                }
            }
        }

        require_positive("risk_threshold", self.risk_threshold)?;
        require_positive("clarity_normalization", self.clarity_normalization)?;
        require_positive("bin_size_sec", self.bin_size_sec)?;
        require_positive("window_size_sec", self.window_size_sec)?;

        if let Some(ref tiers) = self.clarity_tiers {
            validate_tiers(tiers)?;
        }

        if let Some(ref r) = self.ramble {
            let defaults = RambleThresholds::default();
            let low = r.low.unwrap_or(defaults.low);
            let high = r.high.unwrap_or(defaults.high);
            require_positive("ramble.low", Some(low))?;
            require_positive("ramble.high", Some(high))?;
            if low >= high {
                anyhow::bail!(
                    "ramble.low ({}) must be less than ramble.high ({})",
                    low,
                    high
                );
            }
        }

        if let Some(ref s) = self.concept_spike {
            let defaults = SpikeThresholds::default();
            let medium = s.medium.unwrap_or(defaults.medium);
            let high = s.high.unwrap_or(defaults.high);
            require_positive("concept_spike.medium", Some(medium))?;
            require_positive("concept_spike.high", Some(high))?;
            if medium >= high {
                anyhow::bail!(
                    "concept_spike.medium ({}) must be less than concept_spike.high ({})",
                    medium,
                    high
                );
            }
        }

        Ok(())
    }

    /// Resolve config into the form consumed by the scoring engine
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;
        let defaults = ResolvedConfig::default();

        let signal_weights = match &self.signal_weights {
            Some(overrides) => defaults.signal_weights.clone().with_overrides(overrides),
            None => defaults.signal_weights.clone(),
        };

        let (ramble_low, ramble_high) = match &self.ramble {
            Some(r) => (
                r.low.unwrap_or(defaults.ramble_low),
                r.high.unwrap_or(defaults.ramble_high),
            ),
            None => (defaults.ramble_low, defaults.ramble_high),
        };

        let (spike_medium, spike_high) = match &self.concept_spike {
            Some(s) => (
                s.medium.unwrap_or(defaults.spike_medium),
                s.high.unwrap_or(defaults.spike_high),
            ),
            None => (defaults.spike_medium, defaults.spike_high),
        };

        Ok(ResolvedConfig {
            signal_weights,
            risk_threshold: self.risk_threshold.unwrap_or(defaults.risk_threshold),
            min_active_signals: self
                .min_active_signals
                .unwrap_or(defaults.min_active_signals),
            clarity_normalization: self
                .clarity_normalization
                .unwrap_or(defaults.clarity_normalization),
            clarity_tiers: self
                .clarity_tiers
                .clone()
                .unwrap_or(defaults.clarity_tiers),
            bin_size_sec: self.bin_size_sec.unwrap_or(defaults.bin_size_sec),
            window_size_sec: self.window_size_sec.unwrap_or(defaults.window_size_sec),
            ramble_low,
            ramble_high,
            spike_medium,
            spike_high,
            breakdown_mode: self
                .breakdown_mode
                .as_deref()
                .map(BreakdownMode::parse_or_default)
                .unwrap_or(defaults.breakdown_mode),
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    pub fn flag_policy(&self) -> FlagPolicy {
        FlagPolicy {
            risk_threshold: self.risk_threshold,
            min_active_signals: self.min_active_signals,
        }
    }

    pub fn ramble_thresholds(&self) -> RambleThresholds {
        RambleThresholds {
            low: self.ramble_low,
            high: self.ramble_high,
        }
    }

    pub fn spike_thresholds(&self) -> SpikeThresholds {
        SpikeThresholds {
            medium: self.spike_medium,
            high: self.spike_high,
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize resolved config to JSON")
    }
}

/// Discover and load a config file from a directory
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(root: &Path) -> Result<Option<(ClarityConfig, PathBuf)>> {
    for name in CONFIG_FILE_NAMES {
        let path = root.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }
    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<ClarityConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: ClarityConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load and resolve config
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config in `root`.
/// Returns default config if nothing is found.
pub fn load_and_resolve(root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(root)? {
            Some((config, path)) => (config, Some(path)),
            None => (ClarityConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    Ok(resolved)
}

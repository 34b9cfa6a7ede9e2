//! Clarity CLI - clarity-risk scoring for pitch and demo presentations

#![deny(warnings)]

// Global invariants enforced:
// - Deterministic output ordering
// - Identical input yields byte-for-byte identical output
// - CLI flags override config file values

use anyhow::Context;
use clap::{Parser, Subcommand};
use clarity_core::breakdown::BreakdownBuilder;
use clarity_core::config::{self, ResolvedConfig};
use clarity_core::report::{render_breakdown_text, render_timeline_text, render_windows_text};
use clarity_core::{
    build_timeline, parse_segments, parse_utterances, parse_windows, render_json, render_text,
    segment_transcript, BreakdownMode, ClarityEngine,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "clarity")]
#[command(about = "Clarity-risk scoring for pitch and demo presentations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score per-window observations into a full clarity report
    Analyze {
        /// Path to a JSON array of window observations
        path: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Total presentation length in seconds (default: last window end)
        #[arg(long)]
        duration: Option<f64>,

        /// Timeline bin width in seconds (overrides config file)
        #[arg(long)]
        bin_size: Option<f64>,

        /// Breakdown mode: weighted or count (overrides config file)
        #[arg(long)]
        mode: Option<String>,
    },
    /// Build the per-signal breakdown from scored segments
    Breakdown {
        /// Path to a JSON array of segments
        path: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Breakdown mode: weighted or count (overrides config file)
        #[arg(long)]
        mode: Option<String>,
    },
    /// Build the timeline heatmap and peaks from scored segments
    Timeline {
        /// Path to a JSON array of segments
        path: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Total presentation length in seconds (default: last segment end)
        #[arg(long)]
        duration: Option<f64>,

        /// Timeline bin width in seconds (overrides config file)
        #[arg(long)]
        bin_size: Option<f64>,
    },
    /// Group timed utterances into fixed-size analysis windows
    Segment {
        /// Path to a JSON array of utterances
        path: PathBuf,

        /// Output format
        #[arg(long, default_value = "json")]
        format: OutputFormat,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Window width in seconds (overrides config file)
        #[arg(long)]
        window_size: Option<f64>,
    },
    /// Validate or show configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without running analysis
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            path,
            format,
            config: config_path,
            duration,
            bin_size,
            mode,
        } => {
            let mut resolved = load_config(config_path.as_deref())?;
            if let Some(bin_size) = bin_size {
                resolved.bin_size_sec = require_positive("--bin-size", bin_size)?;
            }
            if let Some(mode) = mode {
                resolved.breakdown_mode = BreakdownMode::parse_or_default(&mode);
            }

            let windows = parse_windows(&read_input(&path)?)
                .with_context(|| format!("failed to parse windows from {}", path.display()))?;
            log::debug!("loaded {} windows from {}", windows.len(), path.display());
            let report = ClarityEngine::new(&resolved).analyze(&windows, duration)?;

            match format {
                OutputFormat::Text => print!("{}", render_text(&report)),
                OutputFormat::Json => println!("{}", render_json(&report)),
            }
        }
        Commands::Breakdown {
            path,
            format,
            config: config_path,
            mode,
        } => {
            let resolved = load_config(config_path.as_deref())?;
            let mode = mode
                .as_deref()
                .map(BreakdownMode::parse_or_default)
                .unwrap_or(resolved.breakdown_mode);

            let segments = parse_segments(&read_input(&path)?)
                .with_context(|| format!("failed to parse segments from {}", path.display()))?;
            log::debug!("loaded {} segments from {}", segments.len(), path.display());
            let breakdown = BreakdownBuilder::default().build(&segments, mode);

            match format {
                OutputFormat::Text => print!("{}", render_breakdown_text(&breakdown)),
                OutputFormat::Json => println!("{}", render_json(&breakdown)),
            }
        }
        Commands::Timeline {
            path,
            format,
            config: config_path,
            duration,
            bin_size,
        } => {
            let resolved = load_config(config_path.as_deref())?;
            let bin_size = match bin_size {
                Some(v) => require_positive("--bin-size", v)?,
                None => resolved.bin_size_sec,
            };

            let segments = parse_segments(&read_input(&path)?)
                .with_context(|| format!("failed to parse segments from {}", path.display()))?;
            let timeline = build_timeline(&segments, duration, bin_size);

            match format {
                OutputFormat::Text => print!("{}", render_timeline_text(&timeline)),
                OutputFormat::Json => println!("{}", render_json(&timeline)),
            }
        }
        Commands::Segment {
            path,
            format,
            config: config_path,
            window_size,
        } => {
            let resolved = load_config(config_path.as_deref())?;
            let window_size = match window_size {
                Some(v) => require_positive("--window-size", v)?,
                None => resolved.window_size_sec,
            };

            let utterances = parse_utterances(&read_input(&path)?)
                .with_context(|| format!("failed to parse utterances from {}", path.display()))?;
            let windows = segment_transcript(&utterances, window_size)?;

            match format {
                OutputFormat::Text => print!("{}", render_windows_text(&windows)),
                OutputFormat::Json => println!("{}", render_json(&windows)),
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref());

                match resolved {
                    Ok(config) => {
                        if let Some(ref p) = config.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path, format } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref())
                    .context("failed to load configuration")?;

                match format {
                    OutputFormat::Text => print_config(&resolved),
                    OutputFormat::Json => println!("{}", resolved.to_json()?),
                }
            }
        },
    }

    Ok(())
}

/// Resolve config from an explicit path or the working directory
fn load_config(config_path: Option<&Path>) -> anyhow::Result<ResolvedConfig> {
    let project_root = std::env::current_dir()?;
    let resolved = config::load_and_resolve(&project_root, config_path)
        .context("failed to load configuration")?;

    if let Some(config_path) = &resolved.config_path {
        eprintln!("Using config: {}", config_path.display());
    }

    Ok(resolved)
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read input file: {}", path.display()))
}

fn require_positive(flag: &str, value: f64) -> anyhow::Result<f64> {
    if !(value.is_finite() && value > 0.0) {
        anyhow::bail!("{} must be positive (got {})", flag, value);
    }
    Ok(value)
}

fn print_config(resolved: &ResolvedConfig) {
    println!("Configuration:");
    if let Some(ref p) = resolved.config_path {
        println!("  Source: {}", p.display());
    } else {
        println!("  Source: defaults (no config file found)");
    }
    println!();
    println!("Weights:");
    for (signal, weight) in resolved.signal_weights.iter() {
        println!("  {}: {}", signal, weight);
    }
    println!();
    println!("Flagging:");
    println!("  risk_threshold: {}", resolved.risk_threshold);
    println!("  min_active_signals: {}", resolved.min_active_signals);
    println!();
    println!("Thresholds:");
    println!("  ramble: {} / {}", resolved.ramble_low, resolved.ramble_high);
    println!(
        "  concept_spike: {} / {}",
        resolved.spike_medium, resolved.spike_high
    );
    println!();
    println!("Clarity:");
    println!("  normalization: {}", resolved.clarity_normalization);
    for tier in &resolved.clarity_tiers {
        println!("  >= {:>3}: {}", tier.min_score, tier.label);
    }
    println!();
    println!("Windows:");
    println!("  window_size_sec: {}", resolved.window_size_sec);
    println!("  bin_size_sec: {}", resolved.bin_size_sec);
    println!("  breakdown_mode: {}", resolved.breakdown_mode.as_str());
}

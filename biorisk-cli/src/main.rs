//! BioRisk CLI - biodiversity risk assessment for hotel sites

#![deny(warnings)]

// Global invariants enforced:
// - Deterministic output ordering
// - Identical input yields byte-for-byte identical output
// - Logs and progress go to stderr; stdout carries only the report

use anyhow::Context;
use biorisk_core::ahp;
use biorisk_core::config::{self, ResolvedConfig};
use biorisk_core::geo::Coordinates;
use biorisk_core::{
    assess_sites_with_progress, load_site, render_json, render_text, Assessor, CategoryKey,
    ReportSection, Site,
};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "biorisk")]
#[command(about = "Biodiversity risk scoring and mitigation planning for hotel sites")]
#[command(version = env!("BIORISK_VERSION"))]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score risk lists and generate mitigation plans (one JSON file per site)
    Assess {
        /// Risk list files (bare array or {location, risks} envelope)
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Only render one section of the assessment
        #[arg(long)]
        only: Option<OnlySection>,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Site latitude for radius filtering (overrides the file's location)
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Site longitude for radius filtering (overrides the file's location)
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        /// Keep only risks within this many miles of the site (overrides config file)
        #[arg(long)]
        radius: Option<f64>,
    },
    /// Derive category weights from violation counts (AHP)
    Weights {
        /// Violation count per category, e.g. --count invasive_species=12
        #[arg(long = "count", required = true, value_parser = parse_count)]
        counts: Vec<(CategoryKey, u64)>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Validate a configuration file
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without running an assessment
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
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OnlySection {
    Analysis,
    Plan,
}

impl From<OnlySection> for ReportSection {
    fn from(only: OnlySection) -> Self {
        match only {
            OnlySection::Analysis => ReportSection::Analysis,
            OnlySection::Plan => ReportSection::Plan,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Assess {
            paths,
            format,
            only,
            config: config_path,
            lat,
            lon,
            radius,
        } => {
            if let Some(r) = radius {
                if !r.is_finite() || r <= 0.0 {
                    anyhow::bail!("--radius must be positive (got {})", r);
                }
            }

            let project_root = std::env::current_dir()?;
            let resolved_config = config::load_and_resolve(&project_root, config_path.as_deref())
                .context("failed to load configuration")?;

            if let Some(config_path) = &resolved_config.config_path {
                eprintln!("Using config: {}", config_path.display());
            }

            let mut sites = Vec::with_capacity(paths.len());
            for path in &paths {
                if !path.exists() {
                    anyhow::bail!("Path does not exist: {}", path.display());
                }
                sites.push(load_site(path)?);
            }
            tracing::info!(sites = sites.len(), "loaded risk lists");

            // Filtering applies when a radius or an explicit center is given
            let center_override = lat.zip(lon).map(|(lat, lon)| Coordinates::new(lat, lon));
            if radius.is_some() || center_override.is_some() {
                let radius_miles = radius.unwrap_or(resolved_config.radius_miles);
                for site in &mut sites {
                    apply_radius(site, center_override, radius_miles)?;
                }
            }

            let assessor = Assessor::new(&resolved_config);
            let progress = site_progress_bar(sites.len());
            let assessments = assess_sites_with_progress(&assessor, &sites, || {
                if let Some(pb) = &progress {
                    pb.inc(1);
                }
            });
            if let Some(pb) = progress {
                pb.finish_and_clear();
            }

            let section = only.map(ReportSection::from).unwrap_or_default();
            match format {
                OutputFormat::Text => {
                    print!("{}", render_text(&assessments, section));
                }
                OutputFormat::Json => {
                    println!("{}", render_json(&assessments, section));
                }
            }
        }
        Commands::Weights { counts, format } => {
            let derived =
                ahp::weights_from_counts(&counts).context("failed to derive category weights")?;

            match format {
                OutputFormat::Json => {
                    // stdout is a loadable config file; the ratio goes to stderr
                    let json = serde_json::to_string_pretty(&derived.to_config())
                        .context("failed to serialize weights to JSON")?;
                    println!("{}", json);
                    eprintln!("Consistency ratio: {:.4}", derived.consistency_ratio);
                }
                OutputFormat::Text => {
                    println!("{:<20} WEIGHT", "CATEGORY");
                    for (category, weight) in &derived.weights {
                        println!("{:<20} {:.4}", category.as_str(), weight);
                    }
                    println!();
                    println!("Consistency ratio: {:.4}", derived.consistency_ratio);
                    if derived.consistency_ratio > ahp::ACCEPTABLE_CONSISTENCY_RATIO {
                        eprintln!(
                            "Warning: consistency ratio above {}; judgments may be inconsistent",
                            ahp::ACCEPTABLE_CONSISTENCY_RATIO
                        );
                    }
                }
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
            ConfigAction::Show { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref())
                    .context("failed to load configuration")?;
                print_config(&resolved);
            }
        },
    }

    Ok(())
}

/// Install the stderr log subscriber; RUST_LOG wins over -v
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn apply_radius(
    site: &mut Site,
    center_override: Option<Coordinates>,
    radius_miles: f64,
) -> anyhow::Result<()> {
    let center = center_override.or_else(|| site.coordinates()).with_context(|| {
        format!(
            "site '{}' has no location; pass --lat and --lon to filter by radius",
            site.name
        )
    })?;
    site.filter_within_radius(center, radius_miles);
    Ok(())
}

/// Progress bar for multi-site runs; single sites finish too fast to need one
fn site_progress_bar(total: usize) -> Option<ProgressBar> {
    if total < 2 {
        return None;
    }
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} sites")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    Some(pb)
}

fn parse_count(s: &str) -> Result<(CategoryKey, u64), String> {
    let (key, count) = s
        .split_once('=')
        .ok_or_else(|| format!("expected CATEGORY=N, got '{}'", s))?;
    let category = CategoryKey::from_key(key.trim()).ok_or_else(|| {
        let known: Vec<&str> = CategoryKey::ALL.iter().map(|c| c.as_str()).collect();
        format!("unknown category '{}' (expected one of: {})", key, known.join(", "))
    })?;
    let count = count
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid count '{}': {}", count, e))?;
    Ok((category, count))
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
    for category in CategoryKey::ALL {
        println!(
            "  {}: {}",
            category.as_str(),
            resolved.weights.weight(category)
        );
    }
    println!();
    println!("Threat scores:");
    println!("  high: {}", resolved.threat_scores.high);
    println!("  moderate: {}", resolved.threat_scores.moderate);
    println!("  medium: {}", resolved.threat_scores.medium);
    println!("  low: {}", resolved.threat_scores.low);
    println!("  unknown: {}", resolved.threat_scores.unknown);
    println!();
    println!("Plan revision: {}", resolved.plan_revision.number());
    println!("Radius: {} miles", resolved.radius_miles);
}

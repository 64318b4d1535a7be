//! Configuration file support
//!
//! Loads project-specific scoring parameters from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.bioriskrc.json` in project root
//! 3. `biorisk.config.json` in project root
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::geo::DEFAULT_RADIUS_MILES;
use crate::mitigation::PlanRevision;
use crate::risk::{CategoryWeights, ScorerConfig, ThreatScores};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file names probed in the project root, in priority order
pub const CONFIG_FILE_NAMES: &[&str] = &[".bioriskrc.json", "biorisk.config.json"];

const MAX_WEIGHT: f64 = 10.0;
const MAX_THREAT_SCORE: f64 = 100.0;

/// Configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BioriskConfig {
    /// Custom category weights for the risk score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<WeightConfig>,

    /// Custom base score per threat level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat_scores: Option<ThreatScoreConfig>,

    /// Mitigation plan revision (1 = static timeline, 2 = derived timeline)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_revision: Option<u8>,

    /// Default search radius in miles for site filtering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius_miles: Option<f64>,
}

/// Custom category weights
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeightConfig {
    /// Weight for invasive species (default: 0.25)
    pub invasive_species: Option<f64>,
    /// Weight for IUCN-listed species (default: 0.30)
    pub iucn_conservation: Option<f64>,
    /// Weight for freshwater risk (default: 0.20)
    pub freshwater_risk: Option<f64>,
    /// Weight for marine risk (default: 0.15)
    pub marine_risk: Option<f64>,
    /// Weight for terrestrial risk (default: 0.10)
    pub terrestrial_risk: Option<f64>,
    /// Weight for unmatched categories (default: 0.10)
    pub other: Option<f64>,
}

/// Custom base scores per threat level
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThreatScoreConfig {
    /// default: 10
    pub high: Option<f64>,
    /// default: 6
    pub moderate: Option<f64>,
    /// default: 5
    pub medium: Option<f64>,
    /// default: 2
    pub low: Option<f64>,
    /// default: 1
    pub unknown: Option<f64>,
}

impl WeightConfig {
    fn entries(&self) -> [(&'static str, Option<f64>); 6] {
        [
            ("invasive_species", self.invasive_species),
            ("iucn_conservation", self.iucn_conservation),
            ("freshwater_risk", self.freshwater_risk),
            ("marine_risk", self.marine_risk),
            ("terrestrial_risk", self.terrestrial_risk),
            ("other", self.other),
        ]
    }

    /// Build a config block from fully-specified weights
    pub fn from_weights(weights: &CategoryWeights) -> Self {
        WeightConfig {
            invasive_species: Some(weights.invasive_species),
            iucn_conservation: Some(weights.iucn_conservation),
            freshwater_risk: Some(weights.freshwater_risk),
            marine_risk: Some(weights.marine_risk),
            terrestrial_risk: Some(weights.terrestrial_risk),
            other: Some(weights.other),
        }
    }
}

impl ThreatScoreConfig {
    fn entries(&self) -> [(&'static str, Option<f64>); 5] {
        [
            ("high", self.high),
            ("moderate", self.moderate),
            ("medium", self.medium),
            ("low", self.low),
            ("unknown", self.unknown),
        ]
    }
}

/// Resolved configuration with defaults applied
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub weights: CategoryWeights,
    pub threat_scores: ThreatScores,
    pub plan_revision: PlanRevision,
    pub radius_miles: f64,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl BioriskConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if let Some(ref w) = self.weights {
            for (name, val) in w.entries() {
                if let Some(v) = val {
                    if !v.is_finite() {
                        anyhow::bail!("weights.{} must be a finite number (got {})", name, v);
                    }
                    if v < 0.0 {
                        anyhow::bail!("weights.{} must be non-negative (got {})", name, v);
                    }
                    if v > MAX_WEIGHT {
                        anyhow::bail!("weights.{} must be at most {} (got {})", name, MAX_WEIGHT, v);
                    }
                }
            }
        }

        if let Some(ref t) = self.threat_scores {
            for (name, val) in t.entries() {
                if let Some(v) = val {
                    if !v.is_finite() {
                        anyhow::bail!("threat_scores.{} must be a finite number (got {})", name, v);
                    }
                    if v < 0.0 {
                        anyhow::bail!("threat_scores.{} must be non-negative (got {})", name, v);
                    }
                    if v > MAX_THREAT_SCORE {
                        anyhow::bail!(
                            "threat_scores.{} must be at most {} (got {})",
                            name,
                            MAX_THREAT_SCORE,
                            v
                        );
                    }
                }
            }
        }

        if let Some(rev) = self.plan_revision {
            if PlanRevision::from_number(rev).is_none() {
                anyhow::bail!("plan_revision must be 1 or 2 (got {})", rev);
            }
        }

        if let Some(radius) = self.radius_miles {
            if !radius.is_finite() || radius <= 0.0 {
                anyhow::bail!("radius_miles must be positive (got {})", radius);
            }
        }

        Ok(())
    }

    /// Resolve config into the form the analyzers consume
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let defaults = CategoryWeights::default();
        let weights = match &self.weights {
            Some(w) => CategoryWeights {
                invasive_species: w.invasive_species.unwrap_or(defaults.invasive_species),
                iucn_conservation: w.iucn_conservation.unwrap_or(defaults.iucn_conservation),
                freshwater_risk: w.freshwater_risk.unwrap_or(defaults.freshwater_risk),
                marine_risk: w.marine_risk.unwrap_or(defaults.marine_risk),
                terrestrial_risk: w.terrestrial_risk.unwrap_or(defaults.terrestrial_risk),
                other: w.other.unwrap_or(defaults.other),
            },
            None => defaults,
        };

        let score_defaults = ThreatScores::default();
        let threat_scores = match &self.threat_scores {
            Some(t) => ThreatScores {
                high: t.high.unwrap_or(score_defaults.high),
                moderate: t.moderate.unwrap_or(score_defaults.moderate),
                medium: t.medium.unwrap_or(score_defaults.medium),
                low: t.low.unwrap_or(score_defaults.low),
                unknown: t.unknown.unwrap_or(score_defaults.unknown),
            },
            None => score_defaults,
        };

        let plan_revision = self
            .plan_revision
            .and_then(PlanRevision::from_number)
            .unwrap_or_default();

        Ok(ResolvedConfig {
            weights,
            threat_scores,
            plan_revision,
            radius_miles: self.radius_miles.unwrap_or(DEFAULT_RADIUS_MILES),
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Self {
        ResolvedConfig {
            weights: CategoryWeights::default(),
            threat_scores: ThreatScores::default(),
            plan_revision: PlanRevision::default(),
            radius_miles: DEFAULT_RADIUS_MILES,
            config_path: None,
        }
    }

    pub fn scorer_config(&self) -> ScorerConfig {
        ScorerConfig {
            weights: self.weights,
            threat_scores: self.threat_scores,
        }
    }
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ResolvedConfig::defaults()
    }
}

/// Discover and load a config file from the project root
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(project_root: &Path) -> Result<Option<(BioriskConfig, PathBuf)>> {
    for name in CONFIG_FILE_NAMES {
        let path = project_root.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }
    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<BioriskConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: BioriskConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load and resolve config for a project
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config from the project root.
/// Returns default config if nothing is found.
pub fn load_and_resolve(project_root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(project_root)? {
            Some((config, path)) => (config, Some(path)),
            None => (BioriskConfig::default(), None),
        }
    };

    match &source_path {
        Some(path) => tracing::info!(path = %path.display(), "loaded configuration"),
        None => tracing::debug!("no config file found, using defaults"),
    }

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    Ok(resolved)
}

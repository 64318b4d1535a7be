//! Biodiversity risk scoring
//!
//! Turns a snapshot of risk records into a 0-100 score, a priority with
//! recommendations, and a per-category breakdown.
//!
//! Global invariants enforced:
//! - Deterministic: category accumulation follows first-seen order
//! - Total: malformed records degrade to `other` / `unknown`, nothing fails
//! - Score is always an integer in [0, 100]

use crate::record::{CategoryKey, RiskRecord, ThreatLevel};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Score multiplier applied to the weighted category average
const SCORE_SCALE: f64 = 10.0;

/// Upper bound of the normalized score
pub const MAX_SCORE: u8 = 100;

/// More moderate threats than this escalate the priority to `high`
const MODERATE_ESCALATION_COUNT: usize = 2;

/// Relative importance of each risk category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeights {
    pub invasive_species: f64,
    pub iucn_conservation: f64,
    pub freshwater_risk: f64,
    pub marine_risk: f64,
    pub terrestrial_risk: f64,
    /// Fallback for records that match no known category
    pub other: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        CategoryWeights {
            invasive_species: 0.25,
            iucn_conservation: 0.30,
            freshwater_risk: 0.20,
            marine_risk: 0.15,
            terrestrial_risk: 0.10,
            other: 0.10,
        }
    }
}

impl CategoryWeights {
    pub fn weight(&self, category: CategoryKey) -> f64 {
        match category {
            CategoryKey::InvasiveSpecies => self.invasive_species,
            CategoryKey::IucnConservation => self.iucn_conservation,
            CategoryKey::FreshwaterRisk => self.freshwater_risk,
            CategoryKey::MarineRisk => self.marine_risk,
            CategoryKey::TerrestrialRisk => self.terrestrial_risk,
            CategoryKey::Other => self.other,
        }
    }

    pub fn set_weight(&mut self, category: CategoryKey, weight: f64) {
        match category {
            CategoryKey::InvasiveSpecies => self.invasive_species = weight,
            CategoryKey::IucnConservation => self.iucn_conservation = weight,
            CategoryKey::FreshwaterRisk => self.freshwater_risk = weight,
            CategoryKey::MarineRisk => self.marine_risk = weight,
            CategoryKey::TerrestrialRisk => self.terrestrial_risk = weight,
            CategoryKey::Other => self.other = weight,
        }
    }
}

/// Base score of each threat level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThreatScores {
    pub high: f64,
    pub moderate: f64,
    pub medium: f64,
    pub low: f64,
    pub unknown: f64,
}

impl Default for ThreatScores {
    fn default() -> Self {
        ThreatScores {
            high: 10.0,
            moderate: 6.0,
            medium: 5.0,
            low: 2.0,
            unknown: 1.0,
        }
    }
}

impl ThreatScores {
    pub fn score(&self, level: ThreatLevel) -> f64 {
        match level {
            ThreatLevel::High => self.high,
            ThreatLevel::Moderate => self.moderate,
            ThreatLevel::Medium => self.medium,
            ThreatLevel::Low => self.low,
            ThreatLevel::Unknown => self.unknown,
        }
    }
}

/// Scorer configuration
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScorerConfig {
    pub weights: CategoryWeights,
    pub threat_scores: ThreatScores,
}

/// Overall priority classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Moderate,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Moderate => "moderate",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

/// Threat counts and recommendations for a risk list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub critical_threats: usize,
    pub moderate_threats: usize,
    pub low_threats: usize,
    pub recommendations: Vec<String>,
    pub priority: Priority,
}

/// Per-level counts inside a category; only high/moderate/low are tracked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatCounts {
    pub high: usize,
    pub moderate: usize,
    pub low: usize,
}

/// Breakdown of one risk category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    pub count: usize,
    pub threat_counts: ThreatCounts,
    pub species_or_areas: Vec<String>,
}

/// Complete scorer output for one risk-list snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAnalysis {
    pub score: u8,
    pub insights: Insights,
    pub categories: IndexMap<CategoryKey, CategoryBreakdown>,
    pub total_risks: usize,
}

/// Risk scorer holding an immutable configuration
#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    config: ScorerConfig,
}

impl RiskScorer {
    pub fn new(config: ScorerConfig) -> Self {
        RiskScorer { config }
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Weighted aggregate score in [0, 100]
    ///
    /// Formula:
    /// score = min(round(10 * sum_c(avg_threat_score(c) * weight(c))), 100)
    pub fn score(&self, risks: &[RiskRecord]) -> u8 {
        if risks.is_empty() {
            return 0;
        }

        let mut per_category: IndexMap<CategoryKey, (f64, usize)> = IndexMap::new();
        for risk in risks {
            let category = risk.category();
            let base = self
                .config
                .threat_scores
                .score(ThreatLevel::from_code(risk.threat_code.as_deref()));
            let entry = per_category.entry(category).or_insert((0.0, 0));
            entry.0 += base;
            entry.1 += 1;
        }

        let total: f64 = per_category
            .iter()
            .map(|(category, (sum, count))| {
                (sum / *count as f64) * self.config.weights.weight(*category)
            })
            .sum();

        normalize_score(total)
    }

    /// Threat counts, priority, and recommendations
    pub fn insights(&self, risks: &[RiskRecord]) -> Insights {
        if risks.is_empty() {
            return Insights {
                critical_threats: 0,
                moderate_threats: 0,
                low_threats: 0,
                recommendations: vec!["No biodiversity data available for this location".to_string()],
                priority: Priority::Low,
            };
        }

        let mut critical_threats = 0;
        let mut moderate_threats = 0;
        let mut low_threats = 0;
        for risk in risks {
            match risk.threat_lowercase().as_deref() {
                Some("high") => critical_threats += 1,
                Some("moderate") => moderate_threats += 1,
                Some("low") | Some("least concern") => low_threats += 1,
                _ => {}
            }
        }

        let (priority, recommendations) = if critical_threats > 0 {
            (
                Priority::Critical,
                vec![
                    format!(
                        "Immediate action required: {} critical threat(s) identified",
                        critical_threats
                    ),
                    "Conduct detailed environmental impact assessment".to_string(),
                    "Implement emergency conservation measures".to_string(),
                ],
            )
        } else if moderate_threats > MODERATE_ESCALATION_COUNT {
            (
                Priority::High,
                vec![
                    "Develop comprehensive mitigation strategy".to_string(),
                    "Monitor ecosystem changes quarterly".to_string(),
                ],
            )
        } else if moderate_threats > 0 {
            (
                Priority::Moderate,
                vec![
                    "Implement preventive conservation measures".to_string(),
                    "Schedule bi-annual biodiversity monitoring".to_string(),
                ],
            )
        } else {
            (
                Priority::Low,
                vec![
                    "Maintain current conservation practices".to_string(),
                    "Continue routine environmental monitoring".to_string(),
                ],
            )
        };

        Insights {
            critical_threats,
            moderate_threats,
            low_threats,
            recommendations,
            priority,
        }
    }

    /// Per-category counts and species/area labels, in first-seen order
    ///
    /// `count` includes every record, while `threat_counts` only tracks the
    /// exact levels high/moderate/low. A `medium` or unknown record therefore
    /// shows up in `count` but in none of the threat buckets.
    pub fn category_breakdown(&self, risks: &[RiskRecord]) -> IndexMap<CategoryKey, CategoryBreakdown> {
        let mut categories: IndexMap<CategoryKey, CategoryBreakdown> = IndexMap::new();

        for risk in risks {
            let breakdown = categories.entry(risk.category()).or_default();
            breakdown.count += 1;

            match risk.threat_lowercase().as_deref().unwrap_or("unknown") {
                "high" => breakdown.threat_counts.high += 1,
                "moderate" => breakdown.threat_counts.moderate += 1,
                "low" => breakdown.threat_counts.low += 1,
                _ => {}
            }

            if let Some(description) = &risk.description {
                breakdown.species_or_areas.push(description.clone());
            }
        }

        categories
    }

    /// Score, insights, and breakdown in one pass over the configuration
    pub fn analyze(&self, risks: &[RiskRecord]) -> RiskAnalysis {
        RiskAnalysis {
            score: self.score(risks),
            insights: self.insights(risks),
            categories: self.category_breakdown(risks),
            total_risks: risks.len(),
        }
    }
}

/// Scale, round, and clamp a weighted total into [0, 100]
///
/// `f64::round` rounds half away from zero; totals are non-negative so this
/// is half-up.
pub fn normalize_score(total: f64) -> u8 {
    let scaled = (total * SCORE_SCALE).round();
    if !scaled.is_finite() || scaled <= 0.0 {
        return 0;
    }
    scaled.min(MAX_SCORE as f64) as u8
}

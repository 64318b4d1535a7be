//! Mitigation planning
//!
//! Maps each (category, threat level) pair to an authored strategy and folds
//! all matched strategies into one consolidated plan.
//!
//! Global invariants enforced:
//! - Action lists are deduplicated, first occurrence order preserved
//! - Unmatched pairs and malformed cost strings contribute nothing
//! - No I/O, no shared state between calls

use crate::record::{CategoryKey, RiskRecord};
use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Timeline reported when the plan does not derive one from strategies
pub const DEFAULT_TIMELINE: &str = "1-12 months";

/// Effectiveness reported when the plan does not derive one from strategies
pub const DEFAULT_EFFECTIVENESS: &str = "85%";

/// Threat level as seen by the planner
///
/// Unlike the scorer's `ThreatLevel`, unrecognized codes fall back to `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanLevel {
    High,
    Moderate,
    Low,
}

impl PlanLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanLevel::High => "high",
            PlanLevel::Moderate => "moderate",
            PlanLevel::Low => "low",
        }
    }
}

/// Normalize a threat code (including IUCN statuses) to a planner level
pub fn normalize_threat_level(threat_code: Option<&str>) -> PlanLevel {
    match threat_code.unwrap_or("").to_lowercase().as_str() {
        "high" | "critically endangered" | "endangered" => PlanLevel::High,
        "moderate" | "vulnerable" | "near threatened" => PlanLevel::Moderate,
        "low" | "least concern" => PlanLevel::Low,
        _ => PlanLevel::Low,
    }
}

/// Authored response to one (category, level) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    pub immediate: Vec<String>,
    pub long_term: Vec<String>,
    /// Labelled range such as "High ($50,000 - $200,000)"
    pub cost: String,
    pub timeline: String,
    pub effectiveness: String,
}

impl Strategy {
    fn authored(
        immediate: &[&str],
        long_term: &[&str],
        cost: &str,
        timeline: &str,
        effectiveness: &str,
    ) -> Self {
        Strategy {
            immediate: immediate.iter().map(|s| s.to_string()).collect(),
            long_term: long_term.iter().map(|s| s.to_string()).collect(),
            cost: cost.to_string(),
            timeline: timeline.to_string(),
            effectiveness: effectiveness.to_string(),
        }
    }

    /// Dollar bounds parsed from the cost label, if it carries a `$min - $max` range
    pub fn cost_bounds(&self) -> Option<(u64, u64)> {
        parse_cost_range(&self.cost)
    }
}

/// Strategy lookup keyed by (category, level)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyTable {
    entries: BTreeMap<(CategoryKey, PlanLevel), Strategy>,
}

impl StrategyTable {
    /// Table with no entries; every plan built from it is action-free
    pub fn empty() -> Self {
        StrategyTable {
            entries: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, category: CategoryKey, level: PlanLevel, strategy: Strategy) {
        self.entries.insert((category, level), strategy);
    }

    pub fn get(&self, category: CategoryKey, level: PlanLevel) -> Option<&Strategy> {
        self.entries.get(&(category, level))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for StrategyTable {
    /// Authored strategies for invasive species and IUCN-listed species
    ///
    /// IUCN statuses endangered / vulnerable / least concern are stored at
    /// high / moderate / low, the levels `normalize_threat_level` produces.
    fn default() -> Self {
        let mut table = StrategyTable::empty();

        table.insert(
            CategoryKey::InvasiveSpecies,
            PlanLevel::High,
            Strategy::authored(
                &[
                    "Implement emergency containment protocols",
                    "Deploy rapid response teams for species removal",
                    "Establish quarantine zones around affected areas",
                    "Apply targeted herbicide treatments where appropriate",
                ],
                &[
                    "Develop species-specific eradication programs",
                    "Implement early detection and rapid response (EDRR) systems",
                    "Restore native plant communities",
                    "Establish monitoring protocols",
                ],
                "High ($50,000 - $200,000)",
                "6-24 months",
                "85%",
            ),
        );
        table.insert(
            CategoryKey::InvasiveSpecies,
            PlanLevel::Moderate,
            Strategy::authored(
                &[
                    "Map and document current species distribution",
                    "Begin selective removal in sensitive areas",
                    "Implement prevention measures",
                ],
                &[
                    "Develop integrated pest management plans",
                    "Restore degraded habitats",
                    "Community education and volunteer programs",
                ],
                "Moderate ($10,000 - $50,000)",
                "3-12 months",
                "75%",
            ),
        );
        table.insert(
            CategoryKey::InvasiveSpecies,
            PlanLevel::Low,
            Strategy::authored(
                &[
                    "Document species presence and monitor spread",
                    "Implement preventive measures",
                ],
                &[
                    "Regular monitoring and early intervention",
                    "Habitat improvement programs",
                ],
                "Low ($1,000 - $10,000)",
                "1-6 months",
                "90%",
            ),
        );

        table.insert(
            CategoryKey::IucnConservation,
            PlanLevel::High,
            Strategy::authored(
                &[
                    "Implement emergency species protection protocols",
                    "Establish protected habitat zones",
                    "Coordinate with wildlife agencies",
                    "Begin captive breeding programs if appropriate",
                ],
                &[
                    "Develop species recovery plans",
                    "Habitat restoration and enhancement",
                    "Population monitoring and research",
                    "Community engagement and education",
                ],
                "Very High ($100,000 - $500,000)",
                "12-60 months",
                "70%",
            ),
        );
        table.insert(
            CategoryKey::IucnConservation,
            PlanLevel::Moderate,
            Strategy::authored(
                &[
                    "Implement habitat protection measures",
                    "Begin population monitoring",
                    "Reduce immediate threats",
                ],
                &[
                    "Habitat enhancement and connectivity",
                    "Species monitoring programs",
                    "Threat reduction strategies",
                ],
                "High ($25,000 - $100,000)",
                "6-36 months",
                "80%",
            ),
        );
        table.insert(
            CategoryKey::IucnConservation,
            PlanLevel::Low,
            Strategy::authored(
                &[
                    "Maintain current habitat conditions",
                    "Monitor for population changes",
                ],
                &[
                    "Preventive conservation measures",
                    "Habitat quality maintenance",
                ],
                "Low ($2,000 - $15,000)",
                "1-12 months",
                "95%",
            ),
        );

        table
    }
}

/// How timeline and effectiveness are reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanRevision {
    /// Static timeline and effectiveness regardless of input
    #[default]
    V1,
    /// Timeline and effectiveness of the dominant matched strategy
    /// (largest upper cost bound, first seen on ties)
    V2,
}

impl PlanRevision {
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(PlanRevision::V1),
            2 => Some(PlanRevision::V2),
            _ => None,
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            PlanRevision::V1 => 1,
            PlanRevision::V2 => 2,
        }
    }
}

/// Consolidated mitigation plan for one risk-list snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MitigationPlan {
    pub total_risks: usize,
    pub immediate_actions: Vec<String>,
    pub long_term_actions: Vec<String>,
    pub estimated_cost_range: String,
    pub estimated_timeline: String,
    pub expected_effectiveness: String,
    pub risks_by_category: IndexMap<CategoryKey, Vec<RiskRecord>>,
}

/// Mitigation planner holding an immutable strategy table
#[derive(Debug, Clone, Default)]
pub struct MitigationPlanner {
    strategies: StrategyTable,
    revision: PlanRevision,
}

impl MitigationPlanner {
    pub fn new(strategies: StrategyTable, revision: PlanRevision) -> Self {
        MitigationPlanner {
            strategies,
            revision,
        }
    }

    pub fn strategies(&self) -> &StrategyTable {
        &self.strategies
    }

    pub fn revision(&self) -> PlanRevision {
        self.revision
    }

    /// Strategy matched by one record, if any
    pub fn strategy_for(&self, risk: &RiskRecord) -> Option<&Strategy> {
        self.strategies
            .get(risk.category(), normalize_threat_level(risk.threat_code.as_deref()))
    }

    /// Build the consolidated plan
    pub fn generate_plan(&self, risks: &[RiskRecord]) -> MitigationPlan {
        let mut risks_by_category: IndexMap<CategoryKey, Vec<RiskRecord>> = IndexMap::new();
        let mut immediate: IndexSet<&str> = IndexSet::new();
        let mut long_term: IndexSet<&str> = IndexSet::new();
        let mut total_cost_min: u64 = 0;
        let mut total_cost_max: u64 = 0;
        let mut dominant: Option<(u64, &Strategy)> = None;

        for risk in risks {
            risks_by_category
                .entry(risk.category())
                .or_default()
                .push(risk.clone());

            let Some(strategy) = self.strategy_for(risk) else {
                continue;
            };

            immediate.extend(strategy.immediate.iter().map(String::as_str));
            long_term.extend(strategy.long_term.iter().map(String::as_str));

            match strategy.cost_bounds() {
                Some((min, max)) => {
                    total_cost_min = total_cost_min.saturating_add(min);
                    total_cost_max = total_cost_max.saturating_add(max);
                    if dominant.map_or(true, |(best, _)| max > best) {
                        dominant = Some((max, strategy));
                    }
                }
                None => {
                    tracing::debug!(cost = %strategy.cost, "skipping unparseable strategy cost");
                }
            }
        }

        let (estimated_timeline, expected_effectiveness) = match (self.revision, dominant) {
            (PlanRevision::V2, Some((_, strategy))) => {
                (strategy.timeline.clone(), strategy.effectiveness.clone())
            }
            _ => (DEFAULT_TIMELINE.to_string(), DEFAULT_EFFECTIVENESS.to_string()),
        };

        MitigationPlan {
            total_risks: risks.len(),
            immediate_actions: immediate.into_iter().map(str::to_string).collect(),
            long_term_actions: long_term.into_iter().map(str::to_string).collect(),
            estimated_cost_range: format!(
                "${} - ${}",
                format_thousands(total_cost_min),
                format_thousands(total_cost_max)
            ),
            estimated_timeline,
            expected_effectiveness,
            risks_by_category,
        }
    }
}

/// Parse the first `$<min> - $<max>` range in a cost label
///
/// Commas are stripped before parsing. Returns None when the label carries
/// no range or a bound does not fit in u64.
pub fn parse_cost_range(cost: &str) -> Option<(u64, u64)> {
    static COST_RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let re = COST_RE.get_or_init(|| Regex::new(r"\$([0-9,]+)\s*-\s*\$([0-9,]+)").unwrap());

    let caps = re.captures(cost)?;
    let min = caps[1].replace(',', "").parse().ok()?;
    let max = caps[2].replace(',', "").parse().ok()?;
    Some((min, max))
}

/// Render an integer with comma thousands separators (en-US style)
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_threat_level() {
        assert_eq!(normalize_threat_level(Some("High")), PlanLevel::High);
        assert_eq!(
            normalize_threat_level(Some("Critically Endangered")),
            PlanLevel::High
        );
        assert_eq!(normalize_threat_level(Some("endangered")), PlanLevel::High);
        assert_eq!(normalize_threat_level(Some("Vulnerable")), PlanLevel::Moderate);
        assert_eq!(
            normalize_threat_level(Some("Near Threatened")),
            PlanLevel::Moderate
        );
        assert_eq!(normalize_threat_level(Some("Least Concern")), PlanLevel::Low);
        assert_eq!(normalize_threat_level(Some("medium")), PlanLevel::Low);
        assert_eq!(normalize_threat_level(Some("bogus")), PlanLevel::Low);
        assert_eq!(normalize_threat_level(None), PlanLevel::Low);
    }

    #[test]
    fn test_parse_cost_range() {
        assert_eq!(
            parse_cost_range("High ($50,000 - $200,000)"),
            Some((50_000, 200_000))
        );
        assert_eq!(parse_cost_range("$1,000,000-$2,500,000"), Some((1_000_000, 2_500_000)));
        assert_eq!(parse_cost_range("Contact agency"), None);
        assert_eq!(parse_cost_range("$ - $"), None);
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1_000), "1,000");
        assert_eq!(format_thousands(400_000), "400,000");
        assert_eq!(format_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn test_default_table_covers_two_categories() {
        let table = StrategyTable::default();
        assert_eq!(table.len(), 6);
        for level in [PlanLevel::High, PlanLevel::Moderate, PlanLevel::Low] {
            assert!(table.get(CategoryKey::InvasiveSpecies, level).is_some());
            assert!(table.get(CategoryKey::IucnConservation, level).is_some());
            assert!(table.get(CategoryKey::MarineRisk, level).is_none());
        }
    }

    #[test]
    fn test_plan_empty_input() {
        let plan = MitigationPlanner::default().generate_plan(&[]);
        assert_eq!(plan.total_risks, 0);
        assert!(plan.immediate_actions.is_empty());
        assert_eq!(plan.estimated_cost_range, "$0 - $0");
        assert_eq!(plan.estimated_timeline, DEFAULT_TIMELINE);
        assert_eq!(plan.expected_effectiveness, DEFAULT_EFFECTIVENESS);
        assert!(plan.risks_by_category.is_empty());
    }

    #[test]
    fn test_plan_deduplicates_and_sums_cost() {
        let risks = vec![
            RiskRecord::new("Invasive Species Risk", "High"),
            RiskRecord::new("Invasive Species Risk", "high"),
        ];
        let plan = MitigationPlanner::default().generate_plan(&risks);
        assert_eq!(plan.immediate_actions.len(), 4);
        assert_eq!(plan.long_term_actions.len(), 4);
        assert_eq!(
            plan.immediate_actions[0],
            "Implement emergency containment protocols"
        );
        assert_eq!(plan.estimated_cost_range, "$100,000 - $400,000");
        assert_eq!(plan.risks_by_category[&CategoryKey::InvasiveSpecies].len(), 2);
    }

    #[test]
    fn test_plan_iucn_statuses_reach_strategies() {
        let risks = vec![
            RiskRecord::new("IUCN Red List", "Endangered"),
            RiskRecord::new("IUCN Red List", "Least Concern"),
        ];
        let plan = MitigationPlanner::default().generate_plan(&risks);
        assert_eq!(plan.estimated_cost_range, "$102,000 - $515,000");
        assert!(plan
            .immediate_actions
            .iter()
            .any(|a| a == "Coordinate with wildlife agencies"));
        assert!(plan
            .immediate_actions
            .iter()
            .any(|a| a == "Maintain current habitat conditions"));
    }

    #[test]
    fn test_plan_unmatched_categories_are_display_only() {
        let risks = vec![
            RiskRecord::new("Marine Risk", "High"),
            RiskRecord::new("Unknown Thing", "bogus"),
        ];
        let plan = MitigationPlanner::default().generate_plan(&risks);
        assert!(plan.immediate_actions.is_empty());
        assert!(plan.long_term_actions.is_empty());
        assert_eq!(plan.estimated_cost_range, "$0 - $0");
        let keys: Vec<_> = plan.risks_by_category.keys().copied().collect();
        assert_eq!(keys, vec![CategoryKey::MarineRisk, CategoryKey::Other]);
    }

    #[test]
    fn test_plan_skips_unparseable_cost() {
        let mut table = StrategyTable::empty();
        table.insert(
            CategoryKey::MarineRisk,
            PlanLevel::High,
            Strategy::authored(&["Close beach access"], &[], "Unbudgeted", "1 month", "50%"),
        );
        let planner = MitigationPlanner::new(table, PlanRevision::V1);
        let plan = planner.generate_plan(&[RiskRecord::new("Marine Risk", "High")]);
        assert_eq!(plan.immediate_actions, vec!["Close beach access"]);
        assert_eq!(plan.estimated_cost_range, "$0 - $0");
    }

    #[test]
    fn test_v1_timeline_is_static() {
        let risks = vec![RiskRecord::new("IUCN Red List", "Endangered")];
        let plan = MitigationPlanner::default().generate_plan(&risks);
        assert_eq!(plan.estimated_timeline, "1-12 months");
        assert_eq!(plan.expected_effectiveness, "85%");
    }

    #[test]
    fn test_v2_timeline_follows_dominant_strategy() {
        let planner = MitigationPlanner::new(StrategyTable::default(), PlanRevision::V2);
        let risks = vec![
            RiskRecord::new("Invasive Species", "Low"),
            RiskRecord::new("IUCN Red List", "Endangered"),
            RiskRecord::new("Invasive Species", "High"),
        ];
        let plan = planner.generate_plan(&risks);
        assert_eq!(plan.estimated_timeline, "12-60 months");
        assert_eq!(plan.expected_effectiveness, "70%");

        let nothing_matched = planner.generate_plan(&[RiskRecord::new("Marine Risk", "High")]);
        assert_eq!(nothing_matched.estimated_timeline, DEFAULT_TIMELINE);
    }

    #[test]
    fn test_plan_serializes_display_shape() {
        let plan = MitigationPlanner::default()
            .generate_plan(&[RiskRecord::new("Invasive Species", "Moderate")]);
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["totalRisks"], 1);
        assert_eq!(json["estimatedCostRange"], "$10,000 - $50,000");
        assert_eq!(json["estimatedTimeline"], "1-12 months");
        assert_eq!(json["expectedEffectiveness"], "85%");
        assert_eq!(
            json["risksByCategory"]["invasive_species"][0]["threatCode"],
            "Moderate"
        );
        assert!(json["immediateActions"].is_array());
        assert!(json["longTermActions"].is_array());
    }
}

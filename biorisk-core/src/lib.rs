//! BioRisk core library - biodiversity risk scoring and mitigation planning for hotel sites

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Analyzers never fail; malformed records degrade to safe defaults
// - No global mutable state
// - No randomness or clocks
// - Category output order follows first appearance in the input
// - Identical input yields byte-for-byte identical output

pub mod ahp;
pub mod config;
pub mod geo;
pub mod mitigation;
pub mod record;
pub mod report;
pub mod risk;

pub use config::ResolvedConfig;
pub use mitigation::{MitigationPlan, MitigationPlanner, PlanRevision, StrategyTable};
pub use record::{categorize, CategoryKey, QueryLocation, RiskQueryResponse, RiskRecord, ThreatLevel};
pub use report::{render_json, render_text, ReportSection};
pub use risk::{Priority, RiskAnalysis, RiskScorer, ScorerConfig};

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;

/// Scorer output and mitigation plan for one risk list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub analysis: RiskAnalysis,
    pub plan: MitigationPlan,
}

/// Runs both analyzers with one resolved configuration
#[derive(Debug, Clone, Default)]
pub struct Assessor {
    scorer: RiskScorer,
    planner: MitigationPlanner,
}

impl Assessor {
    pub fn new(config: &ResolvedConfig) -> Self {
        Assessor {
            scorer: RiskScorer::new(config.scorer_config()),
            planner: MitigationPlanner::new(StrategyTable::default(), config.plan_revision),
        }
    }

    pub fn scorer(&self) -> &RiskScorer {
        &self.scorer
    }

    pub fn planner(&self) -> &MitigationPlanner {
        &self.planner
    }

    pub fn assess(&self, risks: &[RiskRecord]) -> Assessment {
        Assessment {
            analysis: self.scorer.analyze(risks),
            plan: self.planner.generate_plan(risks),
        }
    }
}

/// A named risk list, usually one query response file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Site {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<QueryLocation>,
    pub risks: Vec<RiskRecord>,
}

impl Site {
    pub fn new(name: impl Into<String>, risks: Vec<RiskRecord>) -> Self {
        Site {
            name: name.into(),
            location: None,
            risks,
        }
    }

    /// Keep only records within `radius_miles` of `center`
    pub fn filter_within_radius(&mut self, center: geo::Coordinates, radius_miles: f64) {
        self.risks = geo::filter_within_radius(&self.risks, center, radius_miles);
    }

    /// Site coordinates from the query location, if present
    pub fn coordinates(&self) -> Option<geo::Coordinates> {
        self.location
            .as_ref()
            .map(|loc| geo::Coordinates::new(loc.latitude, loc.longitude))
    }
}

/// Assessment of one site
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteAssessment {
    pub site: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<QueryLocation>,
    pub analysis: RiskAnalysis,
    pub plan: MitigationPlan,
}

/// Assess many sites in parallel; results keep input order
pub fn assess_sites(assessor: &Assessor, sites: &[Site]) -> Vec<SiteAssessment> {
    assess_sites_with_progress(assessor, sites, || {})
}

/// Like [`assess_sites`], calling `on_done` once per finished site
pub fn assess_sites_with_progress<F>(
    assessor: &Assessor,
    sites: &[Site],
    on_done: F,
) -> Vec<SiteAssessment>
where
    F: Fn() + Sync,
{
    tracing::debug!(sites = sites.len(), "assessing sites");
    sites
        .par_iter()
        .map(|site| {
            let Assessment { analysis, plan } = assessor.assess(&site.risks);
            on_done();
            SiteAssessment {
                site: site.name.clone(),
                location: site.location.clone(),
                analysis,
                plan,
            }
        })
        .collect()
}

/// Parse a risk query response (bare list or `{location, risks}` envelope)
pub fn parse_site(name: &str, json: &str) -> Result<Site> {
    let response: RiskQueryResponse =
        serde_json::from_str(json).with_context(|| format!("failed to parse risk list: {}", name))?;
    let (location, risks) = response.into_parts();
    Ok(Site {
        name: name.to_string(),
        location,
        risks,
    })
}

/// Load a site from a JSON file; the file stem becomes the site name
pub fn load_site(path: &Path) -> Result<Site> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read risk list: {}", path.display()))?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let site = parse_site(&name, &content)
        .with_context(|| format!("in file: {}", path.display()))?;
    tracing::debug!(site = %site.name, risks = site.risks.len(), "loaded site");
    Ok(site)
}

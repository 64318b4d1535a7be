//! Reporting and output generation
//!
//! Global invariants enforced:
//! - Sites render in input order, categories in first-seen order
//! - Byte-for-byte identical output across runs

use crate::SiteAssessment;
use serde::Serialize;

/// Which parts of an assessment to render
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportSection {
    #[default]
    All,
    Analysis,
    Plan,
}

impl ReportSection {
    fn includes_analysis(self) -> bool {
        matches!(self, ReportSection::All | ReportSection::Analysis)
    }

    fn includes_plan(self) -> bool {
        matches!(self, ReportSection::All | ReportSection::Plan)
    }
}

/// JSON view of one site, omitting the sections not requested
#[derive(Serialize)]
struct SiteView<'a> {
    site: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a crate::QueryLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    analysis: Option<&'a crate::RiskAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    plan: Option<&'a crate::MitigationPlan>,
}

/// Render assessments as JSON output
pub fn render_json(assessments: &[SiteAssessment], section: ReportSection) -> String {
    let views: Vec<SiteView<'_>> = assessments
        .iter()
        .map(|a| SiteView {
            site: &a.site,
            location: a.location.as_ref(),
            analysis: section.includes_analysis().then_some(&a.analysis),
            plan: section.includes_plan().then_some(&a.plan),
        })
        .collect();
    serde_json::to_string_pretty(&views).unwrap_or_else(|_| "[]".to_string())
}

/// Render assessments as text output
pub fn render_text(assessments: &[SiteAssessment], section: ReportSection) -> String {
    let mut output = String::new();

    for (i, assessment) in assessments.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        output.push_str(&format!("Site: {}\n", assessment.site));
        if let Some(ref loc) = assessment.location {
            output.push_str(&format!(
                "Location: {:.4}, {:.4}\n",
                loc.latitude, loc.longitude
            ));
        }

        if section.includes_analysis() {
            render_analysis(&mut output, assessment);
        }
        if section.includes_plan() {
            render_plan(&mut output, assessment);
        }
    }

    output
}

fn render_analysis(output: &mut String, assessment: &SiteAssessment) {
    let analysis = &assessment.analysis;
    let insights = &analysis.insights;

    output.push_str(&format!(
        "Score: {}/100  Priority: {}  Risks: {}\n",
        analysis.score,
        insights.priority.as_str(),
        analysis.total_risks
    ));
    output.push_str(&format!(
        "Threats: {} critical, {} moderate, {} low\n",
        insights.critical_threats, insights.moderate_threats, insights.low_threats
    ));

    output.push_str("Recommendations:\n");
    for rec in &insights.recommendations {
        output.push_str(&format!("  - {}\n", rec));
    }

    if analysis.categories.is_empty() {
        return;
    }
    output.push_str(&format!(
        "{:<20} {:<6} {:<5} {:<5} {:<5} {}\n",
        "CATEGORY", "COUNT", "HIGH", "MOD", "LOW", "SPECIES/AREAS"
    ));
    for (category, breakdown) in &analysis.categories {
        let names = if breakdown.species_or_areas.is_empty() {
            "-".to_string()
        } else {
            breakdown.species_or_areas.join(", ")
        };
        output.push_str(&format!(
            "{:<20} {:<6} {:<5} {:<5} {:<5} {}\n",
            truncate_or_pad(category.as_str(), 20),
            breakdown.count,
            breakdown.threat_counts.high,
            breakdown.threat_counts.moderate,
            breakdown.threat_counts.low,
            truncate_or_pad(&names, 40).trim_end(),
        ));
    }
}

fn render_plan(output: &mut String, assessment: &SiteAssessment) {
    let plan = &assessment.plan;

    output.push_str("Immediate actions:\n");
    render_list(output, &plan.immediate_actions);
    output.push_str("Long-term actions:\n");
    render_list(output, &plan.long_term_actions);

    output.push_str(&format!("Estimated cost: {}\n", plan.estimated_cost_range));
    output.push_str(&format!("Timeline: {}\n", plan.estimated_timeline));
    output.push_str(&format!(
        "Expected effectiveness: {}\n",
        plan.expected_effectiveness
    ));
}

fn render_list(output: &mut String, items: &[String]) {
    if items.is_empty() {
        output.push_str("  (none)\n");
    }
    for item in items {
        output.push_str(&format!("  - {}\n", item));
    }
}

/// Truncate or pad string to fixed width
fn truncate_or_pad(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        format!("{:<width$}", s, width = width)
    }
}

//! Integration tests for site assessment over JSON fixtures

use biorisk_core::config::load_and_resolve;
use biorisk_core::geo::Coordinates;
use biorisk_core::{
    assess_sites, load_site, render_json, Assessor, CategoryKey, Priority, ReportSection,
    ResolvedConfig,
};
use std::fs;
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn test_mixed_site_analysis() {
    let site = load_site(&fixture_path("mixed-site.json")).unwrap();
    assert_eq!(site.name, "mixed-site");
    assert_eq!(site.risks.len(), 4);

    let assessment = Assessor::default().assess(&site.risks);
    let analysis = &assessment.analysis;

    // iucn 10*0.30 + invasive 6*0.25 + freshwater 2*0.20 = 4.9
    assert_eq!(analysis.score, 49);
    assert_eq!(analysis.insights.critical_threats, 1);
    assert_eq!(analysis.insights.moderate_threats, 2);
    assert_eq!(analysis.insights.low_threats, 1);
    assert_eq!(analysis.insights.priority, Priority::Critical);

    let order: Vec<CategoryKey> = analysis.categories.keys().copied().collect();
    assert_eq!(
        order,
        vec![
            CategoryKey::IucnConservation,
            CategoryKey::InvasiveSpecies,
            CategoryKey::FreshwaterRisk
        ]
    );
    let invasive = &analysis.categories[&CategoryKey::InvasiveSpecies];
    assert_eq!(invasive.count, 2);
    assert_eq!(invasive.threat_counts.moderate, 2);
    assert_eq!(
        invasive.species_or_areas,
        vec!["Phragmites australis", "Japanese Knotweed"]
    );
}

#[test]
fn test_mixed_site_plan() {
    let site = load_site(&fixture_path("mixed-site.json")).unwrap();
    let plan = Assessor::default().assess(&site.risks).plan;

    assert_eq!(plan.total_risks, 4);
    // IUCN high once, invasive moderate twice (deduplicated actions)
    assert_eq!(plan.immediate_actions.len(), 7);
    assert_eq!(plan.long_term_actions.len(), 7);
    assert_eq!(
        plan.immediate_actions[0],
        "Implement emergency species protection protocols"
    );
    assert_eq!(plan.estimated_cost_range, "$120,000 - $600,000");
    assert_eq!(plan.estimated_timeline, "1-12 months");
    assert_eq!(plan.expected_effectiveness, "85%");
    assert_eq!(plan.risks_by_category[&CategoryKey::InvasiveSpecies].len(), 2);
}

#[test]
fn test_plan_revision_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(".bioriskrc.json"), r#"{"plan_revision": 2}"#).unwrap();
    let config = load_and_resolve(dir.path(), None).unwrap();

    let site = load_site(&fixture_path("mixed-site.json")).unwrap();
    let plan = Assessor::new(&config).assess(&site.risks).plan;

    // The IUCN high strategy carries the largest cost ceiling
    assert_eq!(plan.estimated_timeline, "12-60 months");
    assert_eq!(plan.expected_effectiveness, "70%");
}

#[test]
fn test_custom_weights_change_score() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("weights.json");
    fs::write(
        &config_path,
        r#"{"weights": {"iucn_conservation": 0.0, "invasive_species": 0.0, "freshwater_risk": 0.0}}"#,
    )
    .unwrap();
    let config = load_and_resolve(dir.path(), Some(&config_path)).unwrap();

    let site = load_site(&fixture_path("mixed-site.json")).unwrap();
    let analysis = Assessor::new(&config).assess(&site.risks).analysis;
    assert_eq!(analysis.score, 0);
    // Insights do not depend on weights
    assert_eq!(analysis.insights.priority, Priority::Critical);
}

#[test]
fn test_envelope_site_with_radius_filter() {
    let mut site = load_site(&fixture_path("coastal-site.json")).unwrap();
    assert_eq!(site.risks.len(), 4);
    let location = site.location.clone().unwrap();
    assert_eq!(location.name.as_deref(), Some("Cape May Beach Resort"));

    let unfiltered = Assessor::default().assess(&site.risks);
    assert_eq!(unfiltered.analysis.score, 18);
    // "Vulnerable" maps to the moderate IUCN strategy
    assert_eq!(unfiltered.plan.estimated_cost_range, "$25,000 - $100,000");

    let center = site.coordinates().unwrap();
    site.filter_within_radius(center, 5.0);
    // Far shoals and the unplaced IUCN record are dropped
    assert_eq!(site.risks.len(), 2);

    let filtered = Assessor::default().assess(&site.risks);
    assert_eq!(filtered.analysis.score, 21);
    assert_eq!(filtered.analysis.insights.priority, Priority::Critical);
    assert!(filtered.plan.immediate_actions.is_empty());
    assert_eq!(filtered.plan.estimated_cost_range, "$0 - $0");
}

#[test]
fn test_radius_filter_with_explicit_center() {
    let mut site = load_site(&fixture_path("coastal-site.json")).unwrap();
    // Centered on the shoals, everything else is out of range
    site.filter_within_radius(Coordinates::new(39.2, -75.0), 1.0);
    assert_eq!(site.risks.len(), 1);
    assert_eq!(site.risks[0].description.as_deref(), Some("Delaware Bay shoals"));
}

#[test]
fn test_malformed_records_degrade() {
    let site = load_site(&fixture_path("malformed-site.json")).unwrap();
    let assessment = Assessor::default().assess(&site.risks);
    let analysis = &assessment.analysis;

    // other avg (1+1+1+10)/4 * 0.10 + marine 1 * 0.15 = 0.475
    assert_eq!(analysis.score, 5);
    assert_eq!(analysis.insights.critical_threats, 1);
    assert_eq!(analysis.insights.priority, Priority::Critical);

    let other = &analysis.categories[&CategoryKey::Other];
    assert_eq!(other.count, 4);
    assert_eq!(other.threat_counts.high, 1);
    assert!(other.species_or_areas.is_empty());
    assert_eq!(analysis.categories[&CategoryKey::MarineRisk].count, 1);

    assert!(assessment.plan.immediate_actions.is_empty());
    assert_eq!(assessment.plan.estimated_cost_range, "$0 - $0");
}

#[test]
fn test_empty_site() {
    let site = load_site(&fixture_path("empty-site.json")).unwrap();
    let assessment = Assessor::default().assess(&site.risks);
    assert_eq!(assessment.analysis.score, 0);
    assert_eq!(assessment.analysis.insights.priority, Priority::Low);
    assert!(assessment.analysis.categories.is_empty());
    assert_eq!(assessment.plan.total_risks, 0);
}

#[test]
fn test_missing_file_is_error() {
    let err = load_site(&fixture_path("does-not-exist.json")).unwrap_err();
    assert!(format!("{:#}", err).contains("does-not-exist.json"));
}

#[test]
fn test_batch_json_output() {
    let sites = vec![
        load_site(&fixture_path("mixed-site.json")).unwrap(),
        load_site(&fixture_path("coastal-site.json")).unwrap(),
    ];
    let assessor = Assessor::new(&ResolvedConfig::defaults());
    let assessments = assess_sites(&assessor, &sites);
    let json = render_json(&assessments, ReportSection::All);

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value[0]["site"], "mixed-site");
    assert_eq!(value[0]["analysis"]["score"], 49);
    assert_eq!(
        value[0]["plan"]["estimatedCostRange"],
        "$120,000 - $600,000"
    );
    assert_eq!(value[1]["site"], "coastal-site");
    assert_eq!(value[1]["location"]["name"], "Cape May Beach Resort");
    // Output records use camelCase regardless of input casing
    assert_eq!(
        value[0]["plan"]["risksByCategory"]["freshwater_risk"][0]["riskType"],
        "Freshwater Risk"
    );
}

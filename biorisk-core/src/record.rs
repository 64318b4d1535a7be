//! Risk records and the category/threat vocabulary shared by both analyzers
//!
//! Global invariants enforced:
//! - Classification is total: every record maps to exactly one category
//! - Category matching order is explicit (see `CATEGORY_PATTERNS`)
//! - Missing fields degrade to `other` / `unknown`, never to an error

use serde::{Deserialize, Serialize};

/// One biodiversity hazard observed near a queried location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskRecord {
    #[serde(alias = "risk_type", skip_serializing_if = "Option::is_none")]
    pub risk_type: Option<String>,
    #[serde(alias = "threat_code", skip_serializing_if = "Option::is_none")]
    pub threat_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl RiskRecord {
    pub fn new(risk_type: &str, threat_code: &str) -> Self {
        RiskRecord {
            risk_type: Some(risk_type.to_string()),
            threat_code: Some(threat_code.to_string()),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// Category derived from `risk_type`
    pub fn category(&self) -> CategoryKey {
        let category = categorize(self.risk_type.as_deref());
        if category == CategoryKey::Other {
            tracing::trace!(
                risk_type = ?self.risk_type,
                "risk type matched no category, using other"
            );
        }
        category
    }

    /// Lowercased threat code, if present
    pub fn threat_lowercase(&self) -> Option<String> {
        self.threat_code.as_deref().map(str::to_lowercase)
    }

    /// Both coordinates, when the record carries them
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Risk category derived from the free-text `risk_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKey {
    InvasiveSpecies,
    IucnConservation,
    FreshwaterRisk,
    MarineRisk,
    TerrestrialRisk,
    Other,
}

impl CategoryKey {
    /// All categories in declaration order
    pub const ALL: [CategoryKey; 6] = [
        CategoryKey::InvasiveSpecies,
        CategoryKey::IucnConservation,
        CategoryKey::FreshwaterRisk,
        CategoryKey::MarineRisk,
        CategoryKey::TerrestrialRisk,
        CategoryKey::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKey::InvasiveSpecies => "invasive_species",
            CategoryKey::IucnConservation => "iucn_conservation",
            CategoryKey::FreshwaterRisk => "freshwater_risk",
            CategoryKey::MarineRisk => "marine_risk",
            CategoryKey::TerrestrialRisk => "terrestrial_risk",
            CategoryKey::Other => "other",
        }
    }

    /// Parse the snake_case key used in JSON and on the command line
    pub fn from_key(key: &str) -> Option<Self> {
        CategoryKey::ALL.into_iter().find(|c| c.as_str() == key)
    }
}

impl std::fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered (substring, category) pairs; the first match wins
pub const CATEGORY_PATTERNS: &[(&str, CategoryKey)] = &[
    ("invasive", CategoryKey::InvasiveSpecies),
    ("iucn", CategoryKey::IucnConservation),
    ("freshwater", CategoryKey::FreshwaterRisk),
    ("marine", CategoryKey::MarineRisk),
    ("terrestrial", CategoryKey::TerrestrialRisk),
];

/// Categorize a risk type by case-insensitive substring match
///
/// An absent risk type is treated as the empty string and falls into `Other`.
pub fn categorize(risk_type: Option<&str>) -> CategoryKey {
    let lowered = risk_type.unwrap_or("").to_lowercase();
    CATEGORY_PATTERNS
        .iter()
        .find(|(pattern, _)| lowered.contains(*pattern))
        .map(|(_, category)| *category)
        .unwrap_or(CategoryKey::Other)
}

/// Severity as seen by the risk scorer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    High,
    Moderate,
    Medium,
    Low,
    Unknown,
}

impl ThreatLevel {
    /// Exact match on the lowercased threat code; anything else is `Unknown`
    pub fn from_code(threat_code: Option<&str>) -> Self {
        match threat_code.map(str::to_lowercase).as_deref() {
            Some("high") => ThreatLevel::High,
            Some("moderate") => ThreatLevel::Moderate,
            Some("medium") => ThreatLevel::Medium,
            Some("low") => ThreatLevel::Low,
            _ => ThreatLevel::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::High => "high",
            ThreatLevel::Moderate => "moderate",
            ThreatLevel::Medium => "medium",
            ThreatLevel::Low => "low",
            ThreatLevel::Unknown => "unknown",
        }
    }
}

/// Center of a risk query as returned by the search service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// Input document: either a bare record list or a search response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RiskQueryResponse {
    Records(Vec<RiskRecord>),
    Envelope {
        #[serde(default)]
        location: Option<QueryLocation>,
        risks: Vec<RiskRecord>,
    },
}

impl RiskQueryResponse {
    pub fn into_parts(self) -> (Option<QueryLocation>, Vec<RiskRecord>) {
        match self {
            RiskQueryResponse::Records(risks) => (None, risks),
            RiskQueryResponse::Envelope { location, risks } => (location, risks),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_category_falls_back_to_other() {
        assert_eq!(
            RiskRecord::new("Unknown Thing", "bogus").category(),
            CategoryKey::Other
        );
        assert_eq!(RiskRecord::default().category(), CategoryKey::Other);
        assert_eq!(
            RiskRecord::new("Coastal marine zone", "Low").category(),
            CategoryKey::MarineRisk
        );
    }

    #[test]
    fn test_categorize_priority_order() {
        assert_eq!(
            categorize(Some("Invasive Species Risk")),
            CategoryKey::InvasiveSpecies
        );
        assert_eq!(categorize(Some("IUCN Red List")), CategoryKey::IucnConservation);
        assert_eq!(categorize(Some("Freshwater Risk")), CategoryKey::FreshwaterRisk);
        assert_eq!(categorize(Some("Marine Risk")), CategoryKey::MarineRisk);
        assert_eq!(
            categorize(Some("Terrestrial Risk")),
            CategoryKey::TerrestrialRisk
        );
        // "invasive" precedes "marine" in the pattern list
        assert_eq!(
            categorize(Some("Marine invasive algae")),
            CategoryKey::InvasiveSpecies
        );
    }

    #[test]
    fn test_categorize_is_case_insensitive_and_total() {
        assert_eq!(
            categorize(Some("INVASIVE SPECIES RISK")),
            categorize(Some("invasive species risk"))
        );
        assert_eq!(categorize(Some("Unknown Thing")), CategoryKey::Other);
        assert_eq!(categorize(Some("")), CategoryKey::Other);
        assert_eq!(categorize(None), CategoryKey::Other);
    }

    #[test]
    fn test_threat_level_from_code() {
        assert_eq!(ThreatLevel::from_code(Some("High")), ThreatLevel::High);
        assert_eq!(ThreatLevel::from_code(Some("MEDIUM")), ThreatLevel::Medium);
        assert_eq!(ThreatLevel::from_code(Some("Endangered")), ThreatLevel::Unknown);
        assert_eq!(ThreatLevel::from_code(Some(" high")), ThreatLevel::Unknown);
        assert_eq!(ThreatLevel::from_code(None), ThreatLevel::Unknown);
    }

    #[test]
    fn test_record_accepts_snake_and_camel_case() {
        let snake: RiskRecord =
            serde_json::from_str(r#"{"risk_type": "Marine Risk", "threat_code": "Low"}"#).unwrap();
        let camel: RiskRecord =
            serde_json::from_str(r#"{"riskType": "Marine Risk", "threatCode": "Low"}"#).unwrap();
        assert_eq!(snake, camel);

        let json = serde_json::to_string(&snake).unwrap();
        assert_eq!(json, r#"{"riskType":"Marine Risk","threatCode":"Low"}"#);
    }

    #[test]
    fn test_record_ignores_extra_fields_and_nulls() {
        let record: RiskRecord = serde_json::from_str(
            r#"{"id": 7, "distance": 1.2, "risk_type": null, "description": "Snapping turtle"}"#,
        )
        .unwrap();
        assert_eq!(record.risk_type, None);
        assert_eq!(record.category(), CategoryKey::Other);
        assert_eq!(record.description.as_deref(), Some("Snapping turtle"));
    }

    #[test]
    fn test_query_response_shapes() {
        let bare: RiskQueryResponse =
            serde_json::from_str(r#"[{"riskType": "IUCN Red List"}]"#).unwrap();
        let (location, risks) = bare.into_parts();
        assert!(location.is_none());
        assert_eq!(risks.len(), 1);

        let envelope: RiskQueryResponse = serde_json::from_str(
            r#"{"location": {"latitude": 40.1, "longitude": -74.5}, "risks": []}"#,
        )
        .unwrap();
        let (location, risks) = envelope.into_parts();
        assert_eq!(location.map(|l| l.latitude), Some(40.1));
        assert!(risks.is_empty());
    }

    #[test]
    fn test_category_key_round_trip_names() {
        for category in CategoryKey::ALL {
            assert_eq!(CategoryKey::from_key(category.as_str()), Some(category));
        }
        assert_eq!(CategoryKey::from_key("desert_risk"), None);
    }
}

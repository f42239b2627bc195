use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Floor area used when the form leaves business size untouched.
pub const DEFAULT_BUSINESS_SIZE: u32 = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskAppetite {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskAppetite {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskAppetite::Low => "low",
            RiskAppetite::Medium => "medium",
            RiskAppetite::High => "high",
        }
    }
}

impl FromStr for RiskAppetite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskAppetite::Low),
            "medium" => Ok(RiskAppetite::Medium),
            "high" => Ok(RiskAppetite::High),
            other => Err(format!("unknown risk appetite '{}' (expected low, medium or high)", other)),
        }
    }
}

impl fmt::Display for RiskAppetite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk verdict returned by the scoring backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// The three detail panels fetched after a successful primary analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Panel {
    Financial,
    Competition,
    Ranking,
}

impl Panel {
    pub const ALL: [Panel; 3] = [Panel::Financial, Panel::Competition, Panel::Ranking];

    pub fn as_str(&self) -> &'static str {
        match self {
            Panel::Financial => "financial",
            Panel::Competition => "competition",
            Panel::Ranking => "ranking",
        }
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Frozen, validated analysis parameters. Built from the form draft at the
/// moment of submission and shared by the primary and secondary requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    pub business_type: String,
    pub location_id: String,
    pub investment_budget: f64,
    pub business_size: u32,
    pub risk_appetite: RiskAppetite,
}

impl AnalysisRequest {
    /// Short sha256 prefix of the serialized request, used to correlate
    /// primary and secondary log records.
    pub fn fingerprint(&self) -> String {
        let encoded = serde_json::to_vec(self).unwrap_or_default();
        let digest = Sha256::digest(&encoded);
        hex::encode(&digest[..8])
    }
}

// =============================================================================
// Primary analysis
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub name: String,
    pub score: f64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub viability_score: f64,
    pub success_probability: f64,
    pub breakeven_months: u32,
    pub expected_roi_min: f64,
    pub expected_roi_max: f64,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub ai_insights: String,
    #[serde(default)]
    pub positive_factors: Vec<Factor>,
    #[serde(default)]
    pub risk_factors: Vec<Factor>,
}

// =============================================================================
// Secondary analyses
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionPoint {
    pub month: u32,
    pub revenue: f64,
    pub expenses: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit: Option<f64>,
    pub cumulative_profit: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionEnvelope {
    pub projections: Vec<ProjectionPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyBusiness {
    pub name: String,
    pub distance: f64,
    pub rating: f64,
    pub reviews: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitionSnapshot {
    pub total_competitors: u32,
    pub density_score: f64,
    #[serde(default)]
    pub nearby_businesses: Vec<NearbyBusiness>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaScore {
    pub area_name: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatmapEnvelope {
    pub heatmap: Vec<AreaScore>,
}

// =============================================================================
// Reference catalog
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessType {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_startup_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_roi: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub area: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

impl Location {
    /// "Manhattan, New York"
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.area, self.city)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessTypeEnvelope {
    pub business_types: Vec<BusinessType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationEnvelope {
    pub locations: Vec<Location>,
}

/// Static choice lists for the form. Loaded once per session and shared
/// read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReferenceCatalog {
    pub business_types: Vec<BusinessType>,
    pub locations: Vec<Location>,
}

impl ReferenceCatalog {
    pub fn is_empty(&self) -> bool {
        self.business_types.is_empty() && self.locations.is_empty()
    }

    pub fn business_type(&self, id: &str) -> Option<&BusinessType> {
        self.business_types.iter().find(|b| b.id == id)
    }

    pub fn location(&self, id: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            business_type: "cafe".to_string(),
            location_id: "nyc_manhattan".to_string(),
            investment_budget: 80_000.0,
            business_size: DEFAULT_BUSINESS_SIZE,
            risk_appetite: RiskAppetite::Medium,
        }
    }

    #[test]
    fn test_request_serializes_numbers_as_numbers() {
        let value = serde_json::to_value(request()).unwrap();
        assert!(value["investment_budget"].is_number());
        assert!(value["business_size"].is_number());
        assert_eq!(value["risk_appetite"], "medium");
    }

    #[test]
    fn test_fingerprint_tracks_request_content() {
        let a = request();
        let mut b = request();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 16);
        b.investment_budget = 90_000.0;
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_risk_appetite_parse() {
        assert_eq!("HIGH".parse::<RiskAppetite>().unwrap(), RiskAppetite::High);
        assert_eq!(" low ".parse::<RiskAppetite>().unwrap(), RiskAppetite::Low);
        assert!("reckless".parse::<RiskAppetite>().is_err());
        assert_eq!(RiskAppetite::default(), RiskAppetite::Medium);
    }

    #[test]
    fn test_result_decodes_backend_shape() {
        let body = r#"{
            "viability_score": 82.4,
            "success_probability": 74.9,
            "risk_level": "Low",
            "expected_roi_min": 0.24,
            "expected_roi_max": 0.39,
            "breakeven_months": 21,
            "positive_factors": [{"name": "Demand Score", "score": 88.0, "description": "Strong"}],
            "risk_factors": [],
            "ai_insights": "Solid opportunity."
        }"#;
        let result: AnalysisResult = serde_json::from_str(body).unwrap();
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert_eq!(result.breakeven_months, 21);
        assert_eq!(result.positive_factors[0].name, "Demand Score");
    }

    #[test]
    fn test_projection_profit_is_optional() {
        let body = r#"{"projections": [{"month": 1, "revenue": 10.0, "expenses": 4.0, "cumulative_profit": -94.0}]}"#;
        let env: ProjectionEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(env.projections[0].profit, None);
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = ReferenceCatalog {
            business_types: vec![BusinessType {
                id: "gym".to_string(),
                name: "Fitness Center / Gym".to_string(),
                category: None,
                avg_startup_cost: None,
                avg_roi: None,
            }],
            locations: vec![Location {
                id: "chicago_loop".to_string(),
                area: "The Loop".to_string(),
                city: "Chicago".to_string(),
                state: Some("IL".to_string()),
                lat: None,
                lng: None,
            }],
        };
        assert!(catalog.business_type("gym").is_some());
        assert!(catalog.business_type("cafe").is_none());
        assert_eq!(catalog.location("chicago_loop").unwrap().display_name(), "The Loop, Chicago");
        assert!(!catalog.is_empty());
        assert!(ReferenceCatalog::default().is_empty());
    }
}

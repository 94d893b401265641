use chrono::NaiveDate;
use geo::{MultiPolygon, Point, Rect};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

#[derive(Debug, Deserialize)]
pub struct RawBoundaryRow {
    #[serde(rename = "Barangay")]
    pub barangay: Option<String>,
    #[serde(rename = "Geometry")]
    pub geometry: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawForecastRow {
    #[serde(rename = "Barangay")]
    pub barangay: Option<String>,
    #[serde(rename = "Date")]
    pub date: Option<String>,
    #[serde(rename = "Model", default)]
    pub model: Option<String>,
    #[serde(rename = "Forecast_Cases")]
    pub forecast_cases: Option<String>,
    #[serde(rename = "Risk_Level")]
    pub risk_level: Option<String>,
    #[serde(rename = "Relative_Risk_Index", default)]
    pub relative_risk_index: Option<String>,
}

/// A named administrative area with its boundary in longitude/latitude degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct Subdivision {
    pub name: String,
    pub boundary: MultiPolygon<f64>,
    pub centroid: Option<Point<f64>>,
    pub extent: Option<Rect<f64>>,
}

/// Ordered risk tier. Declaration order is severity order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }

    /// Numeric tier used for ranking (Low=1, Medium=2, High=3).
    pub fn rank(&self) -> u8 {
        match self {
            RiskLevel::Low => 1,
            RiskLevel::Medium => 2,
            RiskLevel::High => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRecord {
    pub subdivision: String,
    /// Index into the snapshot's subdivision list; `None` when the key did not
    /// resolve to a boundary.
    pub geometry: Option<usize>,
    pub date: NaiveDate,
    pub year: i32,
    pub week: u32,
    pub model: Option<String>,
    pub forecast_cases: f64,
    /// Label as it appeared in the input, trimmed.
    pub risk_label: Option<String>,
    pub risk_level: Option<RiskLevel>,
    pub relative_risk_index: Option<f64>,
}

impl ForecastRecord {
    /// Label for display: the normalized tier name, else the raw label.
    pub fn display_risk(&self) -> String {
        match (self.risk_level, &self.risk_label) {
            (Some(level), _) => level.as_str().to_string(),
            (None, Some(raw)) => raw.clone(),
            (None, None) => String::new(),
        }
    }
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct RankingRow {
    #[serde(rename = "Barangay")]
    #[tabled(rename = "Barangay")]
    pub subdivision: String,
    #[serde(rename = "ForecastCases")]
    #[tabled(rename = "Forecast Cases")]
    pub forecast_cases: String,
    #[serde(rename = "RelativeRiskIndex")]
    #[tabled(rename = "Relative Risk Index")]
    pub relative_risk_index: String,
    #[serde(rename = "RiskLevel")]
    #[tabled(rename = "Risk Level")]
    pub risk_level: String,
    #[serde(rename = "Background")]
    #[tabled(skip)]
    pub background: String,
    #[serde(rename = "TextColor")]
    #[tabled(skip)]
    pub text_color: String,
}

/// How the case metric is reduced over the filtered subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    #[default]
    Total,
    Average,
}

impl Reduction {
    pub fn title(&self) -> &'static str {
        match self {
            Reduction::Total => "Total Forecasted Cases",
            Reduction::Average => "Average Forecasted Cases",
        }
    }
}

/// Scalar metrics over one filtered subset. `None` marks the empty state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub reduction: Reduction,
    pub cases: Option<f64>,
    pub highest_risk: Option<String>,
    pub lowest_risk: Option<String>,
}

impl SummaryStats {
    pub fn empty(reduction: Reduction) -> Self {
        SummaryStats {
            reduction,
            cases: None,
            highest_risk: None,
            lowest_risk: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_none() && self.highest_risk.is_none() && self.lowest_risk.is_none()
    }
}

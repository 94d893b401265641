// Deployment configuration.
//
// One JSON document selects the variant: whether the model dimension is in
// play, which color strategy is used, and which end of the week range the
// selection falls back to. Every field is optional.

use crate::classify::{Rgb, RiskClassifier};
use crate::error::ConfigError;
use crate::types::Reduction;
use serde::Deserialize;
use std::path::Path;

/// Boundary a week selection falls back to when it is missing or invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekPolicy {
    #[default]
    Earliest,
    Latest,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Classification {
    Discrete,
    Gradient { stops: Vec<String> },
    Binned { thresholds: Vec<f64>, palette: Vec<String> },
}

impl Default for Classification {
    fn default() -> Self {
        Classification::Discrete
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayerStyle {
    pub border_color: String,
    pub border_weight: f64,
    pub border_opacity: f64,
    pub fill_opacity: f64,
    pub highlight_color: String,
    pub highlight_weight: f64,
}

impl Default for LayerStyle {
    fn default() -> Self {
        LayerStyle {
            border_color: "#686A6A".to_string(),
            border_weight: 1.0,
            border_opacity: 1.0,
            fill_opacity: 1.0,
            highlight_color: "green".to_string(),
            highlight_weight: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub preferred_year: Option<i32>,
    pub preferred_model: Option<String>,
    /// Filter by forecasting model when the data carries one.
    pub model_dimension: bool,
    pub week_policy: WeekPolicy,
    pub classification: Classification,
    pub reduction: Reduction,
    pub value_decimals: usize,
    pub layer: LayerStyle,
    pub legend_caption: String,
    /// Degrees added around the filtered geometries' bounding box.
    pub bounds_buffer: f64,
    pub show_relative_risk: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            preferred_year: Some(2025),
            preferred_model: None,
            model_dimension: true,
            week_policy: WeekPolicy::default(),
            classification: Classification::default(),
            reduction: Reduction::default(),
            value_decimals: 2,
            layer: LayerStyle::default(),
            legend_caption: "Risk Level".to_string(),
            bounds_buffer: 0.05,
            show_relative_risk: true,
        }
    }
}

impl DashboardConfig {
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&s)
    }

    /// Check the colors and build the classifier this configuration selects.
    pub fn validate(&self) -> Result<RiskClassifier, ConfigError> {
        Rgb::parse(&self.layer.border_color)?;
        match &self.classification {
            Classification::Discrete => Ok(RiskClassifier::Discrete),
            Classification::Gradient { stops } => RiskClassifier::gradient(stops),
            Classification::Binned {
                thresholds,
                palette,
            } => RiskClassifier::binned(thresholds, palette),
        }
    }
}

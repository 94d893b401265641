// Risk colors.
//
// A deployment picks one strategy: discrete tier colors keyed by the
// normalized risk label, or a continuous scale over `forecast_cases` fitted
// to the current filtered subset (either a multi-stop gradient or ascending
// bins). Every color handed out comes with a legible text color.

use crate::error::ConfigError;
use crate::types::{ForecastRecord, RiskLevel};
use crate::util::format_compact;
use serde::Serialize;

pub const LOW_COLOR: &str = "#ffffcc";
pub const MEDIUM_COLOR: &str = "#fd8d3c";
pub const HIGH_COLOR: &str = "#bd0026";
/// Neutral fill for missing or unrecognized labels.
pub const FALLBACK_COLOR: &str = "#bdbdbd";

/// Luminance at or above which text is drawn black.
const CONTRAST_THRESHOLD: f64 = 128.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parse `#rrggbb` or `#rrggbbaa`; alpha is ignored.
    pub fn parse(hex: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidColor(hex.to_string());
        let digits = hex.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !(digits.len() == 6 || digits.len() == 8) || !digits.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| invalid());
        Ok(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    /// Weighted channel sum (ITU-R BT.601 weights), 0..=255.
    pub fn luminance(self) -> f64 {
        0.299 * self.0 as f64 + 0.587 * self.1 as f64 + 0.114 * self.2 as f64
    }

    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }
}

/// Text color that stays legible on `background`: white on dark, black on light.
/// Unparsable backgrounds are treated as light.
pub fn contrast_text_color(background: &str) -> &'static str {
    match Rgb::parse(background) {
        Ok(rgb) if rgb.luminance() < CONTRAST_THRESHOLD => "#ffffff",
        _ => "#000000",
    }
}

/// Normalize a risk label to its tier.
///
/// Case, surrounding whitespace, `-`/`_` separators and a trailing "risk"
/// word are ignored, so "Low", "LOW RISK" and "low_risk" all resolve to
/// [`RiskLevel::Low`]. "Moderate" is accepted for Medium.
pub fn normalize_risk_label(label: &str) -> Option<RiskLevel> {
    let cleaned = label.to_lowercase().replace(|c: char| c == '-' || c == '_', " ");
    let mut words: Vec<&str> = cleaned.split_whitespace().collect();
    if words.len() > 1 && words.last() == Some(&"risk") {
        words.pop();
    }
    match words.as_slice() {
        ["low"] => Some(RiskLevel::Low),
        ["medium"] | ["moderate"] => Some(RiskLevel::Medium),
        ["high"] => Some(RiskLevel::High),
        _ => None,
    }
}

pub fn tier_color(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Low => LOW_COLOR,
        RiskLevel::Medium => MEDIUM_COLOR,
        RiskLevel::High => HIGH_COLOR,
    }
}

/// Discrete lookup from a raw label. Never fails; unknown labels get
/// [`FALLBACK_COLOR`].
pub fn classify_label(label: Option<&str>) -> &'static str {
    label
        .and_then(normalize_risk_label)
        .map_or(FALLBACK_COLOR, tier_color)
}

/// A background color and the text color to draw over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Swatch {
    pub fill: String,
    pub text: String,
}

impl Swatch {
    fn new(fill: String) -> Self {
        let text = contrast_text_color(&fill).to_string();
        Swatch { fill, text }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: String,
}

/// Legend handed to the renderer alongside the layer styles.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Legend {
    Swatches {
        caption: String,
        entries: Vec<LegendEntry>,
    },
    Gradient {
        caption: String,
        stops: Vec<String>,
        min: f64,
        max: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RiskClassifier {
    Discrete,
    Gradient { stops: Vec<Rgb> },
    Binned { thresholds: Vec<f64>, palette: Vec<Rgb> },
}

/// Numeric range of a continuous scale; `max > min` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    /// Range of `forecast_cases` over `subset`. An empty subset, an all-zero
    /// subset or a single repeated value is widened to `[min, min + 1]`.
    pub fn of(subset: &[&ForecastRecord]) -> Self {
        let mut values = subset.iter().map(|r| r.forecast_cases);
        let Some(first) = values.next() else {
            return ValueRange { min: 0.0, max: 1.0 };
        };
        let (min, max) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if max == 0.0 || max <= min {
            ValueRange { min, max: min + 1.0 }
        } else {
            ValueRange { min, max }
        }
    }

    fn position(&self, value: f64) -> f64 {
        ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }
}

impl RiskClassifier {
    pub fn gradient(stops: &[String]) -> Result<Self, ConfigError> {
        if stops.len() < 2 {
            return Err(ConfigError::InvalidScale(
                "a gradient needs at least two stops".to_string(),
            ));
        }
        let stops = stops.iter().map(|s| Rgb::parse(s)).collect::<Result<_, _>>()?;
        Ok(RiskClassifier::Gradient { stops })
    }

    pub fn binned(thresholds: &[f64], palette: &[String]) -> Result<Self, ConfigError> {
        if thresholds.is_empty() {
            return Err(ConfigError::InvalidScale("no bin thresholds".to_string()));
        }
        if thresholds.len() != palette.len() {
            return Err(ConfigError::InvalidScale(format!(
                "{} thresholds but {} palette colors",
                thresholds.len(),
                palette.len()
            )));
        }
        if thresholds.iter().any(|t| !t.is_finite())
            || thresholds.windows(2).any(|w| w[0] >= w[1])
        {
            return Err(ConfigError::InvalidScale(
                "bin thresholds must be finite and strictly ascending".to_string(),
            ));
        }
        let palette = palette.iter().map(|s| Rgb::parse(s)).collect::<Result<_, _>>()?;
        Ok(RiskClassifier::Binned {
            thresholds: thresholds.to_vec(),
            palette,
        })
    }

    /// Bind the classifier to one filtered subset. Continuous scales take
    /// their range from that subset only.
    pub fn fit(&self, subset: &[&ForecastRecord]) -> FittedClassifier<'_> {
        FittedClassifier {
            classifier: self,
            range: ValueRange::of(subset),
            observed_max: subset.iter().map(|r| r.forecast_cases).reduce(f64::max),
        }
    }
}

pub struct FittedClassifier<'a> {
    classifier: &'a RiskClassifier,
    range: ValueRange,
    observed_max: Option<f64>,
}

impl FittedClassifier<'_> {
    pub fn range(&self) -> ValueRange {
        self.range
    }

    pub fn swatch(&self, record: &ForecastRecord) -> Swatch {
        match self.classifier {
            RiskClassifier::Discrete => {
                Swatch::new(classify_label(record.risk_label.as_deref()).to_string())
            }
            _ => self.swatch_for_value(record.forecast_cases),
        }
    }

    /// Continuous color for a value. The discrete strategy has no value scale,
    /// and a scale with no color for the value answers with the fallback color.
    pub fn swatch_for_value(&self, value: f64) -> Swatch {
        let rgb = match self.classifier {
            RiskClassifier::Discrete => None,
            RiskClassifier::Gradient { stops } => sample(stops, self.position(value)),
            RiskClassifier::Binned { palette, .. } => palette.get(self.bin_index(value)).copied(),
        };
        Swatch::new(rgb.map_or_else(|| FALLBACK_COLOR.to_string(), Rgb::to_hex))
    }

    /// Position of `value` on the gradient, 0..=1.
    pub fn position(&self, value: f64) -> f64 {
        if value.is_nan() {
            return 0.0;
        }
        self.range.position(value)
    }

    /// Bin holding `value`. Values below the first threshold land in the
    /// first bin; the last bin takes everything from its threshold upward,
    /// including the subset maximum.
    pub fn bin_index(&self, value: f64) -> usize {
        match self.classifier {
            RiskClassifier::Binned { thresholds, .. } => thresholds
                .iter()
                .take_while(|t| value >= **t)
                .count()
                .saturating_sub(1),
            _ => 0,
        }
    }

    pub fn legend(&self, caption: &str) -> Legend {
        let caption = caption.to_string();
        match self.classifier {
            RiskClassifier::Discrete => Legend::Swatches {
                caption,
                entries: RiskLevel::ALL
                    .iter()
                    .map(|level| LegendEntry {
                        label: level.as_str().to_string(),
                        color: tier_color(*level).to_string(),
                    })
                    .collect(),
            },
            RiskClassifier::Gradient { stops } => Legend::Gradient {
                caption,
                stops: stops.iter().map(|c| c.to_hex()).collect(),
                min: self.range().min,
                max: self.range().max,
            },
            RiskClassifier::Binned { thresholds, palette } => Legend::Swatches {
                caption,
                entries: thresholds
                    .iter()
                    .zip(palette)
                    .enumerate()
                    .map(|(i, (lo, color))| LegendEntry {
                        label: self.bin_label(thresholds, i, *lo),
                        color: color.to_hex(),
                    })
                    .collect(),
            },
        }
    }

    fn bin_label(&self, thresholds: &[f64], i: usize, lo: f64) -> String {
        match thresholds.get(i + 1) {
            Some(hi) => format!("{} - {}", format_compact(lo, 2), format_compact(*hi, 2)),
            None => match self.observed_max {
                Some(max) if max > lo => {
                    format!("{} - {}", format_compact(lo, 2), format_compact(max, 2))
                }
                _ => format!("{}+", format_compact(lo, 2)),
            },
        }
    }
}

fn sample(stops: &[Rgb], t: f64) -> Option<Rgb> {
    match stops {
        [] => None,
        [only] => Some(*only),
        _ => {
            let max_idx = (stops.len() - 1) as f64;
            let scaled = t.clamp(0.0, 1.0) * max_idx;
            let lo = (scaled as usize).min(stops.len() - 2);
            Some(stops[lo].lerp(stops[lo + 1], scaled - lo as f64))
        }
    }
}

// Descriptors for the external map renderer.
//
// Nothing here draws anything; the renderer receives one styled feature per
// geometry in the filtered subset, a legend, a label layer and a viewport.

use crate::classify::{FittedClassifier, Legend};
use crate::config::DashboardConfig;
use crate::loader::Snapshot;
use crate::types::ForecastRecord;
use crate::util::format_compact;
use geo::Rect;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyleDescriptor {
    pub fill_color: String,
    pub fill_opacity: f64,
    pub color: String,
    pub weight: f64,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightStyle {
    pub color: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipField {
    pub alias: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    pub subdivision: String,
    pub geometry: geojson::Geometry,
    pub style: StyleDescriptor,
    pub tooltip: Vec<TooltipField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Label {
    pub subdivision: String,
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapLayer {
    pub features: Vec<Feature>,
    pub highlight: HighlightStyle,
    pub legend: Legend,
    /// Subdivision names at their centroids; off until the viewer enables it.
    pub labels: Vec<Label>,
    pub labels_visible: bool,
    pub bounds: Option<Bounds>,
}

pub fn build_layer(
    snapshot: &Snapshot,
    subset: &[&ForecastRecord],
    classifier: &FittedClassifier<'_>,
    config: &DashboardConfig,
) -> MapLayer {
    let mut features = Vec::new();
    let mut extent: Option<Rect<f64>> = None;
    for record in subset {
        // Records without a boundary only reach the table.
        let Some(sub) = snapshot.geometry_of(record) else {
            continue;
        };
        if let Some(rect) = sub.extent {
            extent = Some(match extent {
                Some(acc) => union(acc, rect),
                None => rect,
            });
        }
        let swatch = classifier.swatch(record);
        features.push(Feature {
            subdivision: record.subdivision.clone(),
            geometry: geojson::Geometry::new(geojson::Value::from(&sub.boundary)),
            style: StyleDescriptor {
                fill_color: swatch.fill,
                fill_opacity: config.layer.fill_opacity,
                color: config.layer.border_color.clone(),
                weight: config.layer.border_weight,
                opacity: config.layer.border_opacity,
            },
            tooltip: tooltip(record, config),
        });
    }

    let labels = snapshot
        .subdivisions()
        .iter()
        .filter_map(|s| {
            s.centroid.map(|c| Label {
                subdivision: s.name.clone(),
                lon: c.x(),
                lat: c.y(),
            })
        })
        .collect();

    let buffer = config.bounds_buffer;
    MapLayer {
        features,
        highlight: HighlightStyle {
            color: config.layer.highlight_color.clone(),
            weight: config.layer.highlight_weight,
        },
        legend: classifier.legend(&config.legend_caption),
        labels,
        labels_visible: false,
        bounds: extent.map(|r| Bounds {
            min_lon: r.min().x - buffer,
            min_lat: r.min().y - buffer,
            max_lon: r.max().x + buffer,
            max_lat: r.max().y + buffer,
        }),
    }
}

/// Fields shown when hovering a subdivision.
pub fn tooltip(record: &ForecastRecord, config: &DashboardConfig) -> Vec<TooltipField> {
    let mut fields = vec![
        TooltipField {
            alias: "Barangay:",
            value: record.subdivision.clone(),
        },
        TooltipField {
            alias: "Forecast Cases:",
            value: format_compact(record.forecast_cases, config.value_decimals),
        },
    ];
    if config.show_relative_risk {
        fields.push(TooltipField {
            alias: "Relative Risk Index:",
            value: record
                .relative_risk_index
                .map(|v| format_compact(v, 2))
                .unwrap_or_default(),
        });
    }
    fields.push(TooltipField {
        alias: "Risk Level:",
        value: record.display_risk(),
    });
    fields
}

fn union(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        (a.min().x.min(b.min().x), a.min().y.min(b.min().y)),
        (a.max().x.max(b.max().x), a.max().y.max(b.max().y)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{RiskClassifier, HIGH_COLOR};
    use crate::loader::test_data;
    use crate::selection::Selection;
    use approx::assert_relative_eq;

    fn subset_for<'a>(snapshot: &'a Snapshot, week: u32) -> Vec<&'a ForecastRecord> {
        let selection = Selection {
            year: 2025,
            week,
            model: Some("varmax".to_string()),
        };
        snapshot.records().iter().filter(|r| selection.matches(r)).collect()
    }

    #[test]
    fn skips_records_without_geometry() {
        let snapshot = test_data::snapshot();
        let subset = subset_for(&snapshot, 11);
        assert_eq!(subset.len(), 3);
        let classifier = RiskClassifier::Discrete;
        let layer = build_layer(&snapshot, &subset, &classifier.fit(&subset), &DashboardConfig::default());
        let names: Vec<_> = layer.features.iter().map(|f| f.subdivision.as_str()).collect();
        assert_eq!(names, ["Carmen", "Lapasan"]);
        assert_eq!(layer.labels.len(), 3);
        assert!(!layer.labels_visible);
    }

    #[test]
    fn styles_carry_fill_border_and_opacity() {
        let snapshot = test_data::snapshot();
        let subset = subset_for(&snapshot, 10);
        let config = DashboardConfig::default();
        let classifier = RiskClassifier::Discrete;
        let layer = build_layer(&snapshot, &subset, &classifier.fit(&subset), &config);
        let lapasan = layer.features.iter().find(|f| f.subdivision == "Lapasan").unwrap();
        assert_eq!(lapasan.style.fill_color, HIGH_COLOR);
        assert_eq!(lapasan.style.color, "#686A6A");
        assert_eq!(lapasan.style.weight, 1.0);
        assert_eq!(lapasan.style.fill_opacity, 1.0);
        assert!(matches!(lapasan.geometry.value, geojson::Value::MultiPolygon(_)));
        assert_eq!(layer.highlight.weight, 3.0);
    }

    #[test]
    fn bounds_cover_filtered_geometries_with_buffer() {
        let snapshot = test_data::snapshot();
        let subset = subset_for(&snapshot, 10);
        let classifier = RiskClassifier::Discrete;
        let layer = build_layer(&snapshot, &subset, &classifier.fit(&subset), &DashboardConfig::default());
        let bounds = layer.bounds.unwrap();
        assert_relative_eq!(bounds.min_lon, 124.55, epsilon = 1e-9);
        assert_relative_eq!(bounds.min_lat, 8.42, epsilon = 1e-9);
        assert_relative_eq!(bounds.max_lon, 124.72, epsilon = 1e-9);
        assert_relative_eq!(bounds.max_lat, 8.57, epsilon = 1e-9);

        let empty = build_layer(&snapshot, &[], &classifier.fit(&[]), &DashboardConfig::default());
        assert!(empty.features.is_empty());
        assert_eq!(empty.bounds, None);
    }

    #[test]
    fn gradient_legend_uses_subset_bounds() {
        let snapshot = test_data::snapshot();
        let subset = subset_for(&snapshot, 10);
        let classifier =
            RiskClassifier::gradient(&["#ffffcc".to_string(), "#bd0026".to_string()]).unwrap();
        let config = DashboardConfig {
            legend_caption: "Forecast Cases".to_string(),
            ..DashboardConfig::default()
        };
        let layer = build_layer(&snapshot, &subset, &classifier.fit(&subset), &config);
        match layer.legend {
            Legend::Gradient {
                caption, min, max, ..
            } => {
                assert_eq!(caption, "Forecast Cases");
                assert_eq!((min, max), (5.0, 90.0));
            }
            other => panic!("unexpected legend {other:?}"),
        }
    }

    #[test]
    fn tooltip_lists_fields_in_order() {
        let mut record = test_data::record("Carmen", 40.0, Some("Medium Risk"));
        record.relative_risk_index = Some(1.25);
        let fields = tooltip(&record, &DashboardConfig::default());
        let pairs: Vec<_> = fields.iter().map(|f| (f.alias, f.value.as_str())).collect();
        assert_eq!(
            pairs,
            [
                ("Barangay:", "Carmen"),
                ("Forecast Cases:", "40"),
                ("Relative Risk Index:", "1.25"),
                ("Risk Level:", "Medium"),
            ]
        );

        let config = DashboardConfig {
            show_relative_risk: false,
            ..DashboardConfig::default()
        };
        assert_eq!(tooltip(&record, &config).len(), 3);
    }
}

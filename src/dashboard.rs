// One recomputation pass per selection change.
//
// The snapshot is shared read-only; the selection state is owned by the
// dashboard and only changes inside `Dashboard::handle`, between passes.

use crate::classify::RiskClassifier;
use crate::config::DashboardConfig;
use crate::loader::Snapshot;
use crate::map_layer::{build_layer, MapLayer};
use crate::ranking::generate_ranking;
use crate::selection::{Selection, SelectionState};
use crate::summary::generate_summary;
use crate::types::{ForecastRecord, RankingRow, SummaryStats};
use crate::util::week_date_range;
use serde::Serialize;

/// A viewer's input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    Year(i32),
    Week(u32),
    Model(String),
}

/// Everything the rendering surface needs for one selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct View {
    pub selection: Selection,
    pub date_range: Option<String>,
    pub summary: SummaryStats,
    pub ranking: Vec<RankingRow>,
    pub map: MapLayer,
}

/// Run the full pipeline for one resolved selection.
pub fn compute_view(
    snapshot: &Snapshot,
    config: &DashboardConfig,
    classifier: &RiskClassifier,
    selection: &Selection,
) -> View {
    let subset: Vec<&ForecastRecord> = snapshot
        .records()
        .iter()
        .filter(|r| selection.matches(r))
        .collect();
    log::debug!(
        "Recomputing view for {:?}: {} records",
        selection,
        subset.len()
    );

    let fitted = classifier.fit(&subset);
    View {
        selection: selection.clone(),
        date_range: week_date_range(selection.year, selection.week),
        summary: generate_summary(&subset, config.reduction),
        ranking: generate_ranking(&subset, &fitted, config.value_decimals),
        map: build_layer(snapshot, &subset, &fitted, config),
    }
}

pub struct Dashboard<'a> {
    snapshot: &'a Snapshot,
    config: &'a DashboardConfig,
    classifier: RiskClassifier,
    state: SelectionState,
    view: View,
    passes: usize,
}

impl<'a> Dashboard<'a> {
    /// Start a session with the default selection and compute its view.
    pub fn new(
        snapshot: &'a Snapshot,
        config: &'a DashboardConfig,
        classifier: RiskClassifier,
    ) -> Self {
        let state = SelectionState::new(snapshot, config);
        let view = compute_view(snapshot, config, &classifier, state.selection());
        Dashboard {
            snapshot,
            config,
            classifier,
            state,
            view,
            passes: 1,
        }
    }

    /// Apply an input change and, if the resolved selection moved, run one
    /// recomputation pass. Returns whether a pass ran.
    pub fn handle(&mut self, event: SelectionEvent) -> bool {
        let changed = match event {
            SelectionEvent::Year(year) => self.state.set_year(self.snapshot, self.config, year),
            SelectionEvent::Week(week) => self.state.set_week(week),
            SelectionEvent::Model(model) => {
                self.state.set_model(self.snapshot, self.config, &model)
            }
        };
        if changed {
            self.view = compute_view(
                self.snapshot,
                self.config,
                &self.classifier,
                self.state.selection(),
            );
            self.passes += 1;
            log::debug!("Recomputation pass {}", self.passes());
        }
        changed
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn snapshot(&self) -> &Snapshot {
        self.snapshot
    }

    /// Number of recomputation passes run so far, including the initial one.
    pub fn passes(&self) -> usize {
        self.passes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::test_data;

    const EXAMPLE_BOUNDARIES: &str = "\
Barangay,Geometry
X,\"POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))\"
Y,\"POLYGON ((1 0, 2 0, 2 1, 1 1, 1 0))\"
Z,\"POLYGON ((2 0, 3 0, 3 1, 2 1, 2 0))\"
";

    const EXAMPLE_FORECASTS: &str = "\
Barangay,Date,Model,Forecast_Cases,Risk_Level,Relative_Risk_Index
X,2025-03-05,varmax,40,Medium,1.2
Y,2025-03-05,varmax,90,High,2.4
Z,2025-03-05,varmax,5,Low,0.3
X,2025-03-05,sarima,60,High,1.9
X,2025-03-12,varmax,10,Low,0.5
";

    #[test]
    fn end_to_end_example() {
        let snapshot = Snapshot::from_readers(
            EXAMPLE_BOUNDARIES.as_bytes(),
            EXAMPLE_FORECASTS.as_bytes(),
        )
        .unwrap();
        let config = DashboardConfig::default();
        let dashboard = Dashboard::new(&snapshot, &config, config.validate().unwrap());
        let view = dashboard.view();

        assert_eq!(
            view.selection,
            Selection {
                year: 2025,
                week: 10,
                model: Some("varmax".to_string()),
            }
        );
        assert_eq!(view.date_range.as_deref(), Some("Mar 03, 2025 - Mar 09, 2025"));
        assert_eq!(view.summary.cases, Some(135.0));
        assert_eq!(view.summary.highest_risk.as_deref(), Some("Y"));
        assert_eq!(view.summary.lowest_risk.as_deref(), Some("Z"));
        let order: Vec<_> = view.ranking.iter().map(|r| r.subdivision.as_str()).collect();
        assert_eq!(order, ["Y", "X", "Z"]);
        assert_eq!(view.map.features.len(), 3);
    }

    #[test]
    fn unchanged_input_runs_no_pass() {
        let snapshot = test_data::snapshot();
        let config = DashboardConfig::default();
        let mut dashboard = Dashboard::new(&snapshot, &config, RiskClassifier::Discrete);
        let before = dashboard.view().clone();

        assert!(!dashboard.handle(SelectionEvent::Year(2025)));
        assert!(!dashboard.handle(SelectionEvent::Week(10)));
        assert!(!dashboard.handle(SelectionEvent::Model("varmax".to_string())));
        assert_eq!(dashboard.passes(), 1);
        assert_eq!(dashboard.view(), &before);
    }

    #[test]
    fn each_change_runs_exactly_one_pass() {
        let snapshot = test_data::snapshot();
        let config = DashboardConfig::default();
        let mut dashboard = Dashboard::new(&snapshot, &config, RiskClassifier::Discrete);

        assert!(dashboard.handle(SelectionEvent::Week(11)));
        assert_eq!(dashboard.passes(), 2);
        assert_eq!(dashboard.view().ranking.len(), 3);
        assert_eq!(dashboard.view().map.features.len(), 2);
        assert_eq!(dashboard.view().summary.highest_risk.as_deref(), Some("Carmen"));

        assert!(dashboard.handle(SelectionEvent::Model("sarima".to_string())));
        assert_eq!(dashboard.passes(), 3);
        assert_eq!(dashboard.view().selection.week, 10);
        assert_eq!(dashboard.view().summary.cases, Some(100.0));
    }

    #[test]
    fn empty_subset_yields_empty_view() {
        let snapshot =
            Snapshot::from_readers(test_data::BOUNDARIES.as_bytes(), "".as_bytes()).unwrap();
        let config = DashboardConfig::default();
        let dashboard = Dashboard::new(&snapshot, &config, RiskClassifier::Discrete);
        let view = dashboard.view();
        assert!(view.summary.is_empty());
        assert!(view.ranking.is_empty());
        assert!(view.map.features.is_empty());
        assert_eq!(view.map.labels.len(), 3);
    }
}

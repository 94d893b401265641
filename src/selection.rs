// The active (year, week, model) filter.
//
// Selections are always resolved against the snapshot: a year or model with
// no data falls back to the configured default, and a week outside the
// available set is clamped to the policy boundary. Nothing here fails.

use crate::config::{DashboardConfig, WeekPolicy};
use crate::loader::Snapshot;
use crate::types::ForecastRecord;
use chrono::{Datelike, Local};
use serde::Serialize;
use std::collections::BTreeSet;

/// A resolved filter triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub year: i32,
    pub week: u32,
    pub model: Option<String>,
}

impl Selection {
    pub fn matches(&self, record: &ForecastRecord) -> bool {
        record.year == self.year
            && record.week == self.week
            && match &self.model {
                Some(m) => record.model.as_deref() == Some(m.as_str()),
                None => true,
            }
    }
}

#[derive(Debug, Clone)]
pub struct SelectionState {
    selection: Selection,
    available_weeks: BTreeSet<u32>,
    model_dimension: bool,
    week_policy: WeekPolicy,
}

impl SelectionState {
    /// Default selection for a new session.
    pub fn new(snapshot: &Snapshot, config: &DashboardConfig) -> Self {
        let model_dimension = config.model_dimension && snapshot.has_models();
        let year = default_year(snapshot, config);
        let model = model_dimension
            .then(|| default_model(snapshot, config, year))
            .flatten();
        let available_weeks = snapshot.weeks(year, model.as_deref());
        let week = boundary_week(&available_weeks, config.week_policy).unwrap_or(1);
        log::debug!(
            "Default selection: year {}, week {}, model {:?}",
            year,
            week,
            model
        );
        SelectionState {
            selection: Selection { year, week, model },
            available_weeks,
            model_dimension,
            week_policy: config.week_policy,
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn available_weeks(&self) -> &BTreeSet<u32> {
        &self.available_weeks
    }

    pub fn model_dimension(&self) -> bool {
        self.model_dimension
    }

    /// Select a year. Unknown years resolve to the default year. Returns
    /// whether the resolved triple changed.
    pub fn set_year(&mut self, snapshot: &Snapshot, config: &DashboardConfig, year: i32) -> bool {
        let before = self.selection.clone();
        let year = if snapshot.years().contains(&year) {
            year
        } else {
            let fallback = default_year(snapshot, config);
            log::warn!("No data for year {}; using {}", year, fallback);
            fallback
        };
        self.selection.year = year;
        if self.model_dimension {
            let models = snapshot.models(Some(year));
            let current = self.selection.model.as_deref();
            if !current.map_or(false, |m| models.contains(&m)) {
                self.selection.model = default_model(snapshot, config, year);
            }
        }
        self.refresh_weeks(snapshot);
        self.selection != before
    }

    /// Select a model. Ignored when the model dimension is off; a model with
    /// no data for the current year resolves to the default model.
    pub fn set_model(&mut self, snapshot: &Snapshot, config: &DashboardConfig, model: &str) -> bool {
        if !self.model_dimension {
            return false;
        }
        let before = self.selection.clone();
        let year = self.selection.year;
        let model = if snapshot.models(Some(year)).contains(&model) {
            Some(model.to_string())
        } else {
            let fallback = default_model(snapshot, config, year);
            log::warn!("No data for model {:?} in {}; using {:?}", model, year, fallback);
            fallback
        };
        self.selection.model = model;
        self.refresh_weeks(snapshot);
        self.selection != before
    }

    /// Select a week, clamping to the policy boundary when it is not available.
    pub fn set_week(&mut self, week: u32) -> bool {
        let before = self.selection.week;
        self.selection.week = if self.available_weeks.contains(&week) {
            week
        } else {
            match boundary_week(&self.available_weeks, self.week_policy) {
                Some(clamped) => {
                    log::debug!("Week {} unavailable; clamped to {}", week, clamped);
                    clamped
                }
                None => week,
            }
        };
        self.selection.week != before
    }

    fn refresh_weeks(&mut self, snapshot: &Snapshot) {
        self.available_weeks =
            snapshot.weeks(self.selection.year, self.selection.model.as_deref());
        if !self.available_weeks.contains(&self.selection.week) {
            if let Some(clamped) = boundary_week(&self.available_weeks, self.week_policy) {
                log::debug!(
                    "Week {} not available for the new selection; clamped to {}",
                    self.selection.week,
                    clamped
                );
                self.selection.week = clamped;
            }
        }
    }
}

/// Preferred year when present in the data, else the latest year.
fn default_year(snapshot: &Snapshot, config: &DashboardConfig) -> i32 {
    let years = snapshot.years();
    match config.preferred_year {
        Some(y) if years.contains(&y) => y,
        _ => years
            .last()
            .copied()
            .or(config.preferred_year)
            .unwrap_or_else(|| Local::now().year()),
    }
}

/// Preferred model when it has data for `year`, else the first model seen.
fn default_model(snapshot: &Snapshot, config: &DashboardConfig, year: i32) -> Option<String> {
    let models = snapshot.models(Some(year));
    let preferred = config
        .preferred_model
        .as_deref()
        .filter(|p| models.contains(p));
    preferred.or(models.first().copied()).map(str::to_string)
}

fn boundary_week(weeks: &BTreeSet<u32>, policy: WeekPolicy) -> Option<u32> {
    match policy {
        WeekPolicy::Earliest => weeks.first().copied(),
        WeekPolicy::Latest => weeks.last().copied(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::test_data;

    fn weeks(state: &SelectionState) -> Vec<u32> {
        state.available_weeks().iter().copied().collect()
    }

    #[test]
    fn defaults_prefer_configured_year_and_first_model() {
        let snapshot = test_data::snapshot();
        let state = SelectionState::new(&snapshot, &DashboardConfig::default());
        assert_eq!(
            state.selection(),
            &Selection {
                year: 2025,
                week: 10,
                model: Some("varmax".to_string()),
            }
        );
        assert_eq!(weeks(&state), [10, 11]);
    }

    #[test]
    fn defaults_fall_back_to_latest_year_and_honor_policy() {
        let snapshot = test_data::snapshot();
        let config = DashboardConfig {
            preferred_year: Some(2019),
            preferred_model: Some("sarima".to_string()),
            week_policy: WeekPolicy::Latest,
            ..DashboardConfig::default()
        };
        let state = SelectionState::new(&snapshot, &config);
        assert_eq!(state.selection().year, 2025);
        assert_eq!(state.selection().model.as_deref(), Some("sarima"));
        assert_eq!(state.selection().week, 10);

        let config = DashboardConfig {
            week_policy: WeekPolicy::Latest,
            ..DashboardConfig::default()
        };
        let state = SelectionState::new(&snapshot, &config);
        assert_eq!(state.selection().week, 11);
    }

    #[test]
    fn model_dimension_can_be_disabled() {
        let snapshot = test_data::snapshot();
        let config = DashboardConfig {
            model_dimension: false,
            ..DashboardConfig::default()
        };
        let mut state = SelectionState::new(&snapshot, &config);
        assert!(!state.model_dimension());
        assert_eq!(state.selection().model, None);
        assert!(!state.set_model(&snapshot, &config, "sarima"));
        assert_eq!(state.selection().model, None);
    }

    #[test]
    fn changing_year_recomputes_weeks_and_clamps() {
        let snapshot = test_data::snapshot();
        let config = DashboardConfig::default();
        let mut state = SelectionState::new(&snapshot, &config);
        assert!(state.set_week(11));

        assert!(state.set_year(&snapshot, &config, 2024));
        assert_eq!(weeks(&state), [2, 3]);
        assert_eq!(state.selection().week, 2);
        assert_eq!(state.selection().model.as_deref(), Some("varmax"));
    }

    #[test]
    fn changing_model_clamps_week_to_latest_under_latest_policy() {
        let snapshot = test_data::snapshot();
        let config = DashboardConfig {
            week_policy: WeekPolicy::Latest,
            ..DashboardConfig::default()
        };
        let mut state = SelectionState::new(&snapshot, &config);
        assert_eq!(state.selection().week, 11);
        assert!(state.set_model(&snapshot, &config, "sarima"));
        assert_eq!(weeks(&state), [10]);
        assert_eq!(state.selection().week, 10);
    }

    #[test]
    fn unknown_year_and_model_fall_back() {
        let snapshot = test_data::snapshot();
        let config = DashboardConfig::default();
        let mut state = SelectionState::new(&snapshot, &config);
        assert!(state.set_year(&snapshot, &config, 2024));
        assert!(state.set_year(&snapshot, &config, 1999));
        assert_eq!(state.selection().year, 2025);

        assert!(!state.set_model(&snapshot, &config, "prophet"));
        assert_eq!(state.selection().model.as_deref(), Some("varmax"));
    }

    #[test]
    fn week_clamping_is_deterministic() {
        let snapshot = test_data::snapshot();
        for (policy, expected) in [(WeekPolicy::Earliest, 10), (WeekPolicy::Latest, 11)] {
            let config = DashboardConfig {
                week_policy: policy,
                ..DashboardConfig::default()
            };
            for _ in 0..3 {
                let mut state = SelectionState::new(&snapshot, &config);
                state.set_week(40);
                assert_eq!(state.selection().week, expected);
                state.set_week(1);
                assert_eq!(state.selection().week, expected);
            }
        }
    }

    #[test]
    fn reapplying_the_same_selection_changes_nothing() {
        let snapshot = test_data::snapshot();
        let config = DashboardConfig::default();
        let mut state = SelectionState::new(&snapshot, &config);
        let before = state.selection().clone();
        let weeks_before = weeks(&state);

        assert!(!state.set_year(&snapshot, &config, before.year));
        assert!(!state.set_model(&snapshot, &config, "varmax"));
        assert!(!state.set_week(before.week));
        assert_eq!(state.selection(), &before);
        assert_eq!(weeks(&state), weeks_before);
    }

    #[test]
    fn selection_filters_by_model_only_when_set() {
        let snapshot = test_data::snapshot();
        let with_model = Selection {
            year: 2025,
            week: 10,
            model: Some("sarima".to_string()),
        };
        let without = Selection {
            model: None,
            ..with_model.clone()
        };
        let count = |s: &Selection| snapshot.records().iter().filter(|r| s.matches(r)).count();
        assert_eq!(count(&with_model), 3);
        assert_eq!(count(&without), 6);
    }

    #[test]
    fn empty_dataset_still_yields_a_selection() {
        let snapshot =
            Snapshot::from_readers(test_data::BOUNDARIES.as_bytes(), "".as_bytes()).unwrap();
        let state = SelectionState::new(&snapshot, &DashboardConfig::default());
        assert_eq!(state.selection().year, 2025);
        assert_eq!(state.selection().week, 1);
        assert_eq!(state.selection().model, None);
        assert!(state.available_weeks().is_empty());
    }
}

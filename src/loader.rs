use crate::classify::normalize_risk_label;
use crate::error::DataLoadError;
use crate::types::{ForecastRecord, RawBoundaryRow, RawForecastRow, Subdivision};
use crate::util::{coerce_cases, parse_date_safe, parse_f64_safe, year_and_week};
use csv::ReaderBuilder;
use geo::{BoundingRect, Centroid, Geometry, MultiPolygon};
use once_cell::sync::OnceCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use wkt::Wkt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub subdivisions: usize,
    pub forecasts: usize,
    /// Forecast rows whose subdivision key has no boundary.
    pub unmatched: usize,
    /// Forecast rows whose case count was not a usable number.
    pub coerced_cases: usize,
}

/// Boundaries joined with forecasts. Built once; never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    subdivisions: Vec<Subdivision>,
    by_name: HashMap<String, usize>,
    records: Vec<ForecastRecord>,
    report: LoadReport,
}

/// Read-once access to the input tables.
///
/// The first call to [`DataStore::snapshot`] reads and parses both files;
/// every later call hands back the same snapshot.
pub struct DataStore {
    boundaries: PathBuf,
    forecasts: PathBuf,
    snapshot: OnceCell<Snapshot>,
}

impl DataStore {
    pub fn new(boundaries: impl Into<PathBuf>, forecasts: impl Into<PathBuf>) -> Self {
        DataStore {
            boundaries: boundaries.into(),
            forecasts: forecasts.into(),
            snapshot: OnceCell::new(),
        }
    }

    pub fn snapshot(&self) -> Result<&Snapshot, DataLoadError> {
        self.snapshot.get_or_try_init(|| {
            let boundaries = open(&self.boundaries)?;
            let forecasts = open(&self.forecasts)?;
            let subdivisions = read_boundaries(&self.boundaries, boundaries)?;
            let (records, coerced) = read_forecasts(&self.forecasts, forecasts)?;
            Ok(Snapshot::merge(subdivisions, records, coerced))
        })
    }
}

fn open(path: &Path) -> Result<File, DataLoadError> {
    if !path.exists() {
        return Err(DataLoadError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    File::open(path).map_err(|source| DataLoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl Snapshot {
    /// Build a snapshot from in-memory CSV sources.
    pub fn from_readers<B: Read, F: Read>(
        boundaries: B,
        forecasts: F,
    ) -> Result<Self, DataLoadError> {
        let subdivisions = read_boundaries(Path::new("<boundaries>"), boundaries)?;
        let (records, coerced) = read_forecasts(Path::new("<forecasts>"), forecasts)?;
        Ok(Snapshot::merge(subdivisions, records, coerced))
    }

    /// Left join of forecasts onto boundaries by subdivision name. Every
    /// forecast row survives; unknown names keep no geometry.
    fn merge(
        raw_subdivisions: Vec<Subdivision>,
        mut records: Vec<ForecastRecord>,
        coerced_cases: usize,
    ) -> Self {
        let mut subdivisions = Vec::with_capacity(raw_subdivisions.len());
        let mut by_name = HashMap::new();
        for sub in raw_subdivisions {
            if by_name.contains_key(&sub.name) {
                log::warn!("Duplicate boundary for {:?}; keeping the first", sub.name);
                continue;
            }
            by_name.insert(sub.name.clone(), subdivisions.len());
            subdivisions.push(sub);
        }

        for r in &mut records {
            r.geometry = by_name.get(&r.subdivision).copied();
        }
        let unmatched_names: BTreeSet<&str> = records
            .iter()
            .filter(|r| r.geometry.is_none())
            .map(|r| r.subdivision.as_str())
            .collect();
        let unmatched = records.iter().filter(|r| r.geometry.is_none()).count();
        if !unmatched_names.is_empty() {
            log::warn!(
                "{} forecast rows reference unknown subdivisions: {:?}",
                unmatched,
                unmatched_names
            );
        }

        let report = LoadReport {
            subdivisions: subdivisions.len(),
            forecasts: records.len(),
            unmatched,
            coerced_cases,
        };

        Snapshot {
            subdivisions,
            by_name,
            records,
            report,
        }
    }

    pub fn subdivisions(&self) -> &[Subdivision] {
        &self.subdivisions
    }

    pub fn geometry_of(&self, record: &ForecastRecord) -> Option<&Subdivision> {
        record.geometry.and_then(|i| self.subdivisions.get(i))
    }

    pub fn records(&self) -> &[ForecastRecord] {
        &self.records
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn has_models(&self) -> bool {
        self.records.iter().any(|r| r.model.is_some())
    }

    /// Distinct years, ascending.
    pub fn years(&self) -> BTreeSet<i32> {
        self.records.iter().map(|r| r.year).collect()
    }

    /// Distinct models in order of first appearance, optionally for one year.
    pub fn models(&self, year: Option<i32>) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .filter(|r| year.map_or(true, |y| r.year == y))
            .filter_map(|r| r.model.as_deref())
            .filter(|m| seen.insert(*m))
            .collect()
    }

    /// Distinct ISO weeks recorded for a year and, when given, a model.
    pub fn weeks(&self, year: i32, model: Option<&str>) -> BTreeSet<u32> {
        self.records
            .iter()
            .filter(|r| r.year == year)
            .filter(|r| model.map_or(true, |m| r.model.as_deref() == Some(m)))
            .map(|r| r.week)
            .collect()
    }
}

fn csv_error(path: &Path) -> impl Fn(csv::Error) -> DataLoadError + '_ {
    move |source| DataLoadError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

fn read_boundaries<R: Read>(path: &Path, reader: R) -> Result<Vec<Subdivision>, DataLoadError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut out = Vec::new();
    for result in rdr.deserialize::<RawBoundaryRow>() {
        let row = result.map_err(csv_error(path))?;
        let name = row.barangay.unwrap_or_default().trim().to_string();
        if name.is_empty() {
            log::warn!("Skipping boundary row without a subdivision name");
            continue;
        }
        let boundary = parse_boundary(row.geometry.as_deref().unwrap_or("")).map_err(|reason| {
            DataLoadError::Geometry {
                subdivision: name.clone(),
                reason,
            }
        })?;
        out.push(Subdivision {
            centroid: boundary.centroid(),
            extent: boundary.bounding_rect(),
            name,
            boundary,
        });
    }
    log::info!("Loaded {} subdivision boundaries from {}", out.len(), path.display());
    Ok(out)
}

/// Parse a WKT `POLYGON` or `MULTIPOLYGON` in longitude/latitude order.
pub fn parse_boundary(text: &str) -> Result<MultiPolygon<f64>, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("empty geometry".to_string());
    }
    let parsed = text.parse::<Wkt<f64>>().map_err(|e| e.to_string())?;
    let geometry = Geometry::<f64>::try_from(parsed).map_err(|e| e.to_string())?;
    match geometry {
        Geometry::Polygon(p) => Ok(MultiPolygon(vec![p])),
        Geometry::MultiPolygon(mp) => Ok(mp),
        _ => Err("expected POLYGON or MULTIPOLYGON".to_string()),
    }
}

fn read_forecasts<R: Read>(
    path: &Path,
    reader: R,
) -> Result<(Vec<ForecastRecord>, usize), DataLoadError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut out = Vec::new();
    let mut coerced = 0usize;
    let mut unknown_labels: BTreeSet<String> = BTreeSet::new();

    for (idx, result) in rdr.deserialize::<RawForecastRow>().enumerate() {
        let row = result.map_err(csv_error(path))?;
        let date = parse_date_safe(row.date.as_deref()).ok_or_else(|| DataLoadError::Date {
            row: idx + 1,
            value: row.date.clone().unwrap_or_default(),
        })?;
        let (year, week) = year_and_week(date);

        let (forecast_cases, was_coerced) = coerce_cases(row.forecast_cases.as_deref());
        if was_coerced {
            coerced += 1;
        }

        let risk_label = row
            .risk_level
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let risk_level = risk_label.as_deref().and_then(normalize_risk_label);
        if let (None, Some(label)) = (risk_level, &risk_label) {
            unknown_labels.insert(label.clone());
        }

        let model = row
            .model
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        out.push(ForecastRecord {
            subdivision: row.barangay.unwrap_or_default().trim().to_string(),
            geometry: None,
            date,
            year,
            week,
            model,
            forecast_cases,
            risk_label,
            risk_level,
            relative_risk_index: parse_f64_safe(row.relative_risk_index.as_deref()),
        });
    }

    if coerced > 0 {
        log::warn!("Coerced {} non-numeric forecast case values to 0", coerced);
    }
    if !unknown_labels.is_empty() {
        log::warn!("Unrecognized risk labels: {:?}", unknown_labels);
    }
    log::info!("Loaded {} forecast rows from {}", out.len(), path.display());
    Ok((out, coerced))
}

#[cfg(test)]
pub(crate) mod test_data {
    use super::Snapshot;
    use crate::classify::normalize_risk_label;
    use crate::types::ForecastRecord;
    use chrono::NaiveDate;

    pub const BOUNDARIES: &str = "\
Barangay,Geometry
Carmen,\"POLYGON ((124.60 8.47, 124.62 8.47, 124.62 8.49, 124.60 8.49, 124.60 8.47))\"
Lapasan,\"POLYGON ((124.65 8.47, 124.67 8.47, 124.67 8.49, 124.65 8.49, 124.65 8.47))\"
Kauswagan,\"MULTIPOLYGON (((124.62 8.50, 124.64 8.50, 124.64 8.52, 124.62 8.52, 124.62 8.50)))\"
";

    // Nazareth has no boundary. Week 10 of 2025 is the 2025-03-05 block.
    pub const FORECASTS: &str = "\
Barangay,Date,Model,Forecast_Cases,Risk_Level,Relative_Risk_Index
Carmen,2025-03-05,varmax,40,Medium Risk,1.25
Lapasan,2025-03-05,varmax,90,High Risk,2.5
Kauswagan,2025-03-05,varmax,5,Low Risk,0.4
Carmen,2025-03-05,sarima,30,Medium,1.1
Lapasan,2025-03-05,sarima,70,High,2
Kauswagan,2025-03-05,sarima,NA,Low,
Carmen,2025-03-12,varmax,120,High,3
Lapasan,2025-03-12,varmax,0,Low,0.1
Nazareth,2025-03-12,varmax,15,Medium,1
Carmen,2024-01-10,varmax,10,Low,0.5
Lapasan,2024-01-17,varmax,12,Medium,0.9
Carmen,2024-01-24,sarima,8,Low,0.3
";

    pub fn snapshot() -> Snapshot {
        Snapshot::from_readers(BOUNDARIES.as_bytes(), FORECASTS.as_bytes()).unwrap()
    }

    /// A week-10 varmax record with no geometry.
    pub fn record(name: &str, cases: f64, label: Option<&str>) -> ForecastRecord {
        ForecastRecord {
            subdivision: name.to_string(),
            geometry: None,
            date: NaiveDate::from_ymd_opt(2025, 3, 5).unwrap(),
            year: 2025,
            week: 10,
            model: Some("varmax".to_string()),
            forecast_cases: cases,
            risk_label: label.map(str::to_string),
            risk_level: label.and_then(normalize_risk_label),
            relative_risk_index: None,
        }
    }
}

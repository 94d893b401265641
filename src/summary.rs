use crate::types::{ForecastRecord, Reduction, SummaryStats};
use crate::util::average;

/// What "riskier" means for a subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskBasis {
    /// Rank by tier (Low=1, Medium=2, High=3).
    Categorical,
    /// Rank by forecast cases.
    Numeric,
}

impl RiskBasis {
    /// Categorical as soon as one record carries a recognized tier.
    pub fn of(subset: &[&ForecastRecord]) -> Self {
        if subset.iter().any(|r| r.risk_level.is_some()) {
            RiskBasis::Categorical
        } else {
            RiskBasis::Numeric
        }
    }

    /// Score used for highest/lowest. `None` excludes the record.
    fn score(&self, record: &ForecastRecord) -> Option<f64> {
        match self {
            RiskBasis::Categorical => record.risk_level.map(|l| l.rank() as f64),
            RiskBasis::Numeric => Some(record.forecast_cases),
        }
    }
}

pub fn generate_summary(subset: &[&ForecastRecord], reduction: Reduction) -> SummaryStats {
    if subset.is_empty() {
        return SummaryStats::empty(reduction);
    }
    let cases: Vec<f64> = subset.iter().map(|r| r.forecast_cases).collect();
    let cases = match reduction {
        Reduction::Total => Some(cases.iter().sum::<f64>()),
        Reduction::Average => average(&cases),
    };
    let basis = RiskBasis::of(subset);
    SummaryStats {
        reduction,
        cases,
        highest_risk: extreme(subset, basis, |candidate, best| candidate > best),
        lowest_risk: extreme(subset, basis, |candidate, best| candidate < best),
    }
}

/// First record whose score beats every earlier one, so ties go to the
/// earliest occurrence.
fn extreme(
    subset: &[&ForecastRecord],
    basis: RiskBasis,
    beats: impl Fn(f64, f64) -> bool,
) -> Option<String> {
    let mut best: Option<(f64, &ForecastRecord)> = None;
    for record in subset {
        let Some(score) = basis.score(record) else {
            continue;
        };
        match best {
            Some((best_score, _)) if !beats(score, best_score) => {}
            _ => best = Some((score, *record)),
        }
    }
    best.map(|(_, r)| r.subdivision.clone())
}

use crate::classify::FittedClassifier;
use crate::summary::RiskBasis;
use crate::types::{ForecastRecord, RankingRow};
use crate::util::format_compact;
use std::cmp::Ordering;

/// Decimals shown for the relative risk index.
const INDEX_DECIMALS: usize = 2;

/// One row per record of the filtered subset, riskiest first.
///
/// With a categorical basis rows sort by tier, then forecast cases, both
/// descending; records without a tier sort below Low. Otherwise rows sort by
/// forecast cases alone. The sort is stable.
pub fn generate_ranking(
    subset: &[&ForecastRecord],
    classifier: &FittedClassifier<'_>,
    decimals: usize,
) -> Vec<RankingRow> {
    let basis = RiskBasis::of(subset);
    let mut ordered: Vec<&ForecastRecord> = subset.to_vec();
    ordered.sort_by(|a, b| {
        let by_tier = match basis {
            RiskBasis::Categorical => tier(b).cmp(&tier(a)),
            RiskBasis::Numeric => Ordering::Equal,
        };
        by_tier.then_with(|| b.forecast_cases.total_cmp(&a.forecast_cases))
    });

    ordered
        .into_iter()
        .map(|r| {
            let swatch = classifier.swatch(r);
            RankingRow {
                subdivision: r.subdivision.clone(),
                forecast_cases: format_compact(r.forecast_cases, decimals),
                relative_risk_index: r
                    .relative_risk_index
                    .map(|v| format_compact(v, INDEX_DECIMALS))
                    .unwrap_or_default(),
                risk_level: r.display_risk(),
                background: swatch.fill,
                text_color: swatch.text,
            }
        })
        .collect()
}

fn tier(record: &ForecastRecord) -> u8 {
    record.risk_level.map_or(0, |l| l.rank())
}

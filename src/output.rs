use crate::dashboard::View;
use crate::types::SummaryStats;
use crate::util::format_compact;
use serde::Serialize;
use std::error::Error;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Box<dyn Error>> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Write `ranking.csv` and `view.json` for the current view into `dir`.
pub fn export_view(dir: &Path, view: &View) -> Result<(), Box<dyn Error>> {
    std::fs::create_dir_all(dir)?;
    write_csv(&dir.join("ranking.csv"), &view.ranking)?;
    write_json(&dir.join("view.json"), view)?;
    log::info!("Exported view to {}", dir.display());
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
    if rows.len() > max_rows {
        println!("({} more rows)\n", rows.len() - max_rows);
    }
}

pub fn print_summary(summary: &SummaryStats, decimals: usize) {
    if summary.is_empty() {
        println!("No forecasts for this selection.\n");
        return;
    }
    let cases = summary
        .cases
        .map_or_else(|| "N/A".to_string(), |v| format_compact(v, decimals));
    println!("{}: {}", summary.reduction.title(), cases);
    println!(
        "Highest Risk Barangay: {}",
        summary.highest_risk.as_deref().unwrap_or("N/A")
    );
    println!(
        "Lowest Risk Barangay: {}\n",
        summary.lowest_risk.as_deref().unwrap_or("N/A")
    );
}

pub fn print_view(view: &View, decimals: usize, max_rows: usize) {
    let s = &view.selection;
    print!("Dengue Risk Distribution, {} week {}", s.year, s.week);
    if let Some(model) = &s.model {
        print!(" [{}]", model);
    }
    match &view.date_range {
        Some(range) => println!(" ({})\n", range),
        None => println!("\n"),
    }
    println!("Summary Metrics");
    print_summary(&view.summary, decimals);
    println!("Risk Ranking by Barangay");
    preview_table_rows(&view.ranking, max_rows);
}

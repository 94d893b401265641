// Entry point and interactive session.
//
// Startup loads both input tables once (fatal on failure), then a console
// menu turns each selection input into a `SelectionEvent` for the dashboard,
// which recomputes the view before the next input is read.
mod classify;
mod config;
mod dashboard;
mod error;
mod loader;
mod map_layer;
mod output;
mod ranking;
mod selection;
mod summary;
mod types;
mod util;

use clap::Parser;
use config::DashboardConfig;
use dashboard::{Dashboard, SelectionEvent};
use loader::DataStore;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

const PREVIEW_ROWS: usize = 10;

#[derive(Parser)]
#[command(name = "denvue", version, about = "Dengue forecast risk dashboard")]
struct Args {
    /// Subdivision boundaries (Barangay, Geometry as WKT)
    #[arg(long, default_value = "cdo_barangays.csv")]
    boundaries: PathBuf,

    /// Forecast table
    #[arg(long, default_value = "all_models_forecasts.csv")]
    forecasts: PathBuf,

    /// Dashboard configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for exported views
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

fn prompt(label: &str) -> Option<String> {
    print!("{}", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

fn join<T: ToString>(items: impl IntoIterator<Item = T>) -> String {
    items
        .into_iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Ask for one selection change. `None` means the input was not usable.
fn read_event(dashboard: &Dashboard<'_>, choice: &str) -> Option<SelectionEvent> {
    let snapshot = dashboard.snapshot();
    let selection = dashboard.state().selection();
    match choice {
        "1" => {
            println!("Available years: {}", join(snapshot.years()));
            let year = prompt("Year: ")?.parse().ok()?;
            Some(SelectionEvent::Year(year))
        }
        "2" => {
            println!(
                "Available weeks: {}",
                join(dashboard.state().available_weeks())
            );
            let week = prompt("Week: ")?.parse().ok()?;
            Some(SelectionEvent::Week(week))
        }
        "3" if dashboard.state().model_dimension() => {
            println!(
                "Available models: {}",
                join(snapshot.models(Some(selection.year)))
            );
            let model = prompt("Model: ")?;
            (!model.is_empty()).then_some(SelectionEvent::Model(model))
        }
        _ => None,
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => DashboardConfig::load(path)?,
        None => DashboardConfig::default(),
    };
    let classifier = config.validate()?;

    let store = DataStore::new(&args.boundaries, &args.forecasts);
    let snapshot = store.snapshot()?;
    let report = snapshot.report();
    println!(
        "Processing dataset... ({} barangays, {} forecast rows loaded)",
        util::format_int(report.subdivisions),
        util::format_int(report.forecasts)
    );
    if report.unmatched > 0 {
        println!(
            "Note: {} forecast rows have no matching boundary.",
            util::format_int(report.unmatched)
        );
    }
    if report.coerced_cases > 0 {
        println!(
            "Note: {} non-numeric forecast values treated as 0.",
            util::format_int(report.coerced_cases)
        );
    }
    println!();

    let mut dashboard = Dashboard::new(snapshot, &config, classifier);
    output::print_view(dashboard.view(), config.value_decimals, PREVIEW_ROWS);

    loop {
        println!("[1] Select Year");
        println!("[2] Select Week");
        if dashboard.state().model_dimension() {
            println!("[3] Select Model");
        }
        println!("[4] Export View");
        println!("[5] Exit\n");
        let Some(choice) = prompt("Enter choice: ") else {
            break;
        };
        match choice.as_str() {
            "4" => {
                if let Err(e) = output::export_view(&args.out_dir, dashboard.view()) {
                    eprintln!("Write error: {}", e);
                } else {
                    println!("(View exported to {})\n", args.out_dir.display());
                }
            }
            "5" => break,
            "1" | "2" | "3" => match read_event(&dashboard, &choice) {
                Some(event) => {
                    println!();
                    if dashboard.handle(event) {
                        output::print_view(dashboard.view(), config.value_decimals, PREVIEW_ROWS);
                    } else {
                        println!("Selection unchanged.\n");
                    }
                }
                None => println!("Invalid input.\n"),
            },
            _ => println!("Invalid choice.\n"),
        }
    }
    println!("Exiting the program.");
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

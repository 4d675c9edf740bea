//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use hostwatch_lib::anomaly::ScoreBand;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(&items) {
                println!("{}", json);
            }
        }
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a percentage with one decimal
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Color a utilization percentage: red above 80, yellow above 50
pub fn color_percent(value: f64) -> String {
    let formatted = format_percent(value);
    if value > 80.0 {
        formatted.red().to_string()
    } else if value > 50.0 {
        formatted.yellow().to_string()
    } else {
        formatted.green().to_string()
    }
}

/// Color the engine state
pub fn color_state(learning: bool) -> String {
    if learning {
        "learning".blue().to_string()
    } else {
        "active".green().to_string()
    }
}

/// Color an outlier score band
pub fn color_band(band: ScoreBand) -> String {
    let label = band.label();
    match band {
        ScoreBand::Normal => label.green().to_string(),
        ScoreBand::SlightlyUnusual => label.cyan().to_string(),
        ScoreBand::Unusual => label.yellow().to_string(),
        ScoreBand::VeryUnusual => label.magenta().to_string(),
        ScoreBand::ExtremelyAbnormal => label.red().to_string(),
    }
}

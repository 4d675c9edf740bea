//! Engine status and known application commands

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use crate::client::{ApiClient, StatusResponse, TrendView};
use crate::output::{
    color_band, color_percent, color_state, format_percent, print_info, print_table,
    OutputFormat,
};

/// Row for the known applications table
#[derive(Tabled, Serialize)]
struct AppRow {
    #[tabled(rename = "Application")]
    app: String,
    #[tabled(rename = "CPU Impact")]
    cpu_impact: String,
    #[tabled(rename = "RAM Impact")]
    ram_impact: String,
    #[tabled(rename = "First Seen")]
    first_seen: String,
}

/// Show the engine status reported by the agent
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status = client.status().await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        OutputFormat::Table => print_status(&status),
    }

    Ok(())
}

fn print_status(status: &StatusResponse) {
    println!("{}", "Host Monitor Status".bold());
    println!("{}", "=".repeat(60));
    println!("State:        {}", color_state(status.learning));

    if status.learning {
        println!(
            "Learning:     {}/{} samples",
            status.learning_collected, status.learning_required
        );
    }

    if let Some(sample) = &status.last_sample {
        println!(
            "Last sample:  {} CPU {} RAM {}",
            sample.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().cyan(),
            color_percent(sample.cpu_percent),
            color_percent(sample.ram_percent)
        );
    }

    if let Some(baseline) = &status.baseline {
        println!();
        println!("{}", "Baseline".bold());
        println!(
            "  CPU:        {} ± {:.1}",
            format_percent(baseline.mean_cpu),
            baseline.std_cpu
        );
        println!(
            "  RAM:        {} ± {:.1}",
            format_percent(baseline.mean_ram),
            baseline.std_ram
        );
        println!("  Threshold:  {:.4}", baseline.anomaly_threshold);
    }

    println!();
    match &status.trend {
        TrendView::InsufficientData => print_info("Not enough data to compute a trend"),
        TrendView::Window { cpu, ram, window } => {
            println!("{} (over {}s)", "Trend".bold(), window);
            println!("  CPU:        {} {:.1}%", cpu.arrow(), cpu.magnitude);
            println!("  RAM:        {} {:.1}%", ram.arrow(), ram.magnitude);
        }
    }

    if let Some(last) = status.recent_scores.last() {
        println!();
        println!(
            "Last score:   {:.4} ({})",
            last.score,
            color_band(last.band)
        );
        println!("Scores kept:  {}", status.recent_scores.len());
    }

    println!("Known apps:   {}", status.known_apps.len());
    println!("History:      {} samples", status.history_len);
}

/// List applications whose launch impact the agent has learned
pub async fn show_known_apps(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let apps = client.known_apps().await?;

    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&apps)?);
        return Ok(());
    }

    let rows: Vec<AppRow> = apps
        .into_iter()
        .map(|(app, known)| AppRow {
            app,
            cpu_impact: format!("{:+.1}", known.cpu_impact),
            ram_impact: format!("{:+.1}", known.ram_impact),
            first_seen: known.first_seen.format("%Y-%m-%d %H:%M:%S").to_string(),
        })
        .collect();

    print_table(&rows, format);
    Ok(())
}

//! Telemetry collection and summary commands

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use colored::Colorize;
use hostwatch_lib::collector::{
    read_records, Sampler, SysinfoSampler, TelemetryStore, TelemetrySummary, TIMESTAMP_FORMAT,
};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{
    color_percent, print_info, print_success, print_table, print_warning, OutputFormat,
};

/// Below this many rows a model trained on the file is likely to be inaccurate
const RECOMMENDED_SAMPLES: usize = 50;

/// Row for the statistics table
#[derive(Tabled, Serialize)]
struct StatRow {
    #[tabled(rename = "Statistic")]
    statistic: &'static str,
    #[tabled(rename = "CPU (%)")]
    cpu: String,
    #[tabled(rename = "RAM (%)")]
    ram: String,
}

/// Sample the host into the telemetry file until Ctrl-C or the duration elapses
pub async fn collect(path: &Path, interval: Duration, duration: Option<Duration>) -> Result<()> {
    let mut store = TelemetryStore::open(path)
        .with_context(|| format!("Failed to open telemetry file {}", path.display()))?;
    let mut sampler = SysinfoSampler::new();

    print_info(&format!(
        "Collecting every {}s into {}",
        interval.as_secs(),
        path.display()
    ));
    print_info("Press Ctrl+C to stop");

    let started = Instant::now();
    let deadline = duration.map(|d| started + d);
    let mut count = 0u64;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }

        let sample = tokio::select! {
            sample = sampler.sample() => sample?,
            _ = &mut ctrl_c => break,
        };
        store.append(&sample)?;
        count += 1;

        println!(
            "[{}] CPU: {}, RAM: {} ({})",
            sample.timestamp.format(TIMESTAMP_FORMAT).to_string().cyan(),
            color_percent(sample.cpu_percent),
            color_percent(sample.ram_percent),
            format!("#{count}").magenta()
        );

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = &mut ctrl_c => break,
        }
    }

    println!();
    print_success(&format!(
        "{} samples collected in {:.1} seconds",
        count,
        started.elapsed().as_secs_f64()
    ));
    Ok(())
}

/// Summarize a telemetry file
pub fn show_stats(path: &Path, format: OutputFormat) -> Result<()> {
    let records = read_records(path)
        .with_context(|| format!("Failed to read telemetry file {}", path.display()))?;
    let summary = TelemetrySummary::from_records(&records)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Table => {
            println!("{}", "Telemetry Statistics".bold());
            println!(
                "{} to {}",
                summary.first.format(TIMESTAMP_FORMAT).to_string().cyan(),
                summary.last.format(TIMESTAMP_FORMAT).to_string().cyan()
            );
            print_table(&stat_rows(&summary), format);
        }
    }

    if summary.count < RECOMMENDED_SAMPLES {
        print_warning(&format!(
            "Only {} samples; at least {} are recommended for training",
            summary.count, RECOMMENDED_SAMPLES
        ));
    }
    Ok(())
}

fn stat_rows(summary: &TelemetrySummary) -> Vec<StatRow> {
    let row = |statistic, cpu: f64, ram: f64| StatRow {
        statistic,
        cpu: format!("{:.2}", cpu),
        ram: format!("{:.2}", ram),
    };

    vec![
        StatRow {
            statistic: "count",
            cpu: summary.count.to_string(),
            ram: summary.count.to_string(),
        },
        row("mean", summary.cpu.mean, summary.ram.mean),
        row("std", summary.cpu.std, summary.ram.std),
        row("min", summary.cpu.min, summary.ram.min),
        row("25%", summary.cpu.p25, summary.ram.p25),
        row("50%", summary.cpu.p50, summary.ram.p50),
        row("75%", summary.cpu.p75, summary.ram.p75),
        row("max", summary.cpu.max, summary.ram.max),
    ]
}

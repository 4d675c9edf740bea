//! Core data models for the host monitor

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Maximum number of processes carried by a sample
pub const MAX_ACTIVE_PROCESSES: usize = 5;

/// Processes at or below this share of CPU and RAM are not considered active
pub const ACTIVE_PROCESS_MIN_PERCENT: f64 = 1.0;

/// One process as seen during a sampling pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub ram_percent: f64,
}

/// Host utilization captured by one sampling pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Local>,
    pub cpu_percent: f64,
    pub ram_percent: f64,
    pub per_core_cpu: Vec<f64>,
    pub ram_used_gb: f64,
    pub ram_total_gb: f64,
    /// Top processes, cpu-descending then ram-descending
    pub active_processes: Vec<ProcessSnapshot>,
}

impl Sample {
    /// Build a sample with only the aggregate readings set
    pub fn new(timestamp: DateTime<Local>, cpu_percent: f64, ram_percent: f64) -> Self {
        Self {
            timestamp,
            cpu_percent,
            ram_percent,
            per_core_cpu: Vec::new(),
            ram_used_gb: 0.0,
            ram_total_gb: 0.0,
            active_processes: Vec::new(),
        }
    }

    pub fn with_processes(mut self, processes: Vec<ProcessSnapshot>) -> Self {
        self.active_processes = select_active_processes(processes);
        self
    }
}

/// Filter, order and cap a process list the way samples carry it
///
/// Keeps processes above 1% CPU or 1% RAM, orders them by CPU then RAM
/// (both descending) and keeps the first five.
pub fn select_active_processes(processes: Vec<ProcessSnapshot>) -> Vec<ProcessSnapshot> {
    let mut active: Vec<ProcessSnapshot> = processes
        .into_iter()
        .filter(|p| {
            p.cpu_percent > ACTIVE_PROCESS_MIN_PERCENT || p.ram_percent > ACTIVE_PROCESS_MIN_PERCENT
        })
        .collect();

    active.sort_by(|a, b| {
        b.cpu_percent
            .total_cmp(&a.cpu_percent)
            .then_with(|| b.ram_percent.total_cmp(&a.ram_percent))
    });
    active.truncate(MAX_ACTIVE_PROCESSES);
    active
}

/// Round a percentage to one decimal, the precision samples carry
pub fn round_percent(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Remembered impact of an application launch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownApp {
    pub cpu_impact: f64,
    pub ram_impact: f64,
    pub first_seen: DateTime<Local>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proc(pid: u32, name: &str, cpu: f64, ram: f64) -> ProcessSnapshot {
        ProcessSnapshot {
            pid,
            name: name.to_string(),
            cpu_percent: cpu,
            ram_percent: ram,
        }
    }

    #[test]
    fn test_select_filters_idle_processes() {
        let selected = select_active_processes(vec![
            proc(1, "idle", 0.5, 0.2),
            proc(2, "exactly-one", 1.0, 1.0),
            proc(3, "browser", 0.0, 4.0),
        ]);

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "browser");
    }

    #[test]
    fn test_select_orders_by_cpu_then_ram() {
        let selected = select_active_processes(vec![
            proc(1, "a", 5.0, 1.5),
            proc(2, "b", 20.0, 2.0),
            proc(3, "c", 5.0, 9.0),
        ]);

        let names: Vec<&str> = selected.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_select_caps_to_five() {
        let processes = (0..8).map(|i| proc(i, "p", 2.0 + i as f64, 0.0)).collect();
        let selected = select_active_processes(processes);

        assert_eq!(selected.len(), MAX_ACTIVE_PROCESSES);
        assert_eq!(selected[0].pid, 7);
        assert_eq!(selected[4].pid, 3);
    }

    #[test]
    fn test_round_percent() {
        assert_eq!(round_percent(12.345), 12.3);
        assert_eq!(round_percent(99.96), 100.0);
    }
}

//! Application launch attribution
//!
//! A sudden jump in host load that coincides with a never-seen process
//! crossing the CPU bar is attributed to that process. The process is
//! remembered with its impact and the cycle is not treated as anomalous.

use std::collections::HashMap;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::history::BoundedHistory;
use crate::models::{KnownApp, ProcessSnapshot, Sample};

/// A new process must use more than this much CPU to count as a launch
pub const LAUNCH_CPU_PERCENT: f64 = 10.0;

/// Host CPU increase (points) that makes a launch significant
pub const SIGNIFICANT_CPU_IMPACT: f64 = 10.0;

/// Host RAM increase (points) that makes a launch significant
pub const SIGNIFICANT_RAM_IMPACT: f64 = 5.0;

/// A launch that was attributed during a cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribution {
    pub app: String,
    pub cpu_impact: f64,
    pub ram_impact: f64,
}

/// Memory of applications whose launch impact has been observed
///
/// Entries are never evicted.
#[derive(Debug, Clone, Default)]
pub struct AppTracker {
    known_apps: HashMap<String, KnownApp>,
}

impl AppTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// First process, in sample order, that is unknown and above the CPU bar
    pub fn detect_launch<'a>(&self, sample: &'a Sample) -> Option<&'a ProcessSnapshot> {
        sample.active_processes.iter().find(|p| {
            !self.known_apps.contains_key(&p.name) && p.cpu_percent > LAUNCH_CPU_PERCENT
        })
    }

    /// Attribute the newest sample's load change to a launch, if any
    ///
    /// `history` must already contain the current sample as its newest
    /// entry. Returns the attribution when the launch was significant; the
    /// known-app table is updated in that case only.
    pub fn attribute(
        &mut self,
        history: &BoundedHistory<Sample>,
        now: DateTime<Local>,
    ) -> Option<Attribution> {
        let current = history.newest()?;
        let previous = history.previous()?;
        let candidate = self.detect_launch(current)?;

        let cpu_impact = current.cpu_percent - previous.cpu_percent;
        let ram_impact = current.ram_percent - previous.ram_percent;

        if cpu_impact <= SIGNIFICANT_CPU_IMPACT && ram_impact <= SIGNIFICANT_RAM_IMPACT {
            return None;
        }

        let app = candidate.name.clone();
        self.learn(&app, cpu_impact, ram_impact, now);

        Some(Attribution {
            app,
            cpu_impact,
            ram_impact,
        })
    }

    /// Record or overwrite the impact of an application
    pub fn learn(&mut self, app: &str, cpu_impact: f64, ram_impact: f64, now: DateTime<Local>) {
        self.known_apps.insert(
            app.to_string(),
            KnownApp {
                cpu_impact,
                ram_impact,
                first_seen: now,
            },
        );
    }

    pub fn get(&self, app: &str) -> Option<&KnownApp> {
        self.known_apps.get(app)
    }

    pub fn known_apps(&self) -> &HashMap<String, KnownApp> {
        &self.known_apps
    }

    pub fn len(&self) -> usize {
        self.known_apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known_apps.is_empty()
    }
}

//! Trend over the retained history window

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::history::BoundedHistory;
use crate::models::Sample;

/// Direction of a change between the oldest and newest samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    fn arrow(&self) -> &'static str {
        match self {
            Direction::Up => "↑",
            Direction::Down => "↓",
        }
    }
}

/// Signed change of one reading, split into direction and magnitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Delta {
    pub direction: Direction,
    pub magnitude: f64,
}

impl Delta {
    /// A zero change reports as down
    pub fn between(oldest: f64, newest: f64) -> Self {
        let change = newest - oldest;
        Self {
            direction: if change > 0.0 {
                Direction::Up
            } else {
                Direction::Down
            },
            magnitude: change.abs(),
        }
    }
}

/// Trend summary attached to alerts and status reports
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrendReport {
    InsufficientData,
    Window {
        cpu: Delta,
        ram: Delta,
        #[serde(with = "duration_secs")]
        window: Duration,
    },
}

impl TrendReport {
    /// Compare the newest and oldest retained samples
    pub fn from_history(history: &BoundedHistory<Sample>, interval: Duration) -> Self {
        let (Some(oldest), Some(newest)) = (history.oldest(), history.newest()) else {
            return TrendReport::InsufficientData;
        };
        if history.len() < 2 {
            return TrendReport::InsufficientData;
        }

        let retained = history.len().min(history.capacity()) as u32;
        TrendReport::Window {
            cpu: Delta::between(oldest.cpu_percent, newest.cpu_percent),
            ram: Delta::between(oldest.ram_percent, newest.ram_percent),
            window: interval * retained,
        }
    }
}

impl fmt::Display for TrendReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendReport::InsufficientData => write!(f, "Not enough data to compute a trend."),
            TrendReport::Window { cpu, ram, window } => {
                writeln!(f, "Trend (over {}s):", window.as_secs())?;
                writeln!(f, "CPU: {} {:.1}%", cpu.direction.arrow(), cpu.magnitude)?;
                write!(f, "RAM: {} {:.1}%", ram.direction.arrow(), ram.magnitude)
            }
        }
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }
}

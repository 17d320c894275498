pub mod alerts;
pub mod config;
pub mod discord;
pub mod monitors;
pub mod samplers;
pub mod throttle;
pub mod util;

use std::fmt;

use serde::{Deserialize, Serialize};

/// A monitored dimension of the host.
///
/// `Cpu`, `Memory` and `Disk` are threshold categories and are throttled by
/// cooldown. `Ssh` is the log-event category and is throttled by event key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Cpu,
    Memory,
    Disk,
    Ssh,
}

impl Category {
    /// All categories that are compared against a percentage limit.
    pub const THRESHOLDS: [Category; 3] = [Category::Cpu, Category::Memory, Category::Disk];

    pub fn label(self) -> &'static str {
        match self {
            Category::Cpu => "CPU",
            Category::Memory => "Memory",
            Category::Disk => "Disk",
            Category::Ssh => "SSH",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Percent,
}

/// Used and total bytes behind a memory or disk percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity {
    pub used: u64,
    pub total: u64,
}

/// One sampled value for a threshold category. Lives for a single tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub category: Category,
    pub value: f32,
    pub unit: Unit,
    pub capacity: Option<Capacity>,
}

impl Reading {
    pub fn percent(category: Category, value: f32) -> Self {
        Self {
            category,
            value,
            unit: Unit::Percent,
            capacity: None,
        }
    }

    pub fn with_capacity(mut self, used: u64, total: u64) -> Self {
        self.capacity = Some(Capacity { used, total });
        self
    }
}

/// The newest failed-authentication line found in the auth log tail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// The full log line, without its trailing newline.
    pub raw_line: String,

    /// First space-delimited field of the line, used as the dedup key.
    pub timestamp: String,

    /// Number of matching lines in the scanned tail.
    pub match_count: usize,
}

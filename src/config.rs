use std::path::PathBuf;
use std::time::Duration;

use tracing::trace;

use crate::Category;

/// Percentage limits for the threshold categories.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_cpu_limit")]
    pub cpu: f32,
    #[serde(default = "default_memory_limit")]
    pub memory: f32,
    #[serde(default = "default_disk_limit")]
    pub disk: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            cpu: default_cpu_limit(),
            memory: default_memory_limit(),
            disk: default_disk_limit(),
        }
    }
}

impl Thresholds {
    pub fn limit(&self, category: Category) -> Option<f32> {
        match category {
            Category::Cpu => Some(self.cpu),
            Category::Memory => Some(self.memory),
            Category::Disk => Some(self.disk),
            Category::Ssh => None,
        }
    }

    pub fn specs(&self) -> Vec<ThresholdSpec> {
        Category::THRESHOLDS
            .iter()
            .filter_map(|&category| {
                self.limit(category)
                    .map(|limit| ThresholdSpec { category, limit })
            })
            .collect()
    }
}

/// Limit for a single threshold category, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdSpec {
    pub category: Category,
    pub limit: f32,
}

impl ThresholdSpec {
    /// Strictly greater-than: a reading sitting exactly on the limit is fine.
    pub fn is_exceeded_by(&self, value: f32) -> bool {
        value > self.limit
    }
}

fn default_cpu_limit() -> f32 {
    10.0
}

fn default_memory_limit() -> f32 {
    50.0
}

fn default_disk_limit() -> f32 {
    20.0
}

/// Where failed logins are read from and what they look like.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct AuthLogConfig {
    #[serde(default = "default_auth_log_path")]
    pub path: PathBuf,

    /// Only this many lines from the end of the file are scanned.
    #[serde(default = "default_tail_lines")]
    pub tail_lines: usize,

    /// Literal substrings marking a failed authentication.
    #[serde(default = "default_markers")]
    pub markers: Vec<String>,
}

impl Default for AuthLogConfig {
    fn default() -> Self {
        AuthLogConfig {
            path: default_auth_log_path(),
            tail_lines: default_tail_lines(),
            markers: default_markers(),
        }
    }
}

fn default_auth_log_path() -> PathBuf {
    PathBuf::from("/var/log/auth.log")
}

fn default_tail_lines() -> usize {
    5000
}

fn default_markers() -> Vec<String> {
    vec![
        "Invalid user".to_string(),
        "Connection closed by invalid user".to_string(),
    ]
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub thresholds: Thresholds,

    /// Minimum time between two alerts of the same threshold category.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    /// Sleep after a tick failed unexpectedly.
    #[serde(default = "default_backoff_interval_secs")]
    pub backoff_interval_secs: u64,

    /// Observation window used to smooth CPU usage.
    #[serde(default = "default_cpu_window_ms")]
    pub cpu_window_ms: u64,

    /// Mount point whose usage is reported as disk usage.
    #[serde(default = "default_disk_mount")]
    pub disk_mount: PathBuf,

    #[serde(default)]
    pub auth_log: AuthLogConfig,

    #[serde(default = "default_webhook_timeout_secs")]
    pub webhook_timeout_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            thresholds: Thresholds::default(),
            cooldown_secs: default_cooldown_secs(),
            tick_interval_secs: default_tick_interval_secs(),
            backoff_interval_secs: default_backoff_interval_secs(),
            cpu_window_ms: default_cpu_window_ms(),
            disk_mount: default_disk_mount(),
            auth_log: AuthLogConfig::default(),
            webhook_timeout_secs: default_webhook_timeout_secs(),
        }
    }
}

impl MonitorConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn backoff_interval(&self) -> Duration {
        Duration::from_secs(self.backoff_interval_secs)
    }

    pub fn cpu_window(&self) -> Duration {
        Duration::from_millis(self.cpu_window_ms)
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook_timeout_secs)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tick_interval_secs == 0 {
            anyhow::bail!("tick_interval_secs must be greater than zero");
        }

        for spec in self.thresholds.specs() {
            if !(0.0..=100.0).contains(&spec.limit) {
                anyhow::bail!(
                    "{} threshold must be a percentage between 0 and 100, got {}",
                    spec.category,
                    spec.limit
                );
            }
        }

        if self.auth_log.markers.is_empty() {
            anyhow::bail!("at least one auth log marker must be configured");
        }

        // an empty marker matches every line
        if self.auth_log.markers.iter().any(|marker| marker.trim().is_empty()) {
            anyhow::bail!("auth log markers must not be empty");
        }

        if self.auth_log.tail_lines == 0 {
            anyhow::bail!("auth_log.tail_lines must be greater than zero");
        }

        Ok(())
    }
}

fn default_cooldown_secs() -> u64 {
    10
}

fn default_tick_interval_secs() -> u64 {
    3
}

fn default_backoff_interval_secs() -> u64 {
    10
}

fn default_cpu_window_ms() -> u64 {
    100
}

fn default_disk_mount() -> PathBuf {
    PathBuf::from("/")
}

fn default_webhook_timeout_secs() -> u64 {
    10
}

pub fn read_config_file(path: &str) -> anyhow::Result<MonitorConfig> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}

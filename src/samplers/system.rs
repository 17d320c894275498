use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use sysinfo::{Disks, System};
use tracing::{instrument, trace, warn};

use crate::{Category, Reading};

use super::ResourceSampler;

/// Samples the local host through `sysinfo`.
///
/// CPU usage is averaged over a short observation window, memory and disk
/// are instantaneous snapshots.
pub struct SystemSampler {
    system: System,
    cpu_window: Duration,
    disk_mount: PathBuf,
}

impl SystemSampler {
    pub fn new(cpu_window: Duration, disk_mount: impl Into<PathBuf>) -> Self {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            warn!("sysinfo does not support this platform, readings will be unavailable");
        }

        // sysinfo cannot compute usage over a shorter window than this
        let cpu_window = cpu_window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);

        Self {
            system: System::new(),
            cpu_window,
            disk_mount: disk_mount.into(),
        }
    }

    #[instrument(skip(self))]
    async fn sample_cpu(&mut self) -> Option<Reading> {
        self.system.refresh_cpu_usage();
        tokio::time::sleep(self.cpu_window).await;
        self.system.refresh_cpu_usage();

        if self.system.cpus().is_empty() {
            trace!("no CPUs reported");
            return None;
        }

        Some(Reading::percent(
            Category::Cpu,
            self.system.global_cpu_usage(),
        ))
    }

    fn sample_memory(&mut self) -> Option<Reading> {
        self.system.refresh_memory();

        let total = self.system.total_memory();
        let used = self.system.used_memory();
        if total == 0 {
            trace!("total memory reported as zero");
            return None;
        }

        Some(Reading::percent(Category::Memory, percentage(used, total)).with_capacity(used, total))
    }

    fn sample_disk(&self) -> Option<Reading> {
        let disks = Disks::new_with_refreshed_list();
        let disk = disks
            .list()
            .iter()
            .find(|disk| disk.mount_point() == self.disk_mount.as_path());

        let Some(disk) = disk else {
            trace!("no disk mounted at {}", self.disk_mount.display());
            return None;
        };

        let total = disk.total_space();
        if total == 0 {
            return None;
        }
        let used = total.saturating_sub(disk.available_space());

        Some(Reading::percent(Category::Disk, percentage(used, total)).with_capacity(used, total))
    }
}

#[async_trait]
impl ResourceSampler for SystemSampler {
    async fn sample(&mut self, category: Category) -> anyhow::Result<Option<Reading>> {
        let reading = match category {
            Category::Cpu => self.sample_cpu().await,
            Category::Memory => self.sample_memory(),
            Category::Disk => self.sample_disk(),
            Category::Ssh => anyhow::bail!("{category} is not a resource category"),
        };

        Ok(reading)
    }
}

/// `used` as a percentage of `total`, rounded to one decimal place.
pub fn percentage(used: u64, total: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    let percent = used as f64 / total as f64 * 100.0;
    ((percent * 10.0).round() / 10.0) as f32
}

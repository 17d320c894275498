//! Metric samplers
//!
//! Leaf components that read the host. Samplers hold no alerting state and
//! never decide whether something is worth an alert, that is the job of the
//! [`AlertThrottle`](crate::throttle::AlertThrottle).
//!
//! - [`ResourceSampler`]: CPU, memory and disk percentages
//! - [`EventSource`]: newest failed-authentication event from a log

pub mod auth_log;
pub mod system;

use async_trait::async_trait;

use crate::{Category, LogEvent, Reading};

pub use auth_log::{AuthLogSampler, LogSourceError};
pub use system::SystemSampler;

/// Source of threshold readings.
///
/// `Ok(None)` means the sensor is unavailable right now and is not treated as
/// a failure. `Err` is reserved for conditions the tick loop did not expect,
/// which put the loop into its backoff state.
#[async_trait]
pub trait ResourceSampler: Send {
    async fn sample(&mut self, category: Category) -> anyhow::Result<Option<Reading>>;
}

/// Source of failed-authentication events.
#[async_trait]
pub trait EventSource: Send {
    /// The newest matching event, if the scanned log contains any.
    async fn latest(&mut self) -> Result<Option<LogEvent>, LogSourceError>;
}

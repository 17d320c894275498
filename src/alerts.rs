use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{error, info, instrument, trace};

use crate::config::ThresholdSpec;
use crate::discord::{DiscordWebhook, DispatchError, Message};
use crate::samplers::LogSourceError;
use crate::samplers::auth_log::to_local_time;
use crate::{LogEvent, Reading};

const BYTES_PER_GB: f64 = (1024 * 1024 * 1024) as f64;

const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Result of a dispatch that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// No webhook is configured or there was nothing to send.
    Skipped,
}

/// Outbound side of the monitor. Implementations never let a failed delivery
/// escape as a panic, the outcome is only for logging.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<Delivery, DispatchError>;
}

/// Sends alert batches to a Discord webhook, best effort.
#[derive(Debug, Clone)]
pub struct AlertManager {
    webhook: Option<DiscordWebhook>,
}

impl AlertManager {
    /// A missing or blank URL disables sending; alerts are then only logged.
    pub fn new(webhook_url: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let webhook = match webhook_url.filter(|url| !url.trim().is_empty()) {
            Some(url) => Some(DiscordWebhook::new(url, timeout)?),
            None => None,
        };

        Ok(Self { webhook })
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook.is_some()
    }

    #[instrument(skip_all)]
    pub async fn send_alert(&self, message: &str) -> Result<Delivery, DispatchError> {
        let Some(webhook) = &self.webhook else {
            trace!("no webhook configured, not sending: {message}");
            return Ok(Delivery::Skipped);
        };

        if message.is_empty() {
            return Ok(Delivery::Skipped);
        }

        let message = Message::new(with_header(message, Utc::now()));

        match webhook.send_message(&message).await {
            Ok(()) => {
                info!("Alert sent to Discord: {}", message.content);
                Ok(Delivery::Sent)
            }
            Err(e) => {
                error!("{e}");
                Err(e)
            }
        }
    }
}

#[async_trait]
impl Notifier for AlertManager {
    async fn notify(&self, message: &str) -> Result<Delivery, DispatchError> {
        self.send_alert(message).await
    }
}

/// Prefix a message with the alert header carrying the UTC send time.
pub fn with_header(message: &str, now: DateTime<Utc>) -> String {
    format!(
        "**System Alert - {} UTC**\n{message}",
        now.format(DISPLAY_TIME_FORMAT)
    )
}

fn gigabytes(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_GB
}

/// Alert text for a reading above its limit.
pub fn format_threshold_alert(reading: &Reading, spec: &ThresholdSpec) -> String {
    let mut message = format!(
        "🚨 {} usage: {:.1}% (Threshold: {:.1}%)",
        reading.category, reading.value, spec.limit
    );

    if let Some(capacity) = reading.capacity {
        message.push_str(&format!(
            "\nUsed: {:.1}GB out of {:.1}GB",
            gigabytes(capacity.used),
            gigabytes(capacity.total)
        ));
    }

    message
}

/// Alert text for a failed login at `utc`, shown in local time.
pub fn format_ssh_alert(event: &LogEvent, utc: NaiveDateTime, now: DateTime<Utc>) -> String {
    let local = to_local_time(utc, now)
        .format(DISPLAY_TIME_FORMAT)
        .to_string();

    format!(
        "🚨 SSH alert: {} failed login attempt(s)\n\
         *Local Timestamp: **{local}***\n\
         Recent attempt:\n{local} {}",
        event.match_count, event.raw_line
    )
}

pub fn format_log_warning(err: &LogSourceError) -> String {
    format!("⚠️ Error checking SSH logs: {err}")
}

/// Unconditional status summary, one line per threshold category.
pub fn format_status_report(entries: &[(ThresholdSpec, Option<Reading>)]) -> String {
    let mut report = String::from("**📊 System Status**");

    for (spec, reading) in entries {
        let value = match reading {
            Some(reading) => format!("{:.1}%", reading.value),
            None => "unavailable".to_string(),
        };
        report.push_str(&format!(
            "\n{}: {value} (Threshold: {:.1}%)",
            spec.category, spec.limit
        ));
    }

    report
}

/// Join the alerts of one tick into a single message.
pub fn join_alerts(alerts: &[String]) -> Option<String> {
    if alerts.is_empty() {
        return None;
    }
    Some(alerts.join("\n\n"))
}

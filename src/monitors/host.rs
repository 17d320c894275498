//! HostMonitor - the tick loop
//!
//! ## State Machine
//!
//! ```text
//!            start ──► heartbeat report (unthrottled)
//!                             │
//!                             ▼
//!        ┌───────────────► Running ── tick ok ──► sleep tick_interval ──┐
//!        │                    │                                        │
//!        │               tick failed                                   │
//!        │                    ▼                                        │
//!        └──── sleep backoff_interval ◄── DegradedBackoff              │
//!                                                                      │
//!   shutdown signal while sleeping ──► Interrupted ◄───────────────────┘
//! ```
//!
//! A tick samples every threshold category and the auth log, filters the
//! candidates through the [`AlertThrottle`] and sends whatever survived as
//! one message. Dispatch failures are logged and never affect the state.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::{
    Category,
    alerts::{
        Delivery, Notifier, format_log_warning, format_ssh_alert, format_status_report,
        format_threshold_alert, join_alerts,
    },
    config::{MonitorConfig, ThresholdSpec},
    monitors::resources::ResourceEvaluation,
    samplers::{EventSource, ResourceSampler, auth_log::parse_log_timestamp},
    throttle::AlertThrottle,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Running,
    DegradedBackoff,
    Interrupted,
}

pub struct HostMonitor<R, E, N>
where
    R: ResourceSampler,
    E: EventSource,
    N: Notifier,
{
    resources: R,
    events: E,
    notifier: N,
    specs: Vec<ThresholdSpec>,
    throttle: AlertThrottle,
    tick_interval: Duration,
    backoff_interval: Duration,
    state: MonitorState,
}

impl<R, E, N> HostMonitor<R, E, N>
where
    R: ResourceSampler,
    E: EventSource,
    N: Notifier,
{
    pub fn new(config: &MonitorConfig, resources: R, events: E, notifier: N) -> Self {
        Self {
            resources,
            events,
            notifier,
            specs: config.thresholds.specs(),
            throttle: AlertThrottle::new(config.cooldown()),
            tick_interval: config.tick_interval(),
            backoff_interval: config.backoff_interval(),
            state: MonitorState::Running,
        }
    }

    pub fn throttle(&self) -> &AlertThrottle {
        &self.throttle
    }

    /// How long to sleep before the next tick, given the current state.
    pub fn delay(&self) -> Duration {
        match self.state {
            MonitorState::DegradedBackoff => self.backoff_interval,
            MonitorState::Running | MonitorState::Interrupted => self.tick_interval,
        }
    }

    /// Send the startup status report, bypassing thresholds and throttle.
    #[instrument(skip(self))]
    pub async fn heartbeat(&mut self) -> anyhow::Result<()> {
        let mut entries = Vec::with_capacity(self.specs.len());
        for spec in self.specs.clone() {
            let reading = self.resources.sample(spec.category).await?;
            entries.push((spec, reading));
        }

        self.dispatch(&format_status_report(&entries)).await;
        Ok(())
    }

    /// Sample everything and return the alerts that passed the throttle.
    ///
    /// Auth log problems become a warning in the returned batch, only
    /// resource sampler errors are propagated.
    pub async fn collect_alerts(&mut self, now: DateTime<Utc>) -> anyhow::Result<Vec<String>> {
        let mut alerts = vec![];

        for spec in self.specs.clone() {
            let Some(reading) = self.resources.sample(spec.category).await? else {
                trace!("{}: reading unavailable", spec.category);
                continue;
            };

            let evaluation =
                ResourceEvaluation::of_reading(&reading, &spec, &mut self.throttle, now);
            if evaluation == ResourceEvaluation::Alert {
                debug!(
                    "{}: usage exceeded limit ({} > {})",
                    spec.category, reading.value, spec.limit
                );
                alerts.push(format_threshold_alert(&reading, &spec));
            }
        }

        match self.events.latest().await {
            // an unparsable timestamp is never recorded as the last key
            Ok(Some(event)) => match parse_log_timestamp(&event.timestamp) {
                Ok(utc) => {
                    if self.throttle.should_fire_event(Category::Ssh, &event.timestamp) {
                        debug!("new failed login at {}", event.timestamp);
                        alerts.push(format_ssh_alert(&event, utc, now));
                    }
                }
                Err(e) => {
                    warn!("failed to parse auth log timestamp: {e}");
                    alerts.push(format_log_warning(&e));
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!("failed to check auth log: {e}");
                alerts.push(format_log_warning(&e));
            }
        }

        Ok(alerts)
    }

    /// One tick: collect alerts and send them as a single message.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> anyhow::Result<Vec<String>> {
        let alerts = self.collect_alerts(now).await?;

        if let Some(message) = join_alerts(&alerts) {
            self.dispatch(&message).await;
        }

        Ok(alerts)
    }

    /// Run one tick and move to the state that decides the next sleep.
    #[instrument(skip(self))]
    pub async fn step(&mut self, now: DateTime<Utc>) -> MonitorState {
        self.state = match self.tick(now).await {
            Ok(alerts) => {
                trace!("tick finished with {} alert(s)", alerts.len());
                MonitorState::Running
            }
            Err(e) => {
                error!("Error in monitoring loop: {e:#}");
                MonitorState::DegradedBackoff
            }
        };

        self.state
    }

    /// Run until `shutdown` resolves. Shutdown is only observed between
    /// ticks, a tick in progress always completes.
    #[instrument(skip_all)]
    pub async fn run<F>(mut self, shutdown: F) -> MonitorState
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        if let Err(e) = self.heartbeat().await {
            error!("failed to send status report: {e:#}");
        }

        loop {
            let state = self.step(Utc::now()).await;
            if state == MonitorState::DegradedBackoff {
                warn!("backing off for {:?}", self.backoff_interval);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.delay()) => {}
                _ = &mut shutdown => {
                    self.state = MonitorState::Interrupted;
                    break;
                }
            }
        }

        info!("Exiting system monitoring...");
        self.state
    }

    async fn dispatch(&self, message: &str) {
        match self.notifier.notify(message).await {
            Ok(Delivery::Sent) => trace!("dispatched {} bytes", message.len()),
            Ok(Delivery::Skipped) => debug!("not dispatched (no webhook configured):\n{message}"),
            // already logged by the notifier
            Err(e) => trace!("dispatch failed: {e}"),
        }
    }
}

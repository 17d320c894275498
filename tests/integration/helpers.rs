//! Fakes for driving the host monitor without touching the real host

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use health_monitor::{
    Category, LogEvent, Reading,
    alerts::{Delivery, Notifier},
    config::MonitorConfig,
    discord::DispatchError,
    monitors::host::HostMonitor,
    samplers::{EventSource, LogSourceError, ResourceSampler},
};
use reqwest::StatusCode;
use tokio::time::Instant;

/// Resource sampler with values that can be changed between ticks.
#[derive(Clone, Default)]
pub struct FakeSampler {
    values: Arc<Mutex<HashMap<Category, f32>>>,
    failing_cpu_calls: Arc<Mutex<Vec<usize>>>,
    cpu_calls: Arc<Mutex<Vec<Instant>>>,
}

impl FakeSampler {
    pub fn with_values(cpu: f32, memory: f32, disk: f32) -> Self {
        let sampler = FakeSampler::default();
        sampler.set(Category::Cpu, cpu);
        sampler.set(Category::Memory, memory);
        sampler.set(Category::Disk, disk);
        sampler
    }

    /// Values well below the default thresholds.
    pub fn idle() -> Self {
        Self::with_values(1.0, 1.0, 1.0)
    }

    pub fn set(&self, category: Category, value: f32) {
        self.values.lock().unwrap().insert(category, value);
    }

    pub fn make_unavailable(&self, category: Category) {
        self.values.lock().unwrap().remove(&category);
    }

    /// Fail the n-th (0-based) CPU sample with an unexpected error.
    pub fn fail_cpu_call(&self, n: usize) {
        self.failing_cpu_calls.lock().unwrap().push(n);
    }

    /// Paused-clock instants at which CPU was sampled.
    pub fn cpu_calls(&self) -> Vec<Instant> {
        self.cpu_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceSampler for FakeSampler {
    async fn sample(&mut self, category: Category) -> anyhow::Result<Option<Reading>> {
        if category == Category::Cpu {
            let mut calls = self.cpu_calls.lock().unwrap();
            let call = calls.len();
            calls.push(Instant::now());

            if self.failing_cpu_calls.lock().unwrap().contains(&call) {
                anyhow::bail!("sensor exploded on call {call}");
            }
        }

        let value = self.values.lock().unwrap().get(&category).copied();
        Ok(value.map(|value| Reading::percent(category, value)))
    }
}

/// Event source handing out queued results, then nothing.
#[derive(Clone, Default)]
pub struct FakeEvents {
    queue: Arc<Mutex<VecDeque<Result<Option<LogEvent>, LogSourceError>>>>,
}

impl FakeEvents {
    pub fn push_event(&self, timestamp: &str) {
        self.queue.lock().unwrap().push_back(Ok(Some(log_event(timestamp))));
    }

    pub fn push_error(&self, err: LogSourceError) {
        self.queue.lock().unwrap().push_back(Err(err));
    }
}

#[async_trait]
impl EventSource for FakeEvents {
    async fn latest(&mut self) -> Result<Option<LogEvent>, LogSourceError> {
        self.queue.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }
}

/// Notifier remembering every message it was asked to send.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
    failing: bool,
}

impl RecordingNotifier {
    /// Every send is answered like a webhook returning 500.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) -> Result<Delivery, DispatchError> {
        self.messages.lock().unwrap().push(message.to_string());

        if self.failing {
            return Err(DispatchError::UnexpectedStatus {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: String::new(),
            });
        }

        Ok(Delivery::Sent)
    }
}

pub fn log_event(timestamp: &str) -> LogEvent {
    LogEvent {
        raw_line: format!("{timestamp} host sshd[42]: Invalid user admin from 10.0.0.7"),
        timestamp: timestamp.to_string(),
        match_count: 1,
    }
}

pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
}

pub type FakeMonitor = HostMonitor<FakeSampler, FakeEvents, RecordingNotifier>;

pub fn create_test_monitor(
    sampler: &FakeSampler,
    events: &FakeEvents,
    notifier: &RecordingNotifier,
) -> FakeMonitor {
    HostMonitor::new(
        &MonitorConfig::default(),
        sampler.clone(),
        events.clone(),
        notifier.clone(),
    )
}

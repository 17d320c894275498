//! Failed-authentication sampler
//!
//! Scans the tail of an append-only auth log from the newest line backwards
//! and reports the newest line containing one of the failure markers. Lines
//! are expected to start with an ISO-8601 timestamp token:
//!
//! ```text
//! 2024-10-01T12:00:00.123456+00:00 host sshd[811]: Invalid user admin from 10.0.0.7 port 51122
//! ```

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDateTime, TimeDelta, Utc};
use regex::RegexSet;
use tracing::{instrument, trace};

use crate::LogEvent;
use crate::config::AuthLogConfig;

use super::EventSource;

/// Format of the leading timestamp token, always UTC.
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f+00:00";

/// Errors raised while reading or interpreting the auth log
#[derive(Debug)]
pub enum LogSourceError {
    /// The log file could not be read
    Io { path: PathBuf, source: std::io::Error },

    /// A failure marker could not be compiled
    InvalidPattern(regex::Error),

    /// The leading token of a matching line is not a UTC ISO-8601 timestamp
    InvalidTimestamp {
        timestamp: String,
        source: chrono::ParseError,
    },
}

impl fmt::Display for LogSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSourceError::Io { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            LogSourceError::InvalidPattern(err) => write!(f, "invalid failure marker: {}", err),
            LogSourceError::InvalidTimestamp { timestamp, source } => {
                write!(f, "invalid timestamp '{}': {}", timestamp, source)
            }
        }
    }
}

impl std::error::Error for LogSourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LogSourceError::Io { source, .. } => Some(source),
            LogSourceError::InvalidPattern(err) => Some(err),
            LogSourceError::InvalidTimestamp { source, .. } => Some(source),
        }
    }
}

impl From<regex::Error> for LogSourceError {
    fn from(err: regex::Error) -> Self {
        LogSourceError::InvalidPattern(err)
    }
}

#[derive(Debug, Clone)]
pub struct AuthLogSampler {
    path: PathBuf,
    tail_lines: usize,
    markers: RegexSet,
}

impl AuthLogSampler {
    pub fn new(config: &AuthLogConfig) -> Result<Self, LogSourceError> {
        let markers = RegexSet::new(config.markers.iter().map(|marker| regex::escape(marker)))?;

        Ok(Self {
            path: config.path.clone(),
            tail_lines: config.tail_lines,
            markers,
        })
    }

    /// Newest failure line within the last `tail_lines` lines of `content`.
    pub fn find_latest_failure(&self, content: &str) -> Option<LogEvent> {
        let lines: Vec<&str> = content.lines().collect();
        let tail = &lines[lines.len().saturating_sub(self.tail_lines)..];

        let mut failures = tail
            .iter()
            .rev()
            .filter(|line| self.markers.is_match(line));

        let newest = failures.next()?;
        let match_count = failures.count() + 1;

        Some(LogEvent {
            raw_line: newest.to_string(),
            timestamp: newest.split(' ').next().unwrap_or_default().to_string(),
            match_count,
        })
    }
}

#[async_trait]
impl EventSource for AuthLogSampler {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn latest(&mut self) -> Result<Option<LogEvent>, LogSourceError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| LogSourceError::Io {
                path: self.path.clone(),
                source,
            })?;

        let content = String::from_utf8_lossy(&bytes);
        let event = self.find_latest_failure(&content);

        trace!("latest failure: {event:?}");

        Ok(event)
    }
}

pub fn parse_log_timestamp(timestamp: &str) -> Result<NaiveDateTime, LogSourceError> {
    NaiveDateTime::parse_from_str(timestamp, LOG_TIMESTAMP_FORMAT).map_err(|source| {
        LogSourceError::InvalidTimestamp {
            timestamp: timestamp.to_string(),
            source,
        }
    })
}

/// Hours added to UTC for local display.
///
/// A month heuristic rather than a DST calendar: April through September is
/// treated as summer time (+2h), every other month as standard time (+1h).
/// Around the real switch-over days this is off by an hour.
pub fn local_offset_hours(month: u32) -> i64 {
    if (4..=9).contains(&month) { 2 } else { 1 }
}

/// Shift a UTC log time to local time, with the offset chosen by the month
/// of `now`.
pub fn to_local_time(utc: NaiveDateTime, now: DateTime<Utc>) -> NaiveDateTime {
    utc + TimeDelta::hours(local_offset_hours(now.month()))
}

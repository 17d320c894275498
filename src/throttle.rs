//! Alert throttle - decides which detected conditions become alerts
//!
//! Threshold categories are throttled by time, the log category by key:
//!
//! ```text
//! should_fire(category, now):
//!   never fired                       → fire, remember now
//!   now - last_fired >  cooldown      → fire, remember now
//!   now - last_fired <= cooldown      → suppress
//!
//! should_fire_event(category, key):
//!   key != last_key                   → fire, remember key
//!   key == last_key                   → suppress
//! ```
//!
//! Deciding and recording happen in the same call, there is no separate
//! commit step.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::trace;

use crate::Category;

/// What the throttle remembers about previously fired alerts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertState {
    last_fired: HashMap<Category, DateTime<Utc>>,
    last_key: HashMap<Category, String>,
}

impl AlertState {
    pub fn last_fired(&self, category: Category) -> Option<DateTime<Utc>> {
        self.last_fired.get(&category).copied()
    }

    /// Only the single most recently sent key is kept per category. A key
    /// showing up again after a different one will fire again.
    pub fn last_key(&self, category: Category) -> Option<&str> {
        self.last_key.get(&category).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct AlertThrottle {
    cooldown: TimeDelta,
    state: AlertState,
}

impl AlertThrottle {
    /// Create a throttle with one cooldown shared by every threshold category.
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown: TimeDelta::from_std(cooldown).unwrap_or(TimeDelta::MAX),
            state: AlertState::default(),
        }
    }

    pub fn state(&self) -> &AlertState {
        &self.state
    }

    /// Returns true iff more than the cooldown passed since `category` last
    /// fired, and records `now` as its new firing time in that case.
    pub fn should_fire(&mut self, category: Category, now: DateTime<Utc>) -> bool {
        let fire = match self.state.last_fired.get(&category) {
            Some(last) => now.signed_duration_since(*last) > self.cooldown,
            None => true,
        };

        trace!(
            "{category}: cooldown check at {now} (last: {:?}) → {fire}",
            self.state.last_fired.get(&category)
        );

        if fire {
            self.state.last_fired.insert(category, now);
        }

        fire
    }

    /// Returns true iff `key` differs from the last key sent for `category`,
    /// and records it in that case.
    pub fn should_fire_event(&mut self, category: Category, key: &str) -> bool {
        let fire = self.state.last_key(category) != Some(key);

        trace!("{category}: event key {key} → {fire}");

        if fire {
            self.state.last_key.insert(category, key.to_string());
        }

        fire
    }
}

//! Host monitoring
//!
//! - [`resources`]: turns a single reading into an alert decision
//! - [`host`]: the tick loop tying samplers, throttle and dispatch together

pub mod host;
pub mod resources;

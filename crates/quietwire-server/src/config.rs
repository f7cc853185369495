//! Server configuration.

use std::time::Duration;

use quietwire_proto::FrameLimits;

/// Relay server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (e.g. "0.0.0.0:9000").
    pub bind_address: String,
    /// Interval between heartbeat pings.
    pub heartbeat_interval: Duration,
    /// Maximum raw frame size accepted from a client.
    pub max_frame_bytes: usize,
    /// Structural limits applied to every decoded frame.
    pub limits: FrameLimits,
    /// Rate limiter burst capacity per connection.
    pub rate_capacity: u32,
    /// Rate limiter refill, frames per second.
    pub rate_refill_per_sec: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9000".to_string(),
            heartbeat_interval: Duration::from_secs(30),
            max_frame_bytes: 128 * 1024,
            limits: FrameLimits::default(),
            rate_capacity: 20,
            rate_refill_per_sec: 10.0,
        }
    }
}

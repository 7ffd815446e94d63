//! Connection hub configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::HubError;

/// What `connect` does when a live connection already uses the client id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Close the existing connection, then register the new one.
    #[default]
    Replace,
    /// Refuse the new connection with `DuplicateId`.
    Reject,
}

/// Connection hub configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Outbound frame queue size per connection.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer_size: usize,
    /// Capacity of the control notification channel created by callers.
    #[serde(default = "default_control_buffer")]
    pub control_buffer_size: usize,
    /// Capacity of the inbound frame channel created by callers.
    #[serde(default = "default_inbound_buffer")]
    pub inbound_buffer_size: usize,
    /// Heartbeat ping interval in seconds (0 disables the heartbeat).
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
    /// Extra idle time tolerated after a missed ping, in seconds.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_seconds: u64,
    /// Maximum time a single frame write may take, in milliseconds.
    #[serde(default = "default_write_timeout")]
    pub write_timeout_ms: u64,
    /// Maximum time spent closing a transport, in milliseconds.
    #[serde(default = "default_close_timeout")]
    pub close_timeout_ms: u64,
    /// Maximum time `stop` waits for connection tasks, in seconds.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
    /// Maximum client identifier length in bytes.
    #[serde(default = "default_max_id_length")]
    pub max_id_length: usize,
    /// Duplicate client identifier policy.
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
}

impl HubConfig {
    /// Checks values that would make the hub unusable.
    pub fn validate(&self) -> Result<(), HubError> {
        if self.outbound_buffer_size == 0 {
            return Err(HubError::configuration("hub.outbound_buffer_size must be > 0"));
        }
        if self.control_buffer_size == 0 || self.inbound_buffer_size == 0 {
            return Err(HubError::configuration(
                "hub.control_buffer_size and hub.inbound_buffer_size must be > 0",
            ));
        }
        if self.max_id_length == 0 {
            return Err(HubError::configuration("hub.max_id_length must be > 0"));
        }
        Ok(())
    }

    /// Heartbeat interval, `None` when disabled.
    pub fn ping_interval(&self) -> Option<Duration> {
        (self.ping_interval_seconds > 0).then(|| Duration::from_secs(self.ping_interval_seconds))
    }

    /// Idle time after which a connection is considered dead.
    pub fn idle_limit(&self) -> Duration {
        Duration::from_secs(self.ping_interval_seconds.saturating_add(self.ping_timeout_seconds))
    }

    /// Per-frame write timeout.
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Transport close timeout.
    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }

    /// Shutdown grace period.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_seconds)
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            outbound_buffer_size: default_outbound_buffer(),
            control_buffer_size: default_control_buffer(),
            inbound_buffer_size: default_inbound_buffer(),
            ping_interval_seconds: default_ping_interval(),
            ping_timeout_seconds: default_ping_timeout(),
            write_timeout_ms: default_write_timeout(),
            close_timeout_ms: default_close_timeout(),
            shutdown_grace_seconds: default_shutdown_grace(),
            max_id_length: default_max_id_length(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_control_buffer() -> usize {
    1024
}

fn default_inbound_buffer() -> usize {
    1024
}

fn default_ping_interval() -> u64 {
    30
}

fn default_ping_timeout() -> u64 {
    10
}

fn default_write_timeout() -> u64 {
    5000
}

fn default_close_timeout() -> u64 {
    1000
}

fn default_shutdown_grace() -> u64 {
    10
}

fn default_max_id_length() -> usize {
    256
}

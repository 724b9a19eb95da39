use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::Result;

/// Listener dispatch settings
///
/// ```toml
/// [listener]
/// slow_listener_threshold_ms = 100
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ListenerConfig {
    /// A listener invocation taking longer than this is logged as slow.
    /// Slow listeners hold up the adapter's dispatch thread and therefore
    /// every later notification of that cache.
    ///
    /// `0` disables the check.
    ///
    /// **Default**: 100
    #[serde(default = "default_slow_listener_threshold_ms")]
    pub slow_listener_threshold_ms: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            slow_listener_threshold_ms: default_slow_listener_threshold_ms(),
        }
    }
}

impl ListenerConfig {
    pub fn slow_listener_threshold(&self) -> Option<Duration> {
        match self.slow_listener_threshold_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.slow_listener_threshold_ms > 60_000 {
            warn!(
                "listener.slow_listener_threshold_ms ({}) is above one minute; slow listeners will go unnoticed",
                self.slow_listener_threshold_ms
            );
        }
        Ok(())
    }
}

const fn default_slow_listener_threshold_ms() -> u64 {
    100
}

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Minimum stack size accepted for dispatch threads
const MIN_STACK_SIZE: usize = 64 * 1024;

/// Raw adapter dispatch thread settings
///
/// ```toml
/// [dispatch]
/// thread_name_prefix = "modeled-cache"
/// stack_size = 0
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DispatchConfig {
    /// Dispatch threads are named `{prefix}-node-{id}` / `{prefix}-children-{id}`
    #[serde(default = "default_thread_name_prefix")]
    pub thread_name_prefix: String,

    /// Stack size in bytes for dispatch threads, `0` keeps the platform default
    #[serde(default)]
    pub stack_size: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: default_thread_name_prefix(),
            stack_size: 0,
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.thread_name_prefix.is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "dispatch.thread_name_prefix must not be empty".into(),
            )));
        }
        if self.thread_name_prefix.contains('\0') {
            return Err(Error::Config(ConfigError::Message(
                "dispatch.thread_name_prefix must not contain NUL".into(),
            )));
        }
        if self.stack_size != 0 && self.stack_size < MIN_STACK_SIZE {
            return Err(Error::Config(ConfigError::Message(format!(
                "dispatch.stack_size ({}) must be 0 or at least {} bytes",
                self.stack_size, MIN_STACK_SIZE
            ))));
        }
        Ok(())
    }

    pub(crate) fn thread_builder(
        &self,
        kind: &str,
        id: u64,
    ) -> std::thread::Builder {
        let builder =
            std::thread::Builder::new().name(format!("{}-{kind}-{id}", self.thread_name_prefix));
        if self.stack_size > 0 {
            builder.stack_size(self.stack_size)
        } else {
            builder
        }
    }
}

fn default_thread_name_prefix() -> String {
    "modeled-cache".to_string()
}

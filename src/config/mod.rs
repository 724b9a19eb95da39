//! Configuration management for the modeled caches.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support (`CONFIG_PATH`)
//! - Environment variable overrides (`CACHE__` prefix, `__` separator)
//! - Component-wise validation
mod children;
mod dispatch;
mod listener;

pub use children::*;
pub use dispatch::*;
pub use listener::*;


use std::env;
use std::fmt::Debug;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Environment variable prefix for overrides, e.g. `CACHE__LISTENER__SLOW_LISTENER_THRESHOLD_MS`
pub(crate) const ENV_PREFIX: &str = "CACHE";

/// Main configuration container for the cache components
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct CacheConfig {
    /// Listener dispatch behaviour shared by every registry
    #[serde(default)]
    pub listener: ListenerConfig,

    /// Raw adapter dispatch threads
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Children cache specifics
    #[serde(default)]
    pub children: ChildrenConfig,
}

impl Debug for CacheConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("CacheConfig")
            .field("listener", &self.listener)
            .field("dispatch", &self.dispatch)
            .field("children", &self.children)
            .finish()
    }
}

impl CacheConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults
    /// 2. Configuration file from `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `CACHE__` prefix
    ///
    /// # Note
    /// Callers MUST call `validate()` before using the configuration.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("CACHE__CHILDREN__CACHE_DATA", "false");
    /// let cfg = CacheConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(environment());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional overrides from a file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates every subsystem and returns the validated instance.
    pub fn validate(self) -> Result<Self> {
        self.listener.validate()?;
        self.dispatch.validate()?;
        self.children.validate()?;
        Ok(self)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}

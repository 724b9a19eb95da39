use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Children cache settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChildrenConfig {
    /// Keep child payloads in the raw state. When false only stats are kept;
    /// events still carry the payload that triggered them.
    ///
    /// **Default**: true
    #[serde(default = "default_cache_data")]
    pub cache_data: bool,
}

impl Default for ChildrenConfig {
    fn default() -> Self {
        Self {
            cache_data: default_cache_data(),
        }
    }
}

impl ChildrenConfig {
    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}

const fn default_cache_data() -> bool {
    true
}

// src/config.rs
//! Group manager configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What the active renderer can do. Only affects which passes the forward
/// manager fills.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderCapabilities {
    pub shadow_mapping_supported: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupManagerConfig {
    /// Initial capacity of the group slab.
    pub group_pool_size: usize,
    /// Initial capacity reserved for render materials.
    pub material_pool_size: usize,
    /// How many destroyed groups are kept around for reuse.
    pub recycle_capacity: usize,
    /// Share one group between materials with identical content.
    pub deduplicate_groups: bool,
    pub capabilities: RenderCapabilities,
}

impl Default for GroupManagerConfig {
    fn default() -> Self {
        Self {
            group_pool_size: 100,
            material_pool_size: 150,
            recycle_capacity: 64,
            deduplicate_groups: true,
            capabilities: RenderCapabilities::default(),
        }
    }
}

impl GroupManagerConfig {
    /// Parse from JSON; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_shadows(mut self, supported: bool) -> Self {
        self.capabilities.shadow_mapping_supported = supported;
        self
    }
}

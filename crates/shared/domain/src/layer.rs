use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage tier a buffering layer lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Memory,
    Nvme,
    BurstBuffer,
    ParallelFs,
}

/// One buffering tier activated when the connector is registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerInfo {
    pub name: String,
    pub kind: LayerKind,
    pub capacity_bytes: u64,
    #[serde(default)]
    pub mount_point: Option<PathBuf>,
    #[serde(default)]
    pub bandwidth_mbps: Option<u32>,
}

impl LayerInfo {
    /// A RAM tier with the given capacity.
    #[must_use]
    pub fn memory(name: impl Into<String>, capacity_bytes: u64) -> Self {
        Self {
            name: name.into(),
            kind: LayerKind::Memory,
            capacity_bytes,
            mount_point: None,
            bandwidth_mbps: None,
        }
    }

    /// A tier backed by a mounted device or filesystem.
    #[must_use]
    pub fn mounted(
        name: impl Into<String>,
        kind: LayerKind,
        capacity_bytes: u64,
        mount_point: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            capacity_bytes,
            mount_point: Some(mount_point.into()),
            bandwidth_mbps: None,
        }
    }

    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self.kind, LayerKind::Memory)
    }
}

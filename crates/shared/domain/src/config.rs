use crate::layer::LayerInfo;
use serde::Deserialize;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Capacity of the memory layer used when no layers are configured.
pub const DEFAULT_MEMORY_LAYER_BYTES: u64 = 256 * 1024 * 1024;

/// Top-level configuration shared by the connector, the buffering layers and logging.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StratumConfigInner {
    pub connector: ConnectorSettings,
    pub layers: Vec<LayerInfo>,
    pub logging: LoggingConfig,
}

/// Thin Arc-wrapped config for inexpensive cloning into subsystems.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct StratumConfig {
    #[serde(flatten, default)]
    inner: Arc<StratumConfigInner>,
}

impl Deref for StratumConfig {
    type Target = StratumConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for StratumConfig {
    fn deref_mut(&mut self) -> &mut StratumConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// Connector behaviour knobs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectorSettings {
    /// Flush staged data to the native file when a dataset handle is closed.
    pub sync_on_close: bool,
    pub open_flags: OpenFlagsPolicy,
    pub sync_failure: SyncFailurePolicy,
}

/// How file-open flags are forwarded to the native backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenFlagsPolicy {
    /// Pass the caller's flags through unchanged.
    #[default]
    Honor,
    /// Always open with truncate semantics, discarding existing contents.
    ForceTruncate,
}

/// What to do when the flush on dataset close fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncFailurePolicy {
    /// Log the failure and report a successful close.
    #[default]
    Warn,
    /// Finish the close, then report the failure to the caller.
    Surface,
}

/// Tracing subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    /// Directory for rolling log files; console only when absent.
    pub directory: Option<PathBuf>,
    /// Full `EnvFilter` directive overriding `level`.
    pub env_filter: Option<String>,
}

// --- Default ---

impl Default for StratumConfigInner {
    fn default() -> Self {
        Self {
            connector: ConnectorSettings::default(),
            layers: vec![LayerInfo::memory("ram", DEFAULT_MEMORY_LAYER_BYTES)],
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            sync_on_close: true,
            open_flags: OpenFlagsPolicy::Honor,
            sync_failure: SyncFailurePolicy::Warn,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_owned(), json: false, directory: None, env_filter: None }
    }
}

use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use stratum_domain::config::StratumConfig;
use tracing::info;

/// Prefix of environment overrides, e.g. `STRATUM__CONNECTOR__SYNC_ON_CLOSE=false`.
pub const ENV_PREFIX: &str = "STRATUM";

/// File stem looked up when no explicit path is given (`stratum.toml`, `stratum.json`, ...).
pub const DEFAULT_CONFIG_STEM: &str = "stratum";

/// Custom error type for config loading.
#[stratum_derive::stratum_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// A reusable configuration loader that combines file-based settings with environment overrides.
///
/// Layers, lowest priority first:
/// 1. **Base File**: an explicit `path` must exist. Without one, a `stratum.*` file in the
///    working directory is used when present and skipped otherwise.
/// 2. **Environment Overrides**: variables prefixed with `STRATUM__`, nested with double
///    underscores (`STRATUM__LOGGING__LEVEL` maps to `logging.level`).
///
/// # Errors
/// * The explicit file cannot be found or parsed.
/// * The merged sources do not match the structure of `T`.
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    load_config_with_env(path, None)
}

/// Same as [`load_config`], reading overrides from `env` instead of the process environment
/// when given. Keys keep their `STRATUM__` form.
pub fn load_config_with_env<T>(
    path: Option<impl AsRef<Path>>,
    env: Option<HashMap<String, String>>,
) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let (effective_path, required) = path.map_or_else(
        || (PathBuf::from(DEFAULT_CONFIG_STEM), false),
        |p| (p.as_ref().to_path_buf(), true),
    );

    let builder = Config::builder()
        .add_source(File::from(effective_path.as_path()).required(required))
        .add_source(
            Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true).source(env),
        );

    info!(path = %effective_path.display(), required, "Loading config");

    let config = builder
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}

/// Loads the full [`StratumConfig`]; fields missing from every source keep their defaults.
pub fn load_stratum_config(path: Option<impl AsRef<Path>>) -> Result<StratumConfig, ConfigError> {
    load_config::<StratumConfig>(path)
}

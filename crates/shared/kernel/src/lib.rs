//! Kernel utilities shared across crates.
//! Keep this crate lightweight; it re-exports the domain models and owns configuration loading.
//!
//! ## Config loading
//! ```rust,no_run
//! use stratum_kernel::config::load_stratum_config;
//!
//! let cfg = load_stratum_config(Some("stratum.toml")).unwrap_or_default();
//! assert!(!cfg.layers.is_empty());
//! ```
pub mod config;

pub use stratum_domain as domain;

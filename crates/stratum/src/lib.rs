//! Facade crate for Stratum.
//! Re-exports the connector together with the buffering, native and shared crates it composes.
//! Keep this crate thin: it should compose other crates, not implement connector logic.
//!
//! ## Usage
//! - Add `stratum` and pull what you need through [`prelude`].
//! - Disable the `logger` feature when the host application installs its own subscriber.

pub use stratum_buffer as buffer;
pub use stratum_connector as connector;
pub use stratum_domain as domain;
pub use stratum_kernel as kernel;
#[cfg(feature = "logger")]
pub use stratum_logger as logger;
pub use stratum_native as native;

/// The types a typical host touches: registration, handles, selections and the reference
/// backends.
pub mod prelude {
    pub use stratum_buffer::{BufferStats, BufferingInterface, MemoryBuffer};
    pub use stratum_connector::{
        AccessConfig, Connector, Dataset, DatasetInfo, DatasetQuery, Selection, VolError,
    };
    pub use stratum_domain::config::StratumConfig;
    pub use stratum_domain::{AccessFlags, ElementType, LayerInfo, PlistId};
    pub use stratum_native::{MemoryNative, NativeBackend};
}

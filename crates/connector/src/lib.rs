//! # Stratum connector
//!
//! An interception layer between an application's storage-library calls and the library's native
//! backend. File and dataset lifecycle calls are forwarded to the native backend for metadata;
//! array reads and writes are redirected through a [`stratum_buffer::BufferingInterface`].
//!
//! ## Lifecycle
//! 1. [`Connector::builder`] registers the connector, pushing at least one buffering layer.
//! 2. [`Connector::set_fapl`] attaches it to a file access configuration.
//! 3. Files and datasets are created or opened through that configuration; each dataset is
//!    announced to the buffering subsystem (`init`) before it is handed out.
//! 4. Closing a dataset syncs it with the extent current at close time.
//! 5. Releasing the last access configuration (or [`Connector::shutdown`]) unregisters the
//!    connector and cleans the buffering subsystem, exactly once.
//!
//! ## Example
//!
//! ```rust
//! use stratum_buffer::MemoryBuffer;
//! use stratum_connector::{Connector, Selection};
//! use stratum_domain::{AccessFlags, ElementType, LayerInfo, PlistId};
//! use stratum_native::MemoryNative;
//!
//! let native = MemoryNative::new();
//! let connector = Connector::builder()
//!     .native(native.clone())
//!     .buffering(MemoryBuffer::new())
//!     .layers([LayerInfo::memory("ram", 1 << 20)])
//!     .register()?;
//!
//! let mut access = connector.set_fapl(native.create_fapl())?;
//! connector.file_create(&mut access, "sample.dat", AccessFlags::TRUNCATE, PlistId::DEFAULT)?;
//!
//! let space = native.create_simple_space(&[4, 6], None)?;
//! let dcpl = native.create_dcpl(ElementType::Int32, space)?;
//! let grid = connector.dataset_create(&access, "grid", dcpl, PlistId::DEFAULT)?;
//!
//! let data: Vec<u8> = (0..24i32).flat_map(i32::to_ne_bytes).collect();
//! let (all, dxpl) = (Selection::All, PlistId::DEFAULT);
//! connector.dataset_write(&grid, ElementType::Int32, all, all, dxpl, &data)?;
//!
//! connector.dataset_close(grid)?;
//! connector.file_close(&mut access)?;
//! connector.release_access(access)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod connector;
mod dataset;
mod dispatch;
mod error;
mod file;
mod record;
mod selection;

pub use connector::{CONNECTOR_NAME, Connector, ConnectorBuilder, ConnectorInner, LifecycleState};
pub use dataset::{Dataset, DatasetInfo, DatasetQuery};
pub use dispatch::{Capabilities, Operation, Request, Response};
pub use error::{VolError, VolErrorExt};
pub use record::{AccessConfig, HandleRecord};
pub use selection::{ResolvedSelection, Selection, SelectionShape, resolve};

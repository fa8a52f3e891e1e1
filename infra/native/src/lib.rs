//! # Native backend
//!
//! The contract between the connector and the storage library it wraps, plus [`MemoryNative`],
//! an in-memory implementation used by tests, benches and the demo.
//!
//! ```rust
//! use stratum_domain::{AccessFlags, ElementType, PlistId};
//! use stratum_native::{MemoryNative, NativeBackend};
//!
//! let native = MemoryNative::new();
//! let file = native.file_create("sample.dat", AccessFlags::TRUNCATE, PlistId::DEFAULT, PlistId::DEFAULT)?;
//! let space = native.create_simple_space(&[4, 6], None)?;
//! let dcpl = native.create_dcpl(ElementType::Int32, space)?;
//!
//! let element = native.dcpl_type(dcpl)?;
//! let dset = native.dataset_create(file, "grid", element, space, dcpl, PlistId::DEFAULT)?;
//!
//! let dspace = native.dataset_space(dset)?;
//! let rank = native.space_rank(dspace)?;
//! assert_eq!(native.space_extents(dspace, rank)?.current(), &[4, 6]);
//! # Ok::<(), stratum_native::NativeError>(())
//! ```

mod backend;
mod error;
mod memory;
mod plist;
mod space;

pub use backend::{NATIVE_DRIVER_NAME, NativeBackend, SpaceStatus};
pub use error::{NativeError, NativeErrorExt};
pub use memory::{MemoryNative, MemoryNativeInner};
pub use plist::PlistClass;

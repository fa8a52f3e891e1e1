//! # Buffering subsystem
//!
//! [`BufferingInterface`] is the contract the connector drives: layers are activated once,
//! datasets are announced with `init`, transfers flow through `read`/`write`, and `sync` flushes
//! a dataset when its handle closes.
//!
//! [`MemoryBuffer`] stages every dataset in RAM, bounded by the capacity of the memory layers.
//!
//! ```rust
//! use stratum_buffer::{BufferingInterface, MemoryBuffer, Transfer};
//! use stratum_domain::{DatasetKey, ElementType, Extents, FileRegion, LayerInfo, MemoryRegion, ObjectId};
//!
//! let buffer = MemoryBuffer::new();
//! buffer.update_layers(&[LayerInfo::memory("ram", 1 << 20)])?;
//!
//! let key = DatasetKey::from_path("/data/sample.dat", "/grid");
//! buffer.init(&key, ElementType::UInt8, &Extents::fixed(vec![2, 2]), ObjectId::new(3))?;
//!
//! let transfer = Transfer {
//!     rank: 2,
//!     element: ElementType::UInt8,
//!     file: FileRegion::whole(&[2, 2]),
//!     memory: MemoryRegion::dense(vec![2, 2]),
//!     dataset: ObjectId::new(3),
//! };
//! buffer.write(&key, &transfer, &[1, 2, 3, 4])?;
//!
//! let mut out = [0u8; 4];
//! buffer.read(&key, &transfer, &mut out)?;
//! assert_eq!(out, [1, 2, 3, 4]);
//! # Ok::<(), stratum_buffer::BufferError>(())
//! ```

mod error;
mod interface;
mod layout;
mod memory;

pub use error::{BufferError, BufferErrorExt};
pub use interface::{BufferingInterface, Transfer};
pub use memory::{BufferStats, MemoryBuffer, MemoryBufferInner};

//! # Domain Models
//!
//! This crate contains pure domain types with minimal dependencies (`serde`, `bitflags`).
//! Keep it lean: no I/O or backend logic, just handles, shapes, regions and configuration.

pub mod config;
pub mod element;
pub mod extent;
pub mod flags;
pub mod ids;
pub mod key;
pub mod layer;
pub mod region;

pub use element::ElementType;
pub use extent::{Extents, UNLIMITED};
pub use flags::AccessFlags;
pub use ids::{ConnectorId, ObjectId, PlistId, SpaceId};
pub use key::DatasetKey;
pub use layer::{LayerInfo, LayerKind};
pub use region::{FileRegion, Hyperslab, MemoryRegion};

//! Turns the dataspaces handed to a read or write into file and memory regions.
//!
//! Introspection ([`SelectionShape::query`]) and resolution ([`resolve`]) are separate so the
//! region arithmetic stays a pure function of its inputs.

use crate::error::VolError;
use serde::{Deserialize, Serialize};
use stratum_domain::{FileRegion, Hyperslab, MemoryRegion, SpaceId};
use stratum_native::{NativeBackend, NativeError};
use tracing::warn;

/// A dataspace argument of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Selection {
    /// No dataspace: the whole dataset on the file side, a dense buffer on the memory side.
    #[default]
    All,
    Explicit(SpaceId),
}

/// What the resolver needs to know about an explicit dataspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionShape {
    pub rank: usize,
    /// Current dimensions of the dataspace.
    pub extent: Vec<u64>,
    /// Bounding box of the selection, `None` when nothing is selected.
    pub bounds: Option<Hyperslab>,
}

impl SelectionShape {
    /// Reads rank, then extents for that rank, then the selection bounds.
    pub fn query(native: &dyn NativeBackend, space: SpaceId) -> Result<Self, NativeError> {
        let rank = native.space_rank(space)?;
        let extent = native.space_extents(space, rank)?.current().to_vec();
        let bounds = native.space_selection_bounds(space)?;
        Ok(Self { rank, extent, bounds })
    }

    fn validate(&self, side: &'static str) -> Result<(), VolError> {
        if self.extent.len() != self.rank {
            return Err(VolError::InvalidSelection {
                message: format!("rank {} with {} dimensions", self.rank, self.extent.len()).into(),
                context: Some(side.into()),
            });
        }
        if let Some(bounds) = self.bounds.as_ref().filter(|b| b.rank() != self.rank) {
            return Err(VolError::InvalidSelection {
                message: format!("rank {} selection in rank {} dataspace", bounds.rank(), self.rank)
                    .into(),
                context: Some(side.into()),
            });
        }
        Ok(())
    }
}

/// File and memory regions of one transfer. The ranks of the two sides are independent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSelection {
    pub file: FileRegion,
    pub memory: MemoryRegion,
}

impl ResolvedSelection {
    #[must_use]
    pub fn file_rank(&self) -> usize {
        self.file.rank()
    }

    #[must_use]
    pub fn memory_rank(&self) -> usize {
        self.memory.rank()
    }
}

/// Resolves a transfer's regions.
///
/// * file side: the explicit selection's bounding box, or the whole current `dataset_extent`;
///   nothing selected or a zero-sized dimension gives [`FileRegion::Empty`].
/// * memory side: the explicit selection's start inside its dataspace dimensions, or a dense
///   buffer at the origin shaped like the file region.
pub fn resolve(
    memory: Option<&SelectionShape>,
    file: Option<&SelectionShape>,
    dataset_extent: &[u64],
) -> Result<ResolvedSelection, VolError> {
    let file = match file {
        None => FileRegion::whole(dataset_extent),
        Some(shape) => {
            shape.validate("file selection")?;
            match &shape.bounds {
                Some(bounds) if !shape.extent.contains(&0) => FileRegion::Bounded(bounds.clone()),
                _ => FileRegion::Empty { rank: shape.rank },
            }
        }
    };

    let memory = match memory {
        None => MemoryRegion::dense(file.shape()),
        Some(shape) => {
            shape.validate("memory selection")?;
            let start =
                shape.bounds.as_ref().map_or_else(|| vec![0; shape.rank], |b| b.start().to_vec());
            MemoryRegion::new(start, shape.extent.clone()).ok_or_else(|| {
                VolError::InvalidSelection {
                    message: "memory start does not match the dataspace rank".into(),
                    context: None,
                }
            })?
        }
    };

    Ok(ResolvedSelection { file, memory })
}

/// Closes a dataspace the connector obtained from the native backend when dropped.
pub(crate) struct SpaceGuard<'a> {
    native: &'a dyn NativeBackend,
    space: SpaceId,
}

impl<'a> SpaceGuard<'a> {
    pub(crate) const fn new(native: &'a dyn NativeBackend, space: SpaceId) -> Self {
        Self { native, space }
    }

    pub(crate) const fn id(&self) -> SpaceId {
        self.space
    }
}

impl Drop for SpaceGuard<'_> {
    fn drop(&mut self) {
        if let Err(error) = self.native.space_close(self.space) {
            warn!(space = %self.space, %error, "Failed to close dataspace");
        }
    }
}

impl std::fmt::Debug for SpaceGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpaceGuard").field("space", &self.space).finish_non_exhaustive()
    }
}

use crate::error::BufferError;
use serde::{Deserialize, Serialize};
use stratum_domain::{DatasetKey, ElementType, Extents, FileRegion, LayerInfo, MemoryRegion, ObjectId};

/// Everything the buffering subsystem needs to move one region of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Rank of the file-side region; the memory side carries its own.
    pub rank: usize,
    pub element: ElementType,
    pub file: FileRegion,
    pub memory: MemoryRegion,
    pub dataset: ObjectId,
}

impl Transfer {
    /// Bytes the caller's buffer must hold to describe the memory side.
    #[must_use]
    pub fn memory_bytes(&self) -> u64 {
        self.memory.element_count().saturating_mul(self.element.size() as u64)
    }
}

/// Entry points of the external buffering subsystem.
///
/// Datasets are announced with [`BufferingInterface::init`] before any transfer touches them and
/// flushed with [`BufferingInterface::sync`]. [`BufferingInterface::clean`] tears the whole
/// subsystem down and is called once per connector lifetime.
pub trait BufferingInterface: Send + Sync {
    /// Activates the buffering tiers; called once at connector registration.
    fn update_layers(&self, layers: &[LayerInfo]) -> Result<(), BufferError>;

    fn init(
        &self,
        key: &DatasetKey,
        element: ElementType,
        extents: &Extents,
        dataset: ObjectId,
    ) -> Result<(), BufferError>;

    /// Fills `out`, laid out as `transfer.memory`, from the file region.
    fn read(&self, key: &DatasetKey, transfer: &Transfer, out: &mut [u8]) -> Result<(), BufferError>;

    /// Stores `data`, laid out as `transfer.memory`, into the file region.
    fn write(&self, key: &DatasetKey, transfer: &Transfer, data: &[u8]) -> Result<(), BufferError>;

    /// Flushes staged state for a dataset whose current shape is `extents`.
    fn sync(&self, key: &DatasetKey, extents: &Extents, dataset: ObjectId) -> Result<(), BufferError>;

    fn clean(&self);
}

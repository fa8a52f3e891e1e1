//! In-memory staging buffer.
//!
//! Every initialized dataset is staged as one dense row-major byte vector sized to its current
//! extent. Transfers copy hyperslabs between that vector and caller buffers; `sync` reshapes the
//! staged bytes to the extent reported at close time and marks them clean.

use crate::error::BufferError;
use crate::interface::{BufferingInterface, Transfer};
use crate::layout::{Run, block_runs, copy_runs, ravel_indices};
use fxhash::FxHashMap;
use parking_lot::RwLock;
use serde::Serialize;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use stratum_domain::{DatasetKey, ElementType, Extents, LayerInfo, ObjectId};
use tracing::{debug, info, instrument, trace};

#[derive(Debug)]
struct Staged {
    element: ElementType,
    extents: Extents,
    data: Vec<u8>,
    dataset: ObjectId,
    dirty: bool,
}

#[derive(Debug, Default)]
struct Counters {
    reads: AtomicU64,
    writes: AtomicU64,
    syncs: AtomicU64,
    cleans: AtomicU64,
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
}

/// Snapshot of the staging buffer's occupancy and traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BufferStats {
    pub datasets: usize,
    pub dirty: usize,
    pub staged_bytes: u64,
    pub capacity_bytes: u64,
    pub reads: u64,
    pub writes: u64,
    pub syncs: u64,
    pub cleans: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
}

/// The internal shared state of a [`MemoryBuffer`] instance.
#[derive(Debug, Default)]
pub struct MemoryBufferInner {
    layers: RwLock<Vec<LayerInfo>>,
    staged: RwLock<FxHashMap<DatasetKey, Staged>>,
    counters: Counters,
}

/// Thread-safe staging buffer backed by the memory tiers of the activated layers.
///
/// Capacity is the sum of the memory-tier capacities; other tiers are accepted and recorded
/// but never staged into.
#[derive(Debug, Clone, Default)]
pub struct MemoryBuffer {
    inner: Arc<MemoryBufferInner>,
}

impl Deref for MemoryBuffer {
    type Target = MemoryBufferInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl MemoryBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes available for staging.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        memory_capacity(&self.layers.read())
    }

    /// Layers activated by the last `update_layers`.
    #[must_use]
    pub fn layers(&self) -> Vec<LayerInfo> {
        self.layers.read().clone()
    }

    /// Shape of a staged dataset.
    #[must_use]
    pub fn staged_extents(&self, key: &DatasetKey) -> Option<Extents> {
        self.staged.read().get(key).map(|staged| staged.extents.clone())
    }

    /// Native dataset handle the staged bytes were last bound to.
    #[must_use]
    pub fn staged_dataset(&self, key: &DatasetKey) -> Option<ObjectId> {
        self.staged.read().get(key).map(|staged| staged.dataset)
    }

    /// `Some(true)` when a staged dataset holds writes not yet synced.
    #[must_use]
    pub fn is_dirty(&self, key: &DatasetKey) -> Option<bool> {
        self.staged.read().get(key).map(|staged| staged.dirty)
    }

    #[must_use]
    pub fn stats(&self) -> BufferStats {
        let staged = self.staged.read();
        BufferStats {
            datasets: staged.len(),
            dirty: staged.values().filter(|s| s.dirty).count(),
            staged_bytes: staged.values().map(|s| s.data.len() as u64).sum(),
            capacity_bytes: self.capacity(),
            reads: self.counters.reads.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
            syncs: self.counters.syncs.load(Ordering::Relaxed),
            cleans: self.counters.cleans.load(Ordering::Relaxed),
            bytes_read: self.counters.bytes_read.load(Ordering::Relaxed),
            bytes_written: self.counters.bytes_written.load(Ordering::Relaxed),
        }
    }

    /// Fails when growing the staged total by `additional` bytes would exceed capacity.
    fn reserve(
        &self,
        staged: &FxHashMap<DatasetKey, Staged>,
        key: &DatasetKey,
        additional: u64,
    ) -> Result<(), BufferError> {
        let in_use: u64 = staged.values().map(|s| s.data.len() as u64).sum();
        let capacity = self.capacity();
        if in_use.saturating_add(additional) > capacity {
            return Err(BufferError::CapacityExceeded {
                message: format!("{in_use} + {additional} bytes > {capacity} bytes").into(),
                context: Some(format!("staging {key}").into()),
            });
        }
        Ok(())
    }
}

impl BufferingInterface for MemoryBuffer {
    fn update_layers(&self, layers: &[LayerInfo]) -> Result<(), BufferError> {
        if layers.is_empty() {
            return Err(BufferError::InvalidConfiguration {
                message: "at least one layer must be defined".into(),
                context: None,
            });
        }
        for layer in layers {
            if layer.capacity_bytes == 0 {
                return Err(BufferError::InvalidConfiguration {
                    message: format!("layer {} has zero capacity", layer.name).into(),
                    context: None,
                });
            }
            if !layer.is_memory() && layer.mount_point.is_none() {
                return Err(BufferError::InvalidConfiguration {
                    message: format!("{:?} layer {} needs a mount point", layer.kind, layer.name)
                        .into(),
                    context: None,
                });
            }
        }
        let capacity = memory_capacity(layers);
        if capacity == 0 {
            return Err(BufferError::InvalidConfiguration {
                message: "no memory layer to stage into".into(),
                context: None,
            });
        }

        for layer in layers.iter().filter(|l| !l.is_memory()) {
            debug!(layer = %layer.name, kind = ?layer.kind, "Tier recorded, staging stays in memory");
        }
        *self.layers.write() = layers.to_vec();
        info!(layers = layers.len(), capacity_bytes = capacity, "Buffering layers activated");
        Ok(())
    }

    #[instrument(level = "debug", skip(self, extents), fields(extent = ?extents.current()))]
    fn init(
        &self,
        key: &DatasetKey,
        element: ElementType,
        extents: &Extents,
        dataset: ObjectId,
    ) -> Result<(), BufferError> {
        if self.layers.read().is_empty() {
            return Err(BufferError::InvalidConfiguration {
                message: "no layers activated".into(),
                context: Some(format!("initializing {key}").into()),
            });
        }
        let bytes = staged_bytes(element, extents.current())?;

        let mut staged = self.staged.write();
        if let Some(existing) = staged.get(key) {
            if existing.element != element {
                return Err(BufferError::TypeMismatch {
                    message: format!("staged as {}, initialized as {element}", existing.element)
                        .into(),
                    context: Some(format!("initializing {key}").into()),
                });
            }
            let grow = bytes.saturating_sub(existing.data.len() as u64);
            self.reserve(&staged, key, grow)?;
            let Some(existing) = staged.get_mut(key) else {
                return Err(not_staged(key));
            };
            reshape(existing, extents)?;
            existing.dataset = dataset;
            debug!(%key, "Dataset already staged, reusing");
            return Ok(());
        }

        self.reserve(&staged, key, bytes)?;
        staged.insert(
            key.clone(),
            Staged {
                element,
                extents: extents.clone(),
                data: vec![0; to_usize(bytes)?],
                dataset,
                dirty: false,
            },
        );
        debug!(%key, bytes, "Dataset staged");
        Ok(())
    }

    fn read(&self, key: &DatasetKey, transfer: &Transfer, out: &mut [u8]) -> Result<(), BufferError> {
        let staged = self.staged.read();
        let entry = lookup(&staged, key, transfer.element)?;
        let Some((file_runs, memory_runs)) = plan(entry.extents.current(), transfer)? else {
            return Ok(());
        };
        check_len(out.len(), transfer)?;

        copy_runs(&file_runs, &entry.data, &memory_runs, out, transfer.element.size());

        let bytes = transfer.file.element_count() * transfer.element.size() as u64;
        self.counters.reads.fetch_add(1, Ordering::Relaxed);
        self.counters.bytes_read.fetch_add(bytes, Ordering::Relaxed);
        trace!(%key, bytes, "Read served from staging");
        Ok(())
    }

    fn write(&self, key: &DatasetKey, transfer: &Transfer, data: &[u8]) -> Result<(), BufferError> {
        let mut staged = self.staged.write();
        let Some(entry) = staged.get_mut(key) else {
            return Err(not_staged(key));
        };
        check_element(entry, key, transfer.element)?;
        let Some((file_runs, memory_runs)) = plan(entry.extents.current(), transfer)? else {
            return Ok(());
        };
        check_len(data.len(), transfer)?;

        copy_runs(&memory_runs, data, &file_runs, &mut entry.data, transfer.element.size());
        entry.dirty = true;

        let bytes = transfer.file.element_count() * transfer.element.size() as u64;
        self.counters.writes.fetch_add(1, Ordering::Relaxed);
        self.counters.bytes_written.fetch_add(bytes, Ordering::Relaxed);
        trace!(%key, bytes, "Write staged");
        Ok(())
    }

    #[instrument(level = "debug", skip(self, extents), fields(extent = ?extents.current()))]
    fn sync(&self, key: &DatasetKey, extents: &Extents, dataset: ObjectId) -> Result<(), BufferError> {
        let mut staged = self.staged.write();
        let Some(entry) = staged.get(key) else {
            return Err(not_staged(key));
        };
        let bytes = staged_bytes(entry.element, extents.current())?;
        let grow = bytes.saturating_sub(entry.data.len() as u64);
        self.reserve(&staged, key, grow)?;

        let Some(entry) = staged.get_mut(key) else {
            return Err(not_staged(key));
        };
        reshape(entry, extents)?;
        entry.dataset = dataset;
        entry.dirty = false;

        self.counters.syncs.fetch_add(1, Ordering::Relaxed);
        debug!(%key, "Dataset synced");
        Ok(())
    }

    fn clean(&self) {
        let dropped = {
            let mut staged = self.staged.write();
            let count = staged.len();
            staged.clear();
            count
        };
        self.layers.write().clear();
        self.counters.cleans.fetch_add(1, Ordering::Relaxed);
        info!(datasets = dropped, "Buffering subsystem cleaned");
    }
}

fn memory_capacity(layers: &[LayerInfo]) -> u64 {
    layers.iter().filter(|l| l.is_memory()).map(|l| l.capacity_bytes).fold(0, u64::saturating_add)
}

fn staged_bytes(element: ElementType, dims: &[u64]) -> Result<u64, BufferError> {
    dims.iter()
        .try_fold(element.size() as u64, |acc, &dim| acc.checked_mul(dim))
        .ok_or_else(|| BufferError::CapacityExceeded {
            message: format!("extent {dims:?} of {element} overflows").into(),
            context: None,
        })
}

fn to_usize(bytes: u64) -> Result<usize, BufferError> {
    usize::try_from(bytes).map_err(|_| BufferError::CapacityExceeded {
        message: format!("{bytes} bytes do not fit in memory").into(),
        context: None,
    })
}

fn not_staged(key: &DatasetKey) -> BufferError {
    BufferError::NotInitialized { message: key.to_string().into(), context: None }
}

fn lookup<'a>(
    staged: &'a FxHashMap<DatasetKey, Staged>,
    key: &DatasetKey,
    element: ElementType,
) -> Result<&'a Staged, BufferError> {
    let entry = staged.get(key).ok_or_else(|| not_staged(key))?;
    check_element(entry, key, element)?;
    Ok(entry)
}

fn check_element(entry: &Staged, key: &DatasetKey, element: ElementType) -> Result<(), BufferError> {
    if entry.element == element {
        return Ok(());
    }
    Err(BufferError::TypeMismatch {
        message: format!("staged as {}, transfer uses {element}", entry.element).into(),
        context: Some(key.to_string().into()),
    })
}

fn check_len(len: usize, transfer: &Transfer) -> Result<(), BufferError> {
    let needed = transfer.memory_bytes();
    if (len as u64) < needed {
        return Err(BufferError::OutOfBounds {
            message: format!("caller buffer holds {len} bytes, memory region needs {needed}").into(),
            context: None,
        });
    }
    Ok(())
}

/// Run lists for both sides of a transfer, `None` when the file region is empty.
///
/// A memory region of the file region's rank receives the block at its own `start`. A memory
/// region of another rank is filled linearly from the element at its `start`.
fn plan(extent: &[u64], transfer: &Transfer) -> Result<Option<(Vec<Run>, Vec<Run>)>, BufferError> {
    let Some(slab) = transfer.file.as_hyperslab() else {
        return Ok(None);
    };
    if !slab.fits(extent) {
        return Err(BufferError::OutOfBounds {
            message: format!("file region {:?}..={:?} outside extent {extent:?}", slab.start(), slab.end())
                .into(),
            context: None,
        });
    }
    let count = slab.count();
    let file_runs =
        block_runs(slab.start(), &count, extent).ok_or_else(|| unaddressable(extent))?;

    let memory = &transfer.memory;
    let memory_runs = if memory.rank() == slab.rank() {
        let fits = memory
            .start()
            .iter()
            .zip(&count)
            .zip(memory.extent())
            .all(|((s, c), dim)| s.saturating_add(*c) <= *dim);
        if !fits {
            return Err(BufferError::OutOfBounds {
                message: format!(
                    "block {count:?} at memory start {:?} outside memory extent {:?}",
                    memory.start(),
                    memory.extent()
                )
                .into(),
                context: None,
            });
        }
        block_runs(memory.start(), &count, memory.extent())
            .ok_or_else(|| unaddressable(memory.extent()))?
    } else {
        let len = slab.element_count();
        let inside = memory.start().iter().zip(memory.extent()).all(|(s, dim)| s < dim);
        let base = ravel_indices(memory.start(), memory.extent())
            .ok_or_else(|| unaddressable(memory.extent()))?;
        if !inside || base.saturating_add(len) > memory.element_count() {
            return Err(BufferError::OutOfBounds {
                message: format!(
                    "{len} elements from memory start {:?} overflow memory extent {:?}",
                    memory.start(),
                    memory.extent()
                )
                .into(),
                context: None,
            });
        }
        vec![Run { offset: base, len }]
    };

    Ok(Some((file_runs, memory_runs)))
}

fn unaddressable(shape: &[u64]) -> BufferError {
    BufferError::OutOfBounds {
        message: format!("element offsets inside {shape:?} do not fit in 64 bits").into(),
        context: None,
    }
}

/// Resizes staged bytes to `extents`, keeping the overlapping block in place.
fn reshape(entry: &mut Staged, extents: &Extents) -> Result<(), BufferError> {
    let old = entry.extents.current();
    let new = extents.current();
    if old == new {
        entry.extents = extents.clone();
        return Ok(());
    }
    if old.len() != new.len() {
        return Err(BufferError::OutOfBounds {
            message: format!("rank changed from {} to {}", old.len(), new.len()).into(),
            context: None,
        });
    }

    let size = entry.element.size();
    let mut data = vec![0u8; to_usize(staged_bytes(entry.element, new)?)?];
    let overlap: Vec<u64> = old.iter().zip(new).map(|(a, b)| *a.min(b)).collect();
    let origin = vec![0u64; overlap.len()];
    let (Some(from), Some(to)) =
        (block_runs(&origin, &overlap, old), block_runs(&origin, &overlap, new))
    else {
        return Err(unaddressable(new));
    };
    copy_runs(&from, &entry.data, &to, &mut data, size);

    trace!(from = ?old, to = ?new, "Staged dataset reshaped");
    entry.data = data;
    entry.extents = extents.clone();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_domain::{FileRegion, Hyperslab, MemoryRegion};

    fn buffer(capacity: u64) -> MemoryBuffer {
        let buffer = MemoryBuffer::new();
        buffer.update_layers(&[LayerInfo::memory("ram", capacity)]).unwrap();
        buffer
    }

    fn key() -> DatasetKey {
        DatasetKey::from_path("sample.dat", "/grid")
    }

    #[test]
    fn test_reshape_keeps_overlap() {
        let buffer = buffer(1024);
        let ext = Extents::new(vec![2, 2], vec![4, 4]).unwrap();
        buffer.init(&key(), ElementType::UInt8, &ext, ObjectId::new(9)).unwrap();

        let transfer = Transfer {
            rank: 2,
            element: ElementType::UInt8,
            file: FileRegion::whole(&[2, 2]),
            memory: MemoryRegion::dense(vec![2, 2]),
            dataset: ObjectId::new(9),
        };
        buffer.write(&key(), &transfer, &[1, 2, 3, 4]).unwrap();

        let grown = ext.resized(&[3, 3]).unwrap();
        buffer.sync(&key(), &grown, ObjectId::new(9)).unwrap();

        let mut out = [0u8; 9];
        let read = Transfer {
            file: FileRegion::whole(&[3, 3]),
            memory: MemoryRegion::dense(vec![3, 3]),
            ..transfer
        };
        buffer.read(&key(), &read, &mut out).unwrap();
        assert_eq!(out, [1, 2, 0, 3, 4, 0, 0, 0, 0]);
    }

    #[test]
    fn test_capacity_is_enforced() {
        let buffer = buffer(64);
        let err = buffer
            .init(&key(), ElementType::Float64, &Extents::fixed(vec![3, 3]), ObjectId::new(1))
            .unwrap_err();
        assert!(matches!(err, BufferError::CapacityExceeded { .. }));
    }

    #[test]
    fn test_linear_memory_side() {
        let buffer = buffer(1024);
        buffer.init(&key(), ElementType::UInt8, &Extents::fixed(vec![2, 3]), ObjectId::new(1)).unwrap();

        let transfer = Transfer {
            rank: 2,
            element: ElementType::UInt8,
            file: FileRegion::Bounded(Hyperslab::new(vec![1, 0], vec![1, 2]).unwrap()),
            memory: MemoryRegion::new(vec![2], vec![5]).unwrap(),
            dataset: ObjectId::new(1),
        };
        buffer.write(&key(), &transfer, &[0, 0, 7, 8, 9]).unwrap();

        let mut out = [0u8; 6];
        let whole = Transfer {
            file: FileRegion::whole(&[2, 3]),
            memory: MemoryRegion::dense(vec![2, 3]),
            ..transfer
        };
        buffer.read(&key(), &whole, &mut out).unwrap();
        assert_eq!(out, [0, 0, 0, 7, 8, 9]);
    }
}

//! Region descriptors exchanged between the connector and the buffering subsystem.
//!
//! The file side is described as an inclusive bounding box, the memory side as an offset into
//! a buffer of a given shape. A file side with a zero-sized dimension is carried as
//! [`FileRegion::Empty`] instead of a box, since an inclusive end cannot express "nothing".

use serde::{Deserialize, Serialize};

/// Inclusive bounding box over a dataset's dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hyperslab {
    start: Vec<u64>,
    end: Vec<u64>,
}

impl Hyperslab {
    /// Returns `None` when ranks differ or any `start[i] > end[i]`.
    #[must_use]
    pub fn new(start: Vec<u64>, end: Vec<u64>) -> Option<Self> {
        if start.len() != end.len() || start.iter().zip(&end).any(|(s, e)| s > e) {
            return None;
        }
        Some(Self { start, end })
    }

    #[must_use]
    pub fn rank(&self) -> usize {
        self.start.len()
    }

    #[must_use]
    pub fn start(&self) -> &[u64] {
        &self.start
    }

    #[must_use]
    pub fn end(&self) -> &[u64] {
        &self.end
    }

    /// Elements per dimension (`end - start + 1`), saturating at `u64::MAX`.
    #[must_use]
    pub fn count(&self) -> Vec<u64> {
        self.start.iter().zip(&self.end).map(|(s, e)| (e - s).saturating_add(1)).collect()
    }

    #[must_use]
    pub fn element_count(&self) -> u64 {
        self.count().iter().fold(1u64, |acc, &c| acc.saturating_mul(c))
    }

    /// `true` if the box lies inside a dataset of shape `extent`.
    #[must_use]
    pub fn fits(&self, extent: &[u64]) -> bool {
        extent.len() == self.rank() && self.end.iter().zip(extent).all(|(e, dim)| e < dim)
    }
}

/// File-side part of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileRegion {
    Bounded(Hyperslab),
    Empty { rank: usize },
}

impl FileRegion {
    /// The whole current extent: `0..=extent[i] - 1` in every dimension, or
    /// [`FileRegion::Empty`] if any dimension is zero.
    #[must_use]
    pub fn whole(extent: &[u64]) -> Self {
        if extent.contains(&0) {
            return Self::Empty { rank: extent.len() };
        }
        let start = vec![0; extent.len()];
        let end = extent.iter().map(|dim| dim - 1).collect();
        Self::Bounded(Hyperslab { start, end })
    }

    #[must_use]
    pub fn rank(&self) -> usize {
        match self {
            Self::Bounded(slab) => slab.rank(),
            Self::Empty { rank } => *rank,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty { .. })
    }

    #[must_use]
    pub const fn as_hyperslab(&self) -> Option<&Hyperslab> {
        match self {
            Self::Bounded(slab) => Some(slab),
            Self::Empty { .. } => None,
        }
    }

    /// Elements per dimension; all zeros for an empty region.
    #[must_use]
    pub fn shape(&self) -> Vec<u64> {
        match self {
            Self::Bounded(slab) => slab.count(),
            Self::Empty { rank } => vec![0; *rank],
        }
    }

    #[must_use]
    pub fn element_count(&self) -> u64 {
        self.as_hyperslab().map_or(0, Hyperslab::element_count)
    }
}

/// Memory-side part of a transfer: where the data starts inside a buffer of shape `extent`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryRegion {
    start: Vec<u64>,
    extent: Vec<u64>,
}

impl MemoryRegion {
    /// Returns `None` when ranks differ.
    #[must_use]
    pub fn new(start: Vec<u64>, extent: Vec<u64>) -> Option<Self> {
        (start.len() == extent.len()).then_some(Self { start, extent })
    }

    /// A dense buffer of shape `extent`, starting at the origin.
    #[must_use]
    pub fn dense(extent: Vec<u64>) -> Self {
        Self { start: vec![0; extent.len()], extent }
    }

    #[must_use]
    pub fn rank(&self) -> usize {
        self.extent.len()
    }

    #[must_use]
    pub fn start(&self) -> &[u64] {
        &self.start
    }

    #[must_use]
    pub fn extent(&self) -> &[u64] {
        &self.extent
    }

    /// Elements the described buffer holds.
    #[must_use]
    pub fn element_count(&self) -> u64 {
        self.extent.iter().fold(1u64, |acc, &dim| acc.saturating_mul(dim))
    }
}

use serde::{Deserialize, Serialize};

/// Maximum extent value marking a dimension that can grow without bound.
pub const UNLIMITED: u64 = u64::MAX;

/// Current and maximum per-dimension sizes of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extents {
    current: Vec<u64>,
    maximum: Vec<u64>,
}

impl Extents {
    /// Builds extents from current and maximum sizes.
    ///
    /// Returns `None` when the two vectors disagree on rank or a current size exceeds its
    /// maximum.
    #[must_use]
    pub fn new(current: Vec<u64>, maximum: Vec<u64>) -> Option<Self> {
        if current.len() != maximum.len() {
            return None;
        }
        if current.iter().zip(&maximum).any(|(cur, max)| cur > max) {
            return None;
        }
        Some(Self { current, maximum })
    }

    /// Extents that cannot grow: the maximum equals the current size.
    #[must_use]
    pub fn fixed(current: Vec<u64>) -> Self {
        Self { maximum: current.clone(), current }
    }

    #[must_use]
    pub fn rank(&self) -> usize {
        self.current.len()
    }

    #[must_use]
    pub fn current(&self) -> &[u64] {
        &self.current
    }

    #[must_use]
    pub fn maximum(&self) -> &[u64] {
        &self.maximum
    }

    /// Number of elements in the current shape. A rank-0 (scalar) shape holds one element.
    #[must_use]
    pub fn element_count(&self) -> u64 {
        self.current.iter().fold(1u64, |acc, &dim| acc.saturating_mul(dim))
    }

    /// `true` if any dimension currently has zero size.
    #[must_use]
    pub fn has_zero_dimension(&self) -> bool {
        self.current.contains(&0)
    }

    /// Whether `dims` is a legal new current shape under these maximums.
    #[must_use]
    pub fn allows(&self, dims: &[u64]) -> bool {
        dims.len() == self.rank() && dims.iter().zip(&self.maximum).all(|(d, max)| d <= max)
    }

    /// Returns a copy with a new current shape, keeping the maximums.
    #[must_use]
    pub fn resized(&self, dims: &[u64]) -> Option<Self> {
        self.allows(dims).then(|| Self { current: dims.to_vec(), maximum: self.maximum.clone() })
    }
}

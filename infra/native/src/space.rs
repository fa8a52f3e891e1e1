use stratum_domain::{Extents, Hyperslab};

/// What part of a dataspace is selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SpaceSelection {
    All,
    None,
    /// A regular block: `count[i]` elements starting at `start[i]`.
    Block { start: Vec<u64>, count: Vec<u64> },
}

/// A simple (rectangular) dataspace plus its selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Dataspace {
    pub(crate) extents: Extents,
    pub(crate) selection: SpaceSelection,
}

impl Dataspace {
    pub(crate) const fn new(extents: Extents) -> Self {
        Self { extents, selection: SpaceSelection::All }
    }

    /// Selected bounding box, or `None` for an empty selection.
    pub(crate) fn bounds(&self) -> Option<Hyperslab> {
        match &self.selection {
            SpaceSelection::None => None,
            SpaceSelection::All => {
                let current = self.extents.current();
                if current.contains(&0) {
                    return None;
                }
                Hyperslab::new(vec![0; current.len()], current.iter().map(|d| d - 1).collect())
            }
            SpaceSelection::Block { start, count } => {
                if count.contains(&0) {
                    return None;
                }
                let end = start.iter().zip(count).map(|(s, c)| s + c - 1).collect();
                Hyperslab::new(start.clone(), end)
            }
        }
    }

    pub(crate) fn selected_points(&self) -> u64 {
        match &self.selection {
            SpaceSelection::None => 0,
            SpaceSelection::All => self.extents.element_count(),
            SpaceSelection::Block { count, .. } => {
                count.iter().fold(1u64, |acc, &c| acc.saturating_mul(c))
            }
        }
    }

    /// A block selection must lie inside the current extent.
    pub(crate) fn block_fits(&self, start: &[u64], count: &[u64]) -> bool {
        let current = self.extents.current();
        start.len() == current.len()
            && count.len() == current.len()
            && start
                .iter()
                .zip(count)
                .zip(current)
                .all(|((s, c), dim)| s.checked_add(*c).is_some_and(|stop| stop <= *dim))
    }
}

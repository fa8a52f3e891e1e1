use proptest::prelude::*;
use stratum_connector::{SelectionShape, resolve};
use stratum_domain::{FileRegion, Hyperslab};

/// A dataspace of rank 1..=4 together with a block selected inside it.
fn selected_block() -> impl Strategy<Value = (Vec<u64>, Vec<u64>, Vec<u64>)> {
    prop::collection::vec((1u64..32, 0u64..32, 0u64..32), 1..=4).prop_map(|dims| {
        let mut extent = Vec::with_capacity(dims.len());
        let mut start = Vec::with_capacity(dims.len());
        let mut end = Vec::with_capacity(dims.len());
        for (size, a, b) in dims {
            let (lo, hi) = (a.min(b) % size, a.max(b) % size);
            let (lo, hi) = (lo.min(hi), lo.max(hi));
            extent.push(size);
            start.push(lo);
            end.push(hi);
        }
        (extent, start, end)
    })
}

proptest! {
    #[test]
    fn prop_explicit_file_selection_passes_through((extent, start, end) in selected_block()) {
        let bounds = Hyperslab::new(start.clone(), end.clone()).unwrap();
        let file =
            SelectionShape { rank: extent.len(), extent: extent.clone(), bounds: Some(bounds) };

        let resolved = resolve(None, Some(&file), &extent).unwrap();

        let slab = resolved.file.as_hyperslab().unwrap();
        prop_assert_eq!(slab.start(), start.as_slice());
        prop_assert_eq!(slab.end(), end.as_slice());
        prop_assert_eq!(resolved.memory.start().to_vec(), vec![0; extent.len()]);
        prop_assert_eq!(resolved.memory.extent().to_vec(), slab.count());
        prop_assert_eq!(resolved.memory.element_count(), slab.element_count());
    }

    #[test]
    fn prop_explicit_memory_selection_keeps_its_own_rank(
        (extent, start, end) in selected_block(),
        length in 1u64..512,
    ) {
        let file = SelectionShape {
            rank: extent.len(),
            extent: extent.clone(),
            bounds: Hyperslab::new(start, end),
        };
        let offset = length / 2;
        let memory = SelectionShape {
            rank: 1,
            extent: vec![length],
            bounds: Hyperslab::new(vec![offset], vec![length - 1]),
        };

        let resolved = resolve(Some(&memory), Some(&file), &extent).unwrap();

        prop_assert_eq!(resolved.file_rank(), extent.len());
        prop_assert_eq!(resolved.memory_rank(), 1);
        prop_assert_eq!(resolved.memory.start().to_vec(), vec![offset]);
        prop_assert_eq!(resolved.memory.extent().to_vec(), vec![length]);
    }

    #[test]
    fn prop_default_box_covers_the_dataset(extent in prop::collection::vec(0u64..16, 1..=4)) {
        let resolved = resolve(None, None, &extent).unwrap();

        if extent.contains(&0) {
            prop_assert_eq!(resolved.file, FileRegion::Empty { rank: extent.len() });
            prop_assert_eq!(resolved.memory.element_count(), 0);
        } else {
            let slab = resolved.file.as_hyperslab().unwrap();
            prop_assert!(slab.start().iter().all(|s| *s == 0));
            prop_assert_eq!(slab.count(), extent.clone());
            prop_assert_eq!(resolved.memory.extent(), extent.as_slice());
            prop_assert_eq!(resolved.file.element_count(), extent.iter().product::<u64>());
        }
    }
}

//! Row-major addressing of hyperslabs.

/// Linear element index of `indices` inside a row-major array of `shape`, `None` when the index
/// does not fit in a `u64`.
pub(crate) fn ravel_indices(indices: &[u64], shape: &[u64]) -> Option<u64> {
    let mut index: u64 = 0;
    let mut stride = Some(1u64);
    for (&i, &s) in std::iter::zip(indices, shape).rev() {
        if i != 0 {
            index = index.checked_add(i.checked_mul(stride?)?)?;
        }
        stride = stride.and_then(|stride| stride.checked_mul(s));
    }
    Some(index)
}

/// `len` consecutive elements starting at linear element `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Run {
    pub(crate) offset: u64,
    pub(crate) len: u64,
}

/// Contiguous runs covering the block of `count` elements at `start` inside `shape`, in
/// row-major order. Adjacent rows are merged into a single run.
///
/// The caller guarantees `start[i] + count[i] <= shape[i]` and equal ranks. `None` when an
/// element of the block has no `u64` offset inside `shape`.
pub(crate) fn block_runs(start: &[u64], count: &[u64], shape: &[u64]) -> Option<Vec<Run>> {
    if count.contains(&0) {
        return Some(Vec::new());
    }
    let Some((&row_len, outer)) = count.split_last() else {
        return Some(vec![Run { offset: 0, len: 1 }]);
    };

    let mut runs: Vec<Run> = Vec::new();
    let mut index = start.to_vec();
    let mut step = vec![0u64; outer.len()];
    loop {
        for (slot, (s, o)) in index.iter_mut().zip(start.iter().zip(&step)) {
            *slot = s + o;
        }
        let offset = ravel_indices(&index, shape)?;
        if offset.checked_add(row_len).is_none() {
            return None;
        }
        match runs.last_mut() {
            Some(last) if last.offset + last.len == offset => last.len += row_len,
            _ => runs.push(Run { offset, len: row_len }),
        }

        // Odometer over the outer dimensions, last one fastest.
        let mut dim = outer.len();
        loop {
            if dim == 0 {
                return Some(runs);
            }
            dim -= 1;
            step[dim] += 1;
            if step[dim] < outer[dim] {
                break;
            }
            step[dim] = 0;
        }
    }
}

/// Copies elements from `src` (addressed by `src_runs`) into `dst` (addressed by `dst_runs`).
/// Both run lists must cover the same number of elements.
pub(crate) fn copy_runs(
    src_runs: &[Run],
    src: &[u8],
    dst_runs: &[Run],
    dst: &mut [u8],
    element_size: usize,
) {
    let mut src_iter = src_runs.iter().copied();
    let mut dst_iter = dst_runs.iter().copied();
    let mut src_run = src_iter.next();
    let mut dst_run = dst_iter.next();

    while let (Some(s), Some(d)) = (src_run.as_mut(), dst_run.as_mut()) {
        let n = s.len.min(d.len);
        let (from, to, bytes) = (
            s.offset as usize * element_size,
            d.offset as usize * element_size,
            n as usize * element_size,
        );
        dst[to..to + bytes].copy_from_slice(&src[from..from + bytes]);

        s.offset += n;
        s.len -= n;
        d.offset += n;
        d.len -= n;
        let (src_done, dst_done) = (s.len == 0, d.len == 0);
        if src_done {
            src_run = src_iter.next();
        }
        if dst_done {
            dst_run = dst_iter.next();
        }
    }
}

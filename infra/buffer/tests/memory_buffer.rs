use proptest::prelude::*;
use stratum_buffer::{BufferError, BufferingInterface, MemoryBuffer, Transfer};
use stratum_domain::{
    DatasetKey, ElementType, Extents, FileRegion, Hyperslab, LayerInfo, LayerKind, MemoryRegion, ObjectId,
};

const DSET: ObjectId = ObjectId::new(11);

fn activated(capacity: u64) -> MemoryBuffer {
    let buffer = MemoryBuffer::new();
    buffer.update_layers(&[LayerInfo::memory("ram", capacity)]).unwrap();
    buffer
}

fn grid_key() -> DatasetKey {
    DatasetKey::from_path("/scratch/sample.dat", "/grid")
}

fn slab(start: &[u64], end: &[u64]) -> FileRegion {
    FileRegion::Bounded(Hyperslab::new(start.to_vec(), end.to_vec()).unwrap())
}

fn int32_transfer(file: FileRegion, memory: MemoryRegion) -> Transfer {
    Transfer { rank: file.rank(), element: ElementType::Int32, file, memory, dataset: DSET }
}

fn encode(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

fn decode(bytes: &[u8]) -> Vec<i32> {
    bytes.chunks_exact(4).map(|c| i32::from_ne_bytes(c.try_into().unwrap())).collect()
}

#[test]
fn test_row_slab_lands_in_the_right_rows() {
    let buffer = activated(1 << 20);
    buffer.init(&grid_key(), ElementType::Int32, &Extents::fixed(vec![4, 6]), DSET).unwrap();

    let rows: Vec<i32> = (1..=12).collect();
    let write = int32_transfer(slab(&[1, 0], &[2, 5]), MemoryRegion::dense(vec![2, 6]));
    buffer.write(&grid_key(), &write, &encode(&rows)).unwrap();

    let mut out = vec![0u8; 4 * 24];
    let whole = int32_transfer(FileRegion::whole(&[4, 6]), MemoryRegion::dense(vec![4, 6]));
    buffer.read(&grid_key(), &whole, &mut out).unwrap();

    let grid = decode(&out);
    assert!(grid[..6].iter().all(|v| *v == 0));
    assert_eq!(&grid[6..18], rows.as_slice());
    assert!(grid[18..].iter().all(|v| *v == 0));
    assert_eq!(buffer.is_dirty(&grid_key()), Some(true));
}

#[test]
fn test_memory_block_at_offset() {
    let buffer = activated(1 << 20);
    buffer.init(&grid_key(), ElementType::Int32, &Extents::fixed(vec![4, 6]), DSET).unwrap();

    let column: Vec<i32> = vec![10, 20, 30, 40];
    let write = int32_transfer(slab(&[0, 2], &[3, 2]), MemoryRegion::dense(vec![4, 1]));
    buffer.write(&grid_key(), &write, &encode(&column)).unwrap();

    // Read the column into the middle column of a 4x3 scratch buffer.
    let mut out = vec![0u8; 4 * 12];
    let read = int32_transfer(slab(&[0, 2], &[3, 2]), MemoryRegion::new(vec![0, 1], vec![4, 3]).unwrap());
    buffer.read(&grid_key(), &read, &mut out).unwrap();

    assert_eq!(decode(&out), vec![0, 10, 0, 0, 20, 0, 0, 30, 0, 0, 40, 0]);
}

#[test]
fn test_transfer_before_init_is_rejected() {
    let buffer = activated(1 << 20);
    let transfer = int32_transfer(FileRegion::whole(&[2]), MemoryRegion::dense(vec![2]));
    let err = buffer.write(&grid_key(), &transfer, &encode(&[1, 2])).unwrap_err();
    assert!(matches!(err, BufferError::NotInitialized { .. }));
}

#[test]
fn test_init_requires_layers() {
    let buffer = MemoryBuffer::new();
    let err = buffer.init(&grid_key(), ElementType::Int32, &Extents::fixed(vec![4]), DSET).unwrap_err();
    assert!(matches!(err, BufferError::InvalidConfiguration { .. }));
}

#[test]
fn test_layer_validation() {
    let buffer = MemoryBuffer::new();

    assert!(matches!(buffer.update_layers(&[]), Err(BufferError::InvalidConfiguration { .. })));
    assert!(matches!(
        buffer.update_layers(&[LayerInfo::memory("ram", 0)]),
        Err(BufferError::InvalidConfiguration { .. })
    ));

    let mut orphan = LayerInfo::mounted("nvme", LayerKind::Nvme, 1 << 30, "/mnt/nvme");
    orphan.mount_point = None;
    assert!(buffer.update_layers(&[LayerInfo::memory("ram", 1024), orphan]).is_err());

    let only_disk = LayerInfo::mounted("pfs", LayerKind::ParallelFs, 1 << 40, "/lustre");
    assert!(buffer.update_layers(&[only_disk.clone()]).is_err());

    buffer.update_layers(&[LayerInfo::memory("ram", 1024), only_disk]).unwrap();
    assert_eq!(buffer.capacity(), 1024);
    assert_eq!(buffer.layers().len(), 2);
}

#[test]
fn test_capacity_counts_every_staged_dataset() {
    let buffer = activated(100);
    buffer
        .init(&DatasetKey::from_path("a.dat", "/x"), ElementType::UInt8, &Extents::fixed(vec![60]), DSET)
        .unwrap();
    let err = buffer
        .init(&DatasetKey::from_path("a.dat", "/y"), ElementType::UInt8, &Extents::fixed(vec![60]), DSET)
        .unwrap_err();
    assert!(matches!(err, BufferError::CapacityExceeded { .. }));
    assert_eq!(buffer.stats().datasets, 1);
}

#[test]
fn test_reinit_with_other_type_is_a_mismatch() {
    let buffer = activated(1 << 20);
    buffer.init(&grid_key(), ElementType::Int32, &Extents::fixed(vec![4]), DSET).unwrap();
    let err = buffer.init(&grid_key(), ElementType::Float64, &Extents::fixed(vec![4]), DSET).unwrap_err();
    assert!(matches!(err, BufferError::TypeMismatch { .. }));

    let transfer = Transfer {
        rank: 1,
        element: ElementType::Int16,
        file: FileRegion::whole(&[4]),
        memory: MemoryRegion::dense(vec![4]),
        dataset: DSET,
    };
    let mut out = [0u8; 8];
    assert!(matches!(buffer.read(&grid_key(), &transfer, &mut out), Err(BufferError::TypeMismatch { .. })));
}

#[test]
fn test_reinit_keeps_staged_data() {
    let buffer = activated(1 << 20);
    buffer.init(&grid_key(), ElementType::Int32, &Extents::fixed(vec![3]), DSET).unwrap();
    let transfer = int32_transfer(FileRegion::whole(&[3]), MemoryRegion::dense(vec![3]));
    buffer.write(&grid_key(), &transfer, &encode(&[5, 6, 7])).unwrap();

    buffer.init(&grid_key(), ElementType::Int32, &Extents::fixed(vec![3]), ObjectId::new(12)).unwrap();

    let mut out = vec![0u8; 12];
    buffer.read(&grid_key(), &transfer, &mut out).unwrap();
    assert_eq!(decode(&out), vec![5, 6, 7]);
    assert_eq!(buffer.staged_dataset(&grid_key()), Some(ObjectId::new(12)));
}

#[test]
fn test_out_of_bounds_regions() {
    let buffer = activated(1 << 20);
    buffer.init(&grid_key(), ElementType::Int32, &Extents::fixed(vec![4, 6]), DSET).unwrap();

    let past_end = int32_transfer(slab(&[3, 0], &[4, 5]), MemoryRegion::dense(vec![2, 6]));
    let err = buffer.write(&grid_key(), &past_end, &encode(&[0; 12])).unwrap_err();
    assert!(matches!(err, BufferError::OutOfBounds { .. }));

    let short = int32_transfer(slab(&[0, 0], &[0, 5]), MemoryRegion::dense(vec![1, 6]));
    let err = buffer.write(&grid_key(), &short, &encode(&[0; 3])).unwrap_err();
    assert!(matches!(err, BufferError::OutOfBounds { .. }));

    let tight = int32_transfer(slab(&[0, 0], &[1, 1]), MemoryRegion::new(vec![1, 1], vec![2, 2]).unwrap());
    let err = buffer.write(&grid_key(), &tight, &encode(&[0; 4])).unwrap_err();
    assert!(matches!(err, BufferError::OutOfBounds { .. }));
}

#[test]
fn test_memory_extent_past_u64_is_rejected() {
    let buffer = activated(1 << 20);
    buffer.init(&grid_key(), ElementType::Int32, &Extents::fixed(vec![4, 6]), DSET).unwrap();
    let huge = vec![1u64 << 32; 3];

    let linear = MemoryRegion::new(vec![1, 0, 0], huge.clone()).unwrap();
    let write = int32_transfer(slab(&[0, 0], &[0, 5]), linear);
    let err = buffer.write(&grid_key(), &write, &encode(&[0; 6])).unwrap_err();
    assert!(matches!(err, BufferError::OutOfBounds { .. }));

    let origin = int32_transfer(slab(&[0, 0], &[0, 5]), MemoryRegion::dense(huge));
    let mut out = vec![0u8; 4 * 6];
    let err = buffer.read(&grid_key(), &origin, &mut out).unwrap_err();
    assert!(matches!(err, BufferError::OutOfBounds { .. }));

    let block = MemoryRegion::new(vec![1 << 40, 0], vec![1 << 41, 1 << 40]).unwrap();
    let write = int32_transfer(slab(&[0, 0], &[0, 5]), block);
    let err = buffer.write(&grid_key(), &write, &encode(&[0; 6])).unwrap_err();
    assert!(matches!(err, BufferError::OutOfBounds { .. }));
    assert_eq!(buffer.is_dirty(&grid_key()), Some(false));
}

#[test]
fn test_empty_region_is_a_no_op() {
    let buffer = activated(1 << 20);
    buffer.init(&grid_key(), ElementType::Int32, &Extents::fixed(vec![0, 6]), DSET).unwrap();

    let transfer = int32_transfer(FileRegion::whole(&[0, 6]), MemoryRegion::dense(vec![0, 6]));
    assert!(transfer.file.is_empty());
    buffer.write(&grid_key(), &transfer, &[]).unwrap();
    buffer.read(&grid_key(), &transfer, &mut []).unwrap();

    let stats = buffer.stats();
    assert_eq!((stats.reads, stats.writes), (0, 0));
}

#[test]
fn test_sync_resizes_and_cleans() {
    let buffer = activated(1 << 20);
    let extents = Extents::new(vec![2, 2], vec![stratum_domain::UNLIMITED, 2]).unwrap();
    buffer.init(&grid_key(), ElementType::Int32, &extents, DSET).unwrap();

    let transfer = int32_transfer(FileRegion::whole(&[2, 2]), MemoryRegion::dense(vec![2, 2]));
    buffer.write(&grid_key(), &transfer, &encode(&[1, 2, 3, 4])).unwrap();

    let grown = extents.resized(&[5, 2]).unwrap();
    buffer.sync(&grid_key(), &grown, DSET).unwrap();

    assert_eq!(buffer.staged_extents(&grid_key()).unwrap().current(), &[5, 2]);
    assert_eq!(buffer.is_dirty(&grid_key()), Some(false));

    let mut out = vec![0u8; 40];
    let whole = int32_transfer(FileRegion::whole(&[5, 2]), MemoryRegion::dense(vec![5, 2]));
    buffer.read(&grid_key(), &whole, &mut out).unwrap();
    assert_eq!(decode(&out), vec![1, 2, 3, 4, 0, 0, 0, 0, 0, 0]);
    assert_eq!(buffer.stats().syncs, 1);
}

#[test]
fn test_sync_unknown_dataset() {
    let buffer = activated(1 << 20);
    let err = buffer.sync(&grid_key(), &Extents::fixed(vec![1]), DSET).unwrap_err();
    assert!(matches!(err, BufferError::NotInitialized { .. }));
}

#[test]
fn test_clean_drops_everything() {
    let buffer = activated(1 << 20);
    buffer.init(&grid_key(), ElementType::Int32, &Extents::fixed(vec![8]), DSET).unwrap();
    buffer.clean();

    let stats = buffer.stats();
    assert_eq!(stats.datasets, 0);
    assert_eq!(stats.capacity_bytes, 0);
    assert_eq!(stats.cleans, 1);
    assert!(buffer.layers().is_empty());
}

#[test]
fn test_keys_ignore_directories() {
    let buffer = activated(1 << 20);
    let staged = DatasetKey::from_path("/run/a/out.h5", "/t");
    buffer.init(&staged, ElementType::UInt8, &Extents::fixed(vec![2]), DSET).unwrap();

    let elsewhere = DatasetKey::from_path("/run/b/out.h5", "/t");
    assert_eq!(buffer.staged_extents(&elsewhere).unwrap().current(), &[2]);
}

proptest! {
    #[test]
    fn prop_written_block_reads_back(
        rows in 1u64..8,
        cols in 1u64..8,
        r0 in 0u64..8,
        c0 in 0u64..8,
        seed in any::<u8>(),
    ) {
        let r0 = r0 % rows;
        let c0 = c0 % cols;
        let (h, w) = (rows - r0, cols - c0);

        let buffer = activated(1 << 20);
        let key = DatasetKey::from_path("p.dat", "/block");
        buffer.init(&key, ElementType::UInt8, &Extents::fixed(vec![rows, cols]), DSET).unwrap();

        let data: Vec<u8> = (0..h * w).map(|i| seed.wrapping_add(i as u8)).collect();
        let transfer = Transfer {
            rank: 2,
            element: ElementType::UInt8,
            file: slab(&[r0, c0], &[rows - 1, cols - 1]),
            memory: MemoryRegion::dense(vec![h, w]),
            dataset: DSET,
        };
        buffer.write(&key, &transfer, &data).unwrap();

        let mut out = vec![0u8; data.len()];
        buffer.read(&key, &transfer, &mut out).unwrap();
        prop_assert_eq!(out, data);
        prop_assert_eq!(buffer.stats().bytes_written, h * w);
    }
}

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use stratum_buffer::{BufferingInterface, MemoryBuffer, Transfer};
use stratum_domain::{DatasetKey, ElementType, Extents, FileRegion, Hyperslab, LayerInfo, MemoryRegion, ObjectId};

fn bench_row_slabs(c: &mut Criterion) {
    let mut group = c.benchmark_group("row_slabs");

    let buffer = MemoryBuffer::new();
    buffer.update_layers(&[LayerInfo::memory("ram", 512 * 1024 * 1024)]).unwrap();

    let shapes = [("64x64", [64u64, 64]), ("512x512", [512, 512]), ("2048x2048", [2048, 2048])];

    for (label, shape) in shapes {
        let key = DatasetKey::from_path("bench.dat", format!("/{label}"));
        buffer.init(&key, ElementType::Float64, &Extents::fixed(shape.to_vec()), ObjectId::new(1)).unwrap();

        // Half the rows, in the middle of the dataset.
        let rows = shape[0] / 2;
        let slab = Hyperslab::new(vec![rows / 2, 0], vec![rows / 2 + rows - 1, shape[1] - 1]).unwrap();
        let transfer = Transfer {
            rank: 2,
            element: ElementType::Float64,
            file: FileRegion::Bounded(slab),
            memory: MemoryRegion::dense(vec![rows, shape[1]]),
            dataset: ObjectId::new(1),
        };
        let data = vec![7u8; transfer.memory_bytes() as usize];

        group.throughput(Throughput::Bytes(data.len() as u64));

        group.bench_with_input(BenchmarkId::new("write", label), &data, |b, d| {
            b.iter(|| buffer.write(&key, &transfer, d).unwrap());
        });

        let mut out = vec![0u8; data.len()];
        group.bench_function(BenchmarkId::new("read", label), |b| {
            b.iter(|| buffer.read(&key, &transfer, &mut out).unwrap());
        });
    }

    group.finish();
}

fn bench_column_slab(c: &mut Criterion) {
    let buffer = MemoryBuffer::new();
    buffer.update_layers(&[LayerInfo::memory("ram", 64 * 1024 * 1024)]).unwrap();

    let key = DatasetKey::from_path("bench.dat", "/columns");
    buffer.init(&key, ElementType::Int32, &Extents::fixed(vec![1024, 1024]), ObjectId::new(1)).unwrap();

    let transfer = Transfer {
        rank: 2,
        element: ElementType::Int32,
        file: FileRegion::Bounded(Hyperslab::new(vec![0, 100], vec![1023, 103]).unwrap()),
        memory: MemoryRegion::dense(vec![1024, 4]),
        dataset: ObjectId::new(1),
    };
    let mut out = vec![0u8; transfer.memory_bytes() as usize];

    c.bench_function("column_slab_read", |b| {
        b.iter(|| buffer.read(&key, &transfer, &mut out).unwrap());
    });
}

criterion_group!(benches, bench_row_slabs, bench_column_slab);
criterion_main!(benches);

//! Benchmarks for examinator
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::io::Write;

fn benchmark_queue_operations(c: &mut Criterion) {
    use examinator::walker::queue::{PathTask, WorkQueue};

    c.bench_function("queue_offer_recv", |b| {
        let queue = WorkQueue::new(Some(10000));
        let sender = queue.sender();
        let receiver = queue.receiver();

        b.iter(|| {
            let task = PathTask::new("/test/path".into(), 5);
            let overflow = sender.offer(task).unwrap();
            assert!(overflow.is_none());
            let received = receiver.try_recv().unwrap();
            black_box(received);
        })
    });
}

fn benchmark_hashing(c: &mut Criterion) {
    use examinator::content::{hash_file, hash_utf8, DEFAULT_BLOCK_SIZE};

    c.bench_function("hash_path_string", |b| {
        b.iter(|| black_box(hash_utf8(black_box("/data/projects/archive/2021/report.pdf"))))
    });

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&vec![0xA5u8; 4 * 1024 * 1024]).unwrap();
    file.flush().unwrap();

    c.bench_function("hash_file_4mb", |b| {
        b.iter(|| black_box(hash_file(file.path(), DEFAULT_BLOCK_SIZE).unwrap()))
    });
}

fn benchmark_record_creation(c: &mut Criterion) {
    use examinator::fs::PathRecord;

    let file = tempfile::NamedTempFile::new().unwrap();
    let metadata = std::fs::symlink_metadata(file.path()).unwrap();

    c.bench_function("record_from_metadata", |b| {
        b.iter(|| black_box(PathRecord::from_metadata(file.path(), &metadata, 3)))
    });

    let record = PathRecord::from_metadata(file.path(), &metadata, 3);
    c.bench_function("record_to_row", |b| b.iter(|| black_box(record.to_row())));
}

fn benchmark_url_prep(c: &mut Criterion) {
    use examinator::net::UrlInfo;

    let url = UrlInfo::parse("https://Example.com:8080/Some/Path/file.tar.gz?b=2&a=1#frag").unwrap();
    c.bench_function("url_prep", |b| b.iter(|| black_box(url.prep())));
}

criterion_group!(
    benches,
    benchmark_queue_operations,
    benchmark_hashing,
    benchmark_record_creation,
    benchmark_url_prep
);
criterion_main!(benches);

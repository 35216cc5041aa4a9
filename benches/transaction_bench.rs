use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use clausetx::mvcc::{LockRegistry, Position, Transactions};
use clausetx::store::ClauseStore;

fn commit_n_asserts(store: &ClauseStore, locks: &LockRegistry, n: u64) {
    let txs = Transactions::new(store, locks);
    txs.transaction("bench", |txs| {
        for _ in 0..n {
            txs.assert(black_box(1), Position::End)?;
        }
        Ok(true)
    })
    .unwrap();
}

fn bench_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("transaction_commit");

    for n in [1u64, 8, 64, 512] {
        group.throughput(Throughput::Elements(n));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let store = ClauseStore::new();
                let locks = LockRegistry::new();
                commit_n_asserts(&store, &locks, n);
            });
        });
    }

    group.finish();
}

fn bench_discard(c: &mut Criterion) {
    c.bench_function("transaction_discard_64", |b| {
        b.iter(|| {
            let store = ClauseStore::new();
            let locks = LockRegistry::new();
            let txs = Transactions::new(&store, &locks);
            txs.transaction("bench", |txs| {
                for _ in 0..64 {
                    txs.assert(black_box(1), Position::End)?;
                }
                Ok(false)
            })
            .unwrap();
        });
    });
}

criterion_group!(benches, bench_commit, bench_discard);
criterion_main!(benches);

//! Benchmarks for call record store operations.
//!
//! Run with: cargo bench --bench store

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use callbridge::identity::{ActorKind, Identity};
use callbridge::store::{
    CallEvent, CallQuery, CallStatus, CallStore, InMemoryCallStore, RecordSeed,
};

fn seed(n: u32) -> RecordSeed {
    RecordSeed {
        direction: callbridge::store::CallDirection::Outbound,
        from_number: "+15550009999".to_string(),
        to_number: format!("+1555{:07}", n),
        owner: Some(Identity::new(ActorKind::SalesRep, 1 + n % 8)),
        contact_id: None,
    }
}

fn bench_apply_event_new_record(c: &mut Criterion) {
    let store = InMemoryCallStore::new();
    let mut n = 0u32;

    c.bench_function("store/apply_event_new", |b| {
        b.iter(|| {
            n += 1;
            let event = CallEvent::new(CallStatus::Ringing, None);
            black_box(
                store
                    .apply_event(&format!("CA{n}"), event, &seed(n))
                    .unwrap(),
            )
        })
    });
}

fn bench_apply_event_existing(c: &mut Criterion) {
    let store = InMemoryCallStore::new();
    store
        .apply_event("CA1", CallEvent::new(CallStatus::Ringing, None), &seed(1))
        .unwrap();

    c.bench_function("store/apply_event_duplicate", |b| {
        b.iter(|| {
            let event = CallEvent::new(CallStatus::Ringing, None);
            black_box(store.apply_event("CA1", event, &seed(1)).unwrap())
        })
    });
}

fn bench_query_by_owner(c: &mut Criterion) {
    let mut group = c.benchmark_group("store/query_by_owner");

    for size in [100u32, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let store = InMemoryCallStore::new();
            for n in 0..size {
                store
                    .apply_event(
                        &format!("CA{n}"),
                        CallEvent::new(CallStatus::Completed, Some(60)),
                        &seed(n),
                    )
                    .unwrap();
            }

            let query = CallQuery::new()
                .with_owner(Identity::new(ActorKind::SalesRep, 1))
                .with_limit(10);
            b.iter(|| black_box(store.query(&query).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_apply_event_new_record,
    bench_apply_event_existing,
    bench_query_by_owner
);
criterion_main!(benches);

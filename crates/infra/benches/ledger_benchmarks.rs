use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use tokio::runtime::Runtime;

use kardex_core::ProductId;
use kardex_infra::ledger::StockLedger;
use kardex_infra::locks::ProductLocks;
use kardex_infra::movement_store::{InMemoryMovementStore, MovementFilter, Pagination};
use kardex_infra::product_store::{InMemoryProductStore, ProductStore};
use kardex_movements::{MovementRequest, MovementType};
use kardex_products::{Product, ProductDraft};

type BenchLedger = StockLedger<Arc<InMemoryMovementStore>, Arc<InMemoryProductStore>>;

/// Naive CRUD simulation: direct level updates (no ledger, no history).
#[derive(Debug, Clone)]
struct NaiveCrudStore {
    inner: Arc<RwLock<HashMap<ProductId, i64>>>,
}

impl NaiveCrudStore {
    fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn set(&self, id: ProductId, level: i64) {
        let mut map = self.inner.write().unwrap();
        map.insert(id, level);
    }

    fn adjust(&self, id: ProductId, delta: i64) -> Result<(), ()> {
        let mut map = self.inner.write().unwrap();
        if let Some(level) = map.get_mut(&id) {
            let next = *level + delta;
            if next < 0 {
                return Err(());
            }
            *level = next;
            Ok(())
        } else {
            Err(())
        }
    }
}

fn request(product_id: ProductId, movement_type: MovementType, quantity: i64) -> MovementRequest {
    MovementRequest {
        product_id,
        movement_type,
        quantity,
        reason: "Benchmark".to_string(),
        reason_category: None,
        batch_id: None,
        user_id: None,
        reference_document: None,
        comments: None,
    }
}

fn setup_ledger(rt: &Runtime, initial_stock: i64) -> (BenchLedger, ProductId) {
    let movements = Arc::new(InMemoryMovementStore::new());
    let products = Arc::new(InMemoryProductStore::new());
    let ledger = StockLedger::new(movements, products.clone(), Arc::new(ProductLocks::new()));

    let draft = ProductDraft {
        code: "BENCH-1".to_string(),
        name: "Benchmark Product".to_string(),
        barcode: None,
        description: None,
        category: None,
        location: None,
        supplier: None,
        unit: None,
        pricing: None,
        dimensions: None,
        stock_current: Some(initial_stock),
        stock_min: None,
        stock_max: None,
    };
    let product = Product::create(ProductId::new(), draft, Utc::now()).unwrap();
    let id = product.id;
    rt.block_on(products.insert(product)).unwrap();
    (ledger, id)
}

fn bench_movement_recording_latency(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("movement_recording_latency");
    group.sample_size(1000);

    group.bench_function("record_in_movement", |b| {
        let (ledger, id) = setup_ledger(&rt, 0);
        b.iter(|| {
            rt.block_on(ledger.record(request(id, MovementType::In, 1)))
                .unwrap();
        });
    });

    group.bench_function("record_out_movement", |b| {
        let (ledger, id) = setup_ledger(&rt, i64::MAX / 2);
        b.iter(|| {
            rt.block_on(ledger.record(request(id, MovementType::Out, 1)))
                .unwrap();
        });
    });

    // Baseline: what recording costs without a ledger at all.
    group.bench_function("naive_crud_adjust", |b| {
        let store = NaiveCrudStore::new();
        let id = ProductId::new();
        store.set(id, 0);
        b.iter(|| {
            store.adjust(black_box(id), 1).unwrap();
        });
    });

    group.finish();
}

fn bench_ledger_replay_speed(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("ledger_replay_speed");

    for movement_count in [100u64, 1000] {
        group.throughput(Throughput::Elements(movement_count));
        group.bench_with_input(
            BenchmarkId::from_parameter(movement_count),
            &movement_count,
            |b, &count| {
                let (ledger, id) = setup_ledger(&rt, 0);
                for _ in 0..count {
                    rt.block_on(ledger.record(request(id, MovementType::In, 1)))
                        .unwrap();
                }
                b.iter(|| {
                    let level = rt.block_on(ledger.rebuild_stock(black_box(id))).unwrap();
                    black_box(level);
                });
            },
        );
    }

    group.finish();
}

fn bench_query_latency(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("query_latency");

    group.bench_function("list_page_of_50", |b| {
        let (ledger, id) = setup_ledger(&rt, 0);
        for _ in 0..1000 {
            rt.block_on(ledger.record(request(id, MovementType::In, 1)))
                .unwrap();
        }
        b.iter(|| {
            let page = rt
                .block_on(ledger.list(MovementFilter::default(), Pagination::default()))
                .unwrap();
            black_box(page.total);
        });
    });

    group.bench_function("stats_full_window", |b| {
        let (ledger, id) = setup_ledger(&rt, 0);
        for _ in 0..1000 {
            rt.block_on(ledger.record(request(id, MovementType::In, 1)))
                .unwrap();
        }
        b.iter(|| {
            let stats = rt.block_on(ledger.stats(None, None)).unwrap();
            black_box(stats.total_in);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_movement_recording_latency,
    bench_ledger_replay_speed,
    bench_query_latency
);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ferrous_inject::*;
use std::sync::Arc;

// ===== Micro Benchmarks =====

fn bench_singleton_hit(c: &mut Criterion) {
    let container = SyncContainer::new();
    container.register(Singleton::new(|_| Ok(42u64))).unwrap();
    let root = container.root();

    // Prime the singleton and the plan
    let _ = root.get_sync::<u64>().unwrap();

    c.bench_function("singleton_hit_u64", |b| {
        b.iter(|| {
            let v = root.get_sync::<u64>().unwrap();
            black_box(v);
        })
    });
}

fn bench_singleton_cold(c: &mut Criterion) {
    struct ExpensiveToCreate {
        data: Vec<u64>,
    }

    c.bench_function("singleton_cold_expensive", |b| {
        b.iter_batched(
            || {
                let container = SyncContainer::new();
                container
                    .register(Singleton::new(|_| {
                        Ok(ExpensiveToCreate {
                            data: (0..1000).collect(),
                        })
                    }))
                    .unwrap();
                container
            },
            |container| {
                let v = container.root().get_sync::<ExpensiveToCreate>().unwrap();
                black_box(v.data.len());
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_scoped_vs_transient(c: &mut Criterion) {
    struct Service {
        value: u64,
    }
    struct Fresh {
        value: u64,
    }

    let container = SyncContainer::new();
    container.register(Scoped::new(|_| Ok(Service { value: 7 }))).unwrap();
    container.register(Transient::new(|_| Ok(Fresh { value: 7 }))).unwrap();
    let request = container.context().unwrap();

    let mut group = c.benchmark_group("lifestyles");
    group.bench_function("scoped_hit", |b| {
        b.iter(|| black_box(request.get_sync::<Service>().unwrap().value))
    });
    group.bench_function("transient", |b| {
        b.iter(|| black_box(request.get_sync::<Fresh>().unwrap().value))
    });
    group.finish();
}

// ===== Plan Compilation =====

fn chain(container: &SyncContainer, depth: usize) -> TypeKey {
    let key = |i: usize| TypeKey::named(format!("Layer{}", i));
    for i in 0..depth {
        let provider = Transient::new(|_| Ok(())).produces(key(i));
        let provider = if i == 0 {
            provider
        } else {
            provider.depends_on("inner", key(i - 1))
        };
        container.register(provider).unwrap();
    }
    key(depth - 1)
}

fn bench_dependency_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("dependency_chain");
    for depth in [1usize, 8, 32] {
        let container = SyncContainer::new();
        let root = chain(&container, depth);
        let request = container.context().unwrap();
        request.resolve_sync(&root).unwrap();

        group.bench_with_input(BenchmarkId::new("compiled", depth), &depth, |b, _| {
            b.iter(|| black_box(request.resolve_sync(&root).unwrap()))
        });
    }
    group.finish();
}

fn bench_plan_compile(c: &mut Criterion) {
    c.bench_function("plan_compile_depth_16", |b| {
        b.iter_batched(
            || {
                let container = SyncContainer::new();
                let root = chain(&container, 16);
                (container, root)
            },
            |(container, root)| {
                let v = container.context().unwrap().resolve_sync(&root).unwrap();
                black_box(v);
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

// ===== Contexts =====

fn bench_request_lifecycle(c: &mut Criterion) {
    struct Connection;

    let container = SyncContainer::new();
    container
        .register(Scoped::resource(|_| Ok(Resource::new(Connection, |_| Ok(())))))
        .unwrap();
    let root = container.root();

    c.bench_function("request_open_resolve_close", |b| {
        b.iter(|| {
            root.scoped_sync(|request| request.get_sync::<Connection>().map(black_box))
                .unwrap();
        })
    });
}

fn bench_async_resolution(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let container = Container::new();
    container
        .register(Singleton::new_async(|_| async { Ok::<_, DiError>(Arc::new(5u32)) }))
        .unwrap();
    let request = container.context().unwrap();

    c.bench_function("async_singleton_hit", |b| {
        b.iter(|| runtime.block_on(async { black_box(request.get::<Arc<u32>>().await.unwrap()) }))
    });
}

criterion_group!(
    benches,
    bench_singleton_hit,
    bench_singleton_cold,
    bench_scoped_vs_transient,
    bench_dependency_chain,
    bench_plan_compile,
    bench_request_lifecycle,
    bench_async_resolution
);
criterion_main!(benches);

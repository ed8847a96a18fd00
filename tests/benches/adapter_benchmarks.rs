//! # dom-mutations Adapter Benchmarks
//!
//! | Path | Measures |
//! |------|----------|
//! | batched | pull, host notification, resolve |
//! | flattened | same, plus draining records one by one |
//! | host only | in-memory edit queueing and flush |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dom_mutations::{batched_dom_mutations, dom_mutations, InMemoryDom, ObserveOptions};
use futures::FutureExt;
use tokio_stream::StreamExt;

const BATCH_SIZES: [usize; 4] = [1, 10, 100, 1000];

fn bench_batched_pull(c: &mut Criterion) {
    let mut group = c.benchmark_group("batched");

    for size in BATCH_SIZES {
        let dom = InMemoryDom::new();
        let div = dom.create_element("div");
        let names: Vec<String> = (0..size).map(|i| format!("data-{i}")).collect();
        let batches = batched_dom_mutations(dom.clone(), div, ObserveOptions::new().attributes(true))
            .stream()
            .expect("observe");

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("pull_notify", size), &names, |b, names| {
            b.iter(|| {
                let next = batches.next_batch();
                for name in names {
                    dom.set_attribute(div, name, "1").expect("set attribute");
                }
                dom.flush();
                let batch = next.now_or_never().expect("resolved").expect("not aborted");
                black_box(batch)
            })
        });
    }

    group.finish();
}

fn bench_flattened_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("flattened");

    for size in BATCH_SIZES {
        let dom = InMemoryDom::new();
        let list = dom.create_element("ul");
        let mut records = dom_mutations(dom.clone(), list, ObserveOptions::new().child_list(true))
            .stream()
            .expect("observe");

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(BenchmarkId::new("drain", size), |b| {
            b.iter(|| {
                let children: Vec<_> = (0..size).map(|_| dom.create_element("li")).collect();
                // Register the pull before the edits land.
                assert!(records.next().now_or_never().is_none());
                for child in &children {
                    dom.append_child(list, *child).expect("append");
                }
                dom.flush();

                let mut drained = 0;
                while let Some(Some(record)) = records.next().now_or_never() {
                    black_box(record.expect("not aborted"));
                    drained += 1;
                    if drained == size {
                        break;
                    }
                }
                for child in &children {
                    dom.remove_child(list, *child).expect("remove");
                }
                // No pull is outstanding, so the removals are dropped.
                dom.flush();
                drained
            })
        });
    }

    group.finish();
}

fn bench_host_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("host_only");

    let dom = InMemoryDom::new();
    let root = dom.create_element("div");
    let text = dom.create_text("");
    dom.append_child(root, text).expect("append");
    let _batches = batched_dom_mutations(
        dom.clone(),
        root,
        ObserveOptions::new().character_data_old_value(true).subtree(true),
    )
    .stream()
    .expect("observe");

    group.bench_function("set_data_flush", |b| {
        b.iter(|| {
            dom.set_data(text, "value").expect("set data");
            black_box(dom.flush())
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_batched_pull,
    bench_flattened_drain,
    bench_host_flush
);
criterion_main!(benches);

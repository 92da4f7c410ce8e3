use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use navmesh_collector::{
    classify, BaseSources, Collector, ContainmentKind, EntityKey, InMemoryLoadOrder,
    OverrideChain, Policy, SourceId,
};

const MODS: usize = 24;
const NAVMESHES: u32 = 4096;

fn sid(name: &str) -> SourceId {
    name.parse().unwrap()
}

/// Skyrim.esm followed by `MODS` plugins; each navmesh is touched by a
/// rotating handful of them so every gate gets exercised.
fn load_order() -> InMemoryLoadOrder<u32> {
    let skyrim = sid("Skyrim.esm");
    let mods: Vec<SourceId> = (0..MODS).map(|i| sid(&format!("Mod{i:02}.esp"))).collect();
    let mut lo = InMemoryLoadOrder::with_sources(std::iter::once(skyrim.clone()).chain(mods.iter().cloned()));

    for id in 0..NAVMESHES {
        let key = EntityKey::new(0x0001_0000 + id, skyrim.clone());
        let containment = if id % 3 == 0 {
            ContainmentKind::Interior
        } else {
            ContainmentKind::Exterior
        };
        lo.insert(&skyrim, &key, containment, 0).unwrap();
        let touches = (id % 5) as usize;
        for step in 0..touches {
            let source = &mods[(id as usize + step * 7) % MODS];
            lo.insert(source, &key, containment, id % (step as u32 + 2)).unwrap();
        }
    }
    lo
}

fn bench_classify(c: &mut Criterion) {
    let base = BaseSources::official();
    let policy = Policy::default();
    let chain = OverrideChain::from_pairs([
        (sid("Skyrim.esm"), 0u32),
        (sid("Update.esm"), 1),
        (sid("ModA.esp"), 2),
        (sid("ModB.esp"), 2),
        (sid("ModC.esp"), 3),
    ])
    .unwrap();

    c.bench_function("classify_five_entry_chain", |b| {
        b.iter(|| {
            classify(
                black_box(&chain),
                ContainmentKind::Interior,
                true,
                black_box(&policy),
                &base,
            )
        });
    });
}

fn bench_collect(c: &mut Criterion) {
    let lo = load_order();
    let base = BaseSources::official();
    let policy = Policy::default();
    let collector = Collector::default();

    let mut group = c.benchmark_group("collect");
    group.throughput(Throughput::Elements(u64::from(NAVMESHES)));
    group.bench_function("sequential", |b| {
        b.iter(|| collector.collect(lo.candidates(), &lo, &policy, &base).unwrap());
    });
    group.bench_function("parallel_4", |b| {
        b.iter(|| {
            collector
                .collect_parallel(lo.candidates(), &lo, &policy, &base, 4)
                .unwrap()
        });
    });
    group.finish();
}

criterion_group!(benches, bench_classify, bench_collect);
criterion_main!(benches);

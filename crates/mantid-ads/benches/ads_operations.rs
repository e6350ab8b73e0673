//! Registry throughput: registration, lookup, group mirroring and name generation

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use mantid_ads::{AdsConfig, AnalysisDataService, HiddenFilter, NameOrder};
use mantid_workspace::{DataWorkspace, Workspace, WorkspaceGroup};
use std::sync::Arc;

fn workspace() -> Arc<dyn Workspace> {
    Arc::new(DataWorkspace::new(vec![0.0; 16]))
}

fn populated(count: usize) -> AnalysisDataService {
    let ads = AnalysisDataService::new(AdsConfig::new());
    for i in 0..count {
        if let Err(err) = ads.add(&format!("ws{i}"), workspace()) {
            panic!("populate: {err}");
        }
    }
    ads
}

fn benches_registry(c: &mut Criterion) {
    let mut group = c.benchmark_group("ads.registry");

    group.bench_function("add_1000", |b| {
        b.iter_batched(
            || AnalysisDataService::new(AdsConfig::new()),
            |ads| {
                for i in 0..1000 {
                    let _ = ads.add(black_box(&format!("ws{i}")), workspace());
                }
                ads
            },
            BatchSize::SmallInput,
        );
    });

    let ads = populated(1000);
    group.bench_function("retrieve_hit", |b| {
        b.iter(|| ads.retrieve(black_box("ws500")).is_ok());
    });
    group.bench_function("retrieve_miss", |b| {
        b.iter(|| ads.retrieve(black_box("absent")).is_err());
    });
    group.bench_function("object_names_sorted", |b| {
        b.iter(|| ads.object_names(NameOrder::Sorted, HiddenFilter::Auto).len());
    });

    group.finish();
}

fn benches_groups(c: &mut Criterion) {
    let mut group = c.benchmark_group("ads.groups");

    group.bench_function("mirror_anonymous_64", |b| {
        b.iter_batched(
            || {
                let members = (0..64).map(|_| workspace()).collect();
                (
                    AnalysisDataService::new(AdsConfig::new()),
                    Arc::new(WorkspaceGroup::with_members(members)),
                )
            },
            |(ads, members)| {
                let _ = ads.add(black_box("G"), members as Arc<dyn Workspace>);
                ads
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("deep_remove_64", |b| {
        b.iter_batched(
            || {
                let ads = AnalysisDataService::new(AdsConfig::new());
                let members = (0..64).map(|_| workspace()).collect();
                let _ = ads.add("G", Arc::new(WorkspaceGroup::with_members(members)) as Arc<dyn Workspace>);
                ads
            },
            |ads| {
                let _ = ads.deep_remove_group(black_box("G"));
                ads
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn benches_naming(c: &mut Criterion) {
    let ads = populated(100);
    c.bench_function("ads.naming/unique_hidden_name", |b| {
        b.iter(|| ads.unique_hidden_name().map(|name| name.len()));
    });
}

criterion_group!(benches, benches_registry, benches_groups, benches_naming);
criterion_main!(benches);

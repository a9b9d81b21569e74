//! Benchmark for path template resolution
//!
//! Resolution runs once per provision call; it should stay well under the
//! cost of the directory creation that follows it.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use hostpath_provisioner::provisioner::{PathTemplate, PathVariables};

fn variables() -> PathVariables {
    let mut vars = PathVariables::new();
    vars.insert("provisioner", "example.com/hostpath");
    vars.insert("pvcUid", "5f0c2a4e-8f7b-4d52-9a53-1f0f8c1f2b11");
    vars.insert("namespace", "team-payments");
    vars.insert("pvcName", "postgres-data-0");
    vars.insert("pvName", "pvc-5f0c2a4e-8f7b-4d52-9a53-1f0f8c1f2b11");
    vars.insert("region", "us-east");
    vars
}

fn bench_default_template(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_template");
    group.throughput(Throughput::Elements(1));

    let vars = variables();
    let template = PathTemplate::default();

    group.bench_function("resolve_default", |b| {
        b.iter(|| template.resolve(black_box(&vars)))
    });

    group.finish();
}

fn bench_nested_template(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_template");
    group.throughput(Throughput::Elements(1));

    let vars = variables();
    let template = PathTemplate::new("{region}/{namespace}/{pvcName}/{pvName}-{namespace}");

    group.bench_function("resolve_nested", |b| {
        b.iter(|| template.resolve(black_box(&vars)))
    });

    let mut annotations = std::collections::BTreeMap::new();
    for i in 0..16 {
        annotations.insert(format!("pv-path-var/key{}", i), format!("value-{}", i));
    }

    group.bench_function("collect_annotation_variables", |b| {
        b.iter(|| {
            let mut vars = variables();
            vars.extend_from_annotations(black_box(&annotations));
            vars
        })
    });

    group.finish();
}

criterion_group!(benches, bench_default_template, bench_nested_template);
criterion_main!(benches);

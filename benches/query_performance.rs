//! Key resolution micro-benchmarks
//!
//! Measures query, update and key enumeration cost on wide and deep trees.

use arbor::{HierarchicalConfiguration, TreeNode};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

/// `tables.table(i).fields.field(j).name` for `tables` x `fields` entries.
fn wide_config(tables: usize, fields: usize) -> HierarchicalConfiguration {
    let tables_node = TreeNode::new("tables").with_children((0..tables).map(|t| {
        TreeNode::new("table")
            .with_attribute("id", t)
            .with_child(TreeNode::new("name").with_value(format!("table{t}")))
            .with_child(TreeNode::new("fields").with_children((0..fields).map(|f| {
                TreeNode::new("field").with_child(TreeNode::new("name").with_value(format!("field{f}")))
            })))
    }));
    HierarchicalConfiguration::with_root(TreeNode::new("database").with_child(tables_node)).unwrap()
}

/// A single chain `n.n.n...` of the given depth with a value at the bottom.
fn deep_config(depth: usize) -> (HierarchicalConfiguration, String) {
    let mut node = TreeNode::new("n").with_value("leaf");
    for _ in 1..depth {
        node = TreeNode::new("n").with_child(node);
    }
    let key = vec!["n"; depth].join(".");
    (HierarchicalConfiguration::with_root(TreeNode::new("root").with_child(node)).unwrap(), key)
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");
    for size in [10, 100] {
        let config = wide_config(size, size);
        group.bench_with_input(BenchmarkId::new("indexed", size), &config, |b, config| {
            b.iter(|| config.get_property(black_box("tables.table(3).fields.field(7).name")))
        });
        group.bench_with_input(BenchmarkId::new("ambiguous", size), &config, |b, config| {
            b.iter(|| config.get_list(black_box("tables.table.fields.field.name")))
        });
    }
    for depth in [10, 100] {
        let (config, key) = deep_config(depth);
        group.bench_with_input(BenchmarkId::new("deep", depth), &key, |b, key| {
            b.iter(|| config.get_property(black_box(key)))
        });
    }
    group.finish();
}

fn bench_updates(c: &mut Criterion) {
    let mut group = c.benchmark_group("update");
    let config = wide_config(50, 20);
    group.bench_function("set_indexed", |b| {
        b.iter(|| config.set_property(black_box("tables.table(10).name"), "renamed"))
    });
    group.bench_function("add_and_clear", |b| {
        b.iter(|| {
            let _ = config.add_property("scratch.entry", 1);
            config.clear_tree("scratch")
        })
    });
    group.finish();
}

fn bench_key_enumeration(c: &mut Criterion) {
    let mut group = c.benchmark_group("keys");
    for size in [10, 50] {
        let config = wide_config(size, size);
        group.bench_with_input(BenchmarkId::new("defined", size), &config, |b, config| {
            b.iter(|| config.get_keys())
        });
        group.bench_with_input(BenchmarkId::new("canonical", size), &config, |b, config| {
            b.iter(|| config.canonical_keys())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_queries, bench_updates, bench_key_enumeration);
criterion_main!(benches);

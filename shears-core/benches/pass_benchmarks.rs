//! Performance benchmarks for SHEARS passes
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use shears_core::build::*;
use shears_core::dce::{eliminate_dead_code, DceMode};
use shears_core::minify::{minify_globals, NameGenerator};
use shears_core::reachability::emit_dce_graph;
use shears_core::{Diagnostics, Node};

/// Synthetic glue: `count` imports, each backed by a JS function that
/// declares a dead local and calls the next one
fn synthetic_glue(count: usize) -> Node {
    let mut body = Vec::new();
    let mut properties = Vec::new();
    for i in 0..count {
        let name = format!("_js{}", i);
        let next = format!("_js{}", (i + 1) % count);
        body.push(function(
            &name,
            &["value"],
            vec![
                var("scratch", Some(binary("*", ident("value"), num(2.0)))),
                ret(Some(call(ident(&next), vec![ident("value")]))),
            ],
        ));
        properties.push(property(&format!("import{}", i), ident(&name)));
    }
    body.push(var("wasmImports", Some(object(properties))));
    for i in 0..count {
        body.push(var(
            &format!("_export{}", i),
            Some(index(ident("wasmExports"), str_lit(&format!("export{}", i)))),
        ));
    }
    body.push(expr_stmt(call(ident("_export0"), vec![])));
    program(body)
}

fn bench_dce(c: &mut Criterion) {
    let mut group = c.benchmark_group("dce");

    for size in [10, 100, 1000] {
        let glue = synthetic_glue(size);
        group.bench_with_input(BenchmarkId::new("single_shot", size), &glue, |b, glue| {
            b.iter(|| {
                let mut node = glue.clone();
                eliminate_dead_code(black_box(&mut node), DceMode::SingleShot).unwrap()
            });
        });
        group.bench_with_input(BenchmarkId::new("aggressive", size), &glue, |b, glue| {
            b.iter(|| {
                let mut node = glue.clone();
                eliminate_dead_code(black_box(&mut node), DceMode::Aggressive).unwrap()
            });
        });
    }

    group.finish();
}

fn bench_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("emit_dce_graph");

    for size in [10, 100, 1000] {
        let glue = synthetic_glue(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &glue, |b, glue| {
            b.iter(|| {
                let mut node = glue.clone();
                let graph = emit_dce_graph(black_box(&mut node), None, &Diagnostics::default())
                    .unwrap();
                graph.to_json().unwrap()
            });
        });
    }

    group.finish();
}

fn bench_minify(c: &mut Criterion) {
    let mut group = c.benchmark_group("minify");

    group.bench_function("generate_10k_names", |b| {
        b.iter(|| {
            let mut generator = NameGenerator::new();
            black_box(generator.get(10_000).len())
        });
    });

    let wrapper = program(vec![function(
        "instantiate",
        &["imports"],
        match synthetic_glue(200) {
            Node::Program { body, .. } => body,
            _ => Vec::new(),
        },
    )]);
    group.bench_function("globals_200_functions", |b| {
        b.iter(|| {
            let mut node = wrapper.clone();
            minify_globals(black_box(&mut node), "instantiate", &[]).unwrap()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_dce, bench_graph, bench_minify);

criterion_main!(benches);

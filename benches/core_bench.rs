//! Benchmarks for mrshim core operations.
//!
//! Run with: cargo bench
//!
//! Results include 95% confidence intervals via Criterion.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mrshim::config::Settings;
use mrshim::core::parser::parse_file;
use mrshim::core::typemap::TypeMappingTable;
use mrshim::Engine;

/// A package with `n` mapper structs sharing one context interface.
fn generate_package(n: usize) -> String {
    let mut src = String::from("package bench\n\ntype Context interface {\n\tWrite(k string, v int)\n}\n");
    for i in 0..n {
        src.push_str(&format!(
            "\n// M{i} is generated.\n// @mapper\ntype M{i} struct {{\n\tcount int\n\tname  string\n}}\n\n\
             func NewM{i}() *M{i} {{ return &M{i}{{}} }}\n\n\
             func (m *M{i}) Map(k int, v string, ctx Context) {{\n\tif len(v) > 0 {{\n\t\tctx.Write(v, k)\n\t}}\n}}\n"
        ));
    }
    src
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_file");
    for n in [1, 10, 100] {
        let src = generate_package(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &src, |b, src| {
            b.iter(|| {
                let file = parse_file(black_box(src)).unwrap();
                black_box(file);
            });
        });
    }
    group.finish();
}

fn bench_engine_run(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::from_settings(&Settings::default());

    let mut group = c.benchmark_group("engine_run");
    for n in [1, 10, 100] {
        let pkg = dir.path().join(format!("bench{n}"));
        std::fs::create_dir_all(&pkg).unwrap();
        std::fs::write(pkg.join("bench.go"), generate_package(n)).unwrap();
        let inputs = vec![pkg.to_string_lossy().to_string()];

        group.bench_with_input(BenchmarkId::from_parameter(n), &inputs, |b, inputs| {
            b.iter(|| {
                let out = engine.run(black_box(inputs.as_slice())).unwrap();
                assert_eq!(out.len(), n);
                black_box(out);
            });
        });
    }
    group.finish();
}

fn bench_typemap(c: &mut Criterion) {
    let table = TypeMappingTable::standard();
    let inputs = ["int", "string", "[]int", "complex128", "*pkg.Thing"];
    c.bench_function("typemap_lookup", |b| {
        b.iter(|| {
            for t in &inputs {
                black_box(table.wire_type(black_box(t)));
                black_box(table.value_in_wire_type(black_box(t)));
                black_box(table.host_type(black_box(t)));
            }
        });
    });
}

criterion_group!(benches, bench_parse, bench_engine_run, bench_typemap);
criterion_main!(benches);

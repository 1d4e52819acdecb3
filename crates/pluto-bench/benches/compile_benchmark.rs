//! Compiler Performance Benchmarks
//!
//! Run with: `cargo bench --package pluto-bench compile_benchmark`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use pluto_core::{GrammarRegistry, PlutoParser, compile_with};
use std::hint::black_box;

const SIMPLE_PROCEDURE: &str = r#"procedure
  main
    Target Temp := 293.15 K;
    log "heater armed";
  end main
end procedure
"#;

const COMPLEX_PROCEDURE: &str = r#"procedure
  declare
    event Heater Ready described by "heater reached setpoint",
    variable Target Temp of type real
  end declare
  preconditions
    wait until value of Temperature of Heater >= 290 K timeout 5 min;
  end preconditions
  main
    initiate and confirm Heater of Thermal with Level := 3 end with refer by Heater Call;
    if Target Temp > 300 K AND NOT Overheat then
      log "hot";
    else
      wait for 1 min 30 s;
    end if;
    initiate and confirm step Warm Up
      main
        Target Temp := Target Temp + 1 K;
      end main
    end step in case confirmed : continue aborted : terminate end case;
  end main
end procedure
"#;

fn procedure_with_statements(count: usize) -> String {
    let mut source = String::from("procedure main\n");
    for i in 0..count {
        source.push_str(&format!("  Counter {i} := Counter {i} * 2 + 0x1F;\n"));
    }
    source.push_str("end main end procedure\n");
    source
}

/// Benchmark building the grammars from their internal text
fn bench_grammar_build(c: &mut Criterion) {
    c.bench_function("grammar_registry_build", |b| {
        b.iter(|| black_box(GrammarRegistry::from_sources(&Default::default()).unwrap()));
    });
}

/// Benchmark parse and full compilation of representative procedures
fn bench_compile(c: &mut Criterion) {
    let registry = GrammarRegistry::global().unwrap();
    let mut group = c.benchmark_group("compile");

    group.bench_function("parse_complex", |b| {
        let parser = PlutoParser::with_registry(registry);
        b.iter(|| black_box(parser.parse(COMPLEX_PROCEDURE).unwrap()));
    });

    group.bench_function("simple_procedure", |b| {
        b.iter(|| black_box(compile_with(registry, SIMPLE_PROCEDURE, "simple").unwrap()));
    });

    group.bench_function("complex_procedure", |b| {
        b.iter(|| black_box(compile_with(registry, COMPLEX_PROCEDURE, "complex").unwrap()));
    });

    group.finish();
}

/// Benchmark compilation of growing procedures
fn bench_large_procedures(c: &mut Criterion) {
    let registry = GrammarRegistry::global().unwrap();
    let mut group = c.benchmark_group("large_procedures");

    for &size in &[10, 50, 200] {
        let source = procedure_with_statements(size);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{size}_statements")),
            &source,
            |b, source| b.iter(|| black_box(compile_with(registry, source, "large").unwrap())),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_grammar_build, bench_compile, bench_large_procedures);
criterion_main!(benches);

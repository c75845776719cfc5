//! Benchmarks for compilation and execution on the reference target.

use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tensorgraph_infer::{Session, TargetRegistry};
use tensorgraph_ir::{generate_argument, ElementType, Operator, Program, Shape};

fn chain_program(shape: &Shape, depth: usize) -> Program {
    let mut program = Program::new();
    let mut main = program.main_module();
    let x = main.add_parameter("x", shape.clone()).unwrap();
    let y = main.add_parameter("y", shape.clone()).unwrap();
    let mut acc = main.add_instruction(Operator::Add, &[x, y]).unwrap();
    for _ in 1..depth {
        acc = main.add_instruction(Operator::Mul, &[acc, y]).unwrap();
    }
    main.add_return(&[acc]).unwrap();
    program
}

fn bench_compile(c: &mut Criterion) {
    let registry = TargetRegistry::with_builtins();
    let shape = Shape::tensor(ElementType::Float, vec![32, 32]).unwrap();

    c.bench_function("compile_chain_depth_16", |b| {
        b.iter(|| {
            let mut session = Session::new(chain_program(&shape, 16));
            session.compile(&registry, "ref").unwrap();
            black_box(session);
        })
    });
}

fn bench_run(c: &mut Criterion) {
    let registry = TargetRegistry::with_builtins();
    let shape = Shape::tensor(ElementType::Float, vec![32, 32]).unwrap();

    let mut session = Session::new(chain_program(&shape, 16));
    session.compile(&registry, "ref").unwrap();

    let mut params = HashMap::new();
    params.insert("x".to_string(), generate_argument(&shape, 1));
    params.insert("y".to_string(), generate_argument(&shape, 2));

    c.bench_function("run_chain_depth_16_32x32", |b| {
        b.iter(|| black_box(session.run(&params).unwrap()))
    });
}

criterion_group!(benches, bench_compile, bench_run);
criterion_main!(benches);

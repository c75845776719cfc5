//! End-to-end build/compile/run tests against the reference target.

use std::collections::HashMap;
use std::sync::Arc;

use tensorgraph_compiler::PipelineConfig;
use tensorgraph_infer::{
    CompileConfig, CompileError, ExecError, ExecutionHook, RefTarget, Session, Target,
    TargetRegistry,
};
use tensorgraph_ir::{
    fill_argument, generate_argument, Argument, ElementType, IrError, OpAttrs, OpDescriptor,
    OpRegistry, Operator, Program, Scalar, Shape,
};

fn float_3x3() -> Shape {
    Shape::tensor(ElementType::Float, vec![3, 3]).unwrap()
}

fn cond_shape() -> Shape {
    Shape::with_strides(ElementType::Bool, vec![1], vec![0]).unwrap()
}

/// Main module adding two 3x3 float parameters.
fn add_program() -> Program {
    let mut program = Program::new();
    let mut main = program.main_module();
    let x = main.add_parameter("x", float_3x3()).unwrap();
    let y = main.add_parameter("y", float_3x3()).unwrap();
    let sum = main.add_instruction(Operator::Add, &[x, y]).unwrap();
    main.add_return(&[sum]).unwrap();
    program
}

/// The conditional-select program: branches compute `add(x, y)` and
/// `mul(x, y)`, selected by a zero-stride boolean condition.
fn select_program() -> Program {
    let mut program = Program::new();
    let mut main = program.main_module();
    let cond = main.add_parameter("cond", cond_shape()).unwrap();
    let x = main.add_parameter("x", float_3x3()).unwrap();
    let y = main.add_parameter("y", float_3x3()).unwrap();

    let then_mod = program.create_module("If_0_if").unwrap();
    let t = program
        .edit(then_mod)
        .add_instruction(Operator::Add, &[x, y])
        .unwrap();
    program.edit(then_mod).add_return(&[t]).unwrap();

    let else_mod = program.create_module("If_0_else").unwrap();
    let e = program
        .edit(else_mod)
        .add_instruction(Operator::Mul, &[x, y])
        .unwrap();
    program.edit(else_mod).add_return(&[e]).unwrap();

    let if_ins = program
        .main_module()
        .add_instruction_with_modules(Operator::If, &[cond], &[then_mod, else_mod])
        .unwrap();
    let ret = program
        .main_module()
        .add_instruction(Operator::GetTupleElem { index: 0 }, &[if_ins])
        .unwrap();
    program.main_module().add_return(&[ret]).unwrap();
    program
}

#[test]
fn test_elementwise_add() {
    let registry = TargetRegistry::with_builtins();
    let mut session = Session::new(add_program());
    session.compile(&registry, "ref").unwrap();

    let x = generate_argument(&float_3x3(), 1);
    let y = generate_argument(&float_3x3(), 2);
    let mut params = HashMap::new();
    params.insert("x".to_string(), x.clone());
    params.insert("y".to_string(), y.clone());

    let outputs = session.run(&params).unwrap();
    assert_eq!(outputs.len(), 1);
    let out = outputs[0].to_vec::<f32>().unwrap();
    let xs = x.to_vec::<f32>().unwrap();
    let ys = y.to_vec::<f32>().unwrap();
    for i in 0..out.len() {
        assert_eq!(out[i], xs[i] + ys[i]);
    }
}

#[test]
fn test_conditional_select() {
    let registry = TargetRegistry::with_builtins();
    let x = generate_argument(&float_3x3(), 10);
    let y = generate_argument(&float_3x3(), 11);

    let run = |cond: bool| {
        let mut session = Session::new(select_program());
        session.compile(&registry, "ref").unwrap();
        let mut params = HashMap::new();
        params.insert("cond".to_string(), fill_argument(&cond_shape(), Scalar::Bool(cond)).unwrap());
        params.insert("x".to_string(), x.clone());
        params.insert("y".to_string(), y.clone());
        session.run(&params).unwrap().remove(0)
    };

    let xs = x.to_vec::<f32>().unwrap();
    let ys = y.to_vec::<f32>().unwrap();

    let when_true = run(true).to_vec::<f32>().unwrap();
    let when_false = run(false).to_vec::<f32>().unwrap();
    for i in 0..xs.len() {
        assert_eq!(when_true[i], xs[i] + ys[i]);
        assert_eq!(when_false[i], xs[i] * ys[i]);
    }
}

#[test]
fn test_identity_select_returns_bound_argument() {
    // The spec scenario: branches returning identity(x) / identity(y).
    let mut program = Program::new();
    let mut main = program.main_module();
    let cond = main.add_parameter("cond", cond_shape()).unwrap();
    let x = main.add_parameter("x", float_3x3()).unwrap();
    let y = main.add_parameter("y", float_3x3()).unwrap();

    let then_mod = program.create_module("then").unwrap();
    let t = program
        .edit(then_mod)
        .add_instruction(Operator::Identity, &[x])
        .unwrap();
    program.edit(then_mod).add_return(&[t]).unwrap();

    let else_mod = program.create_module("else").unwrap();
    let e = program
        .edit(else_mod)
        .add_instruction(Operator::Identity, &[y])
        .unwrap();
    program.edit(else_mod).add_return(&[e]).unwrap();

    let if_ins = program
        .main_module()
        .add_instruction_with_modules(Operator::If, &[cond], &[then_mod, else_mod])
        .unwrap();
    let ret = program
        .main_module()
        .add_instruction(Operator::GetTupleElem { index: 0 }, &[if_ins])
        .unwrap();
    program.main_module().add_return(&[ret]).unwrap();

    let registry = TargetRegistry::with_builtins();
    let mut session = Session::new(program);
    session.compile(&registry, "ref").unwrap();

    let x_arg = generate_argument(&float_3x3(), 20);
    let y_arg = generate_argument(&float_3x3(), 21);
    let mut params = HashMap::new();
    params.insert("x".to_string(), x_arg.clone());
    params.insert("y".to_string(), y_arg.clone());

    params.insert(
        "cond".to_string(),
        fill_argument(&cond_shape(), Scalar::Bool(true)).unwrap(),
    );
    assert_eq!(session.run(&params).unwrap()[0], x_arg);

    params.insert(
        "cond".to_string(),
        fill_argument(&cond_shape(), Scalar::Bool(false)).unwrap(),
    );
    assert_eq!(session.run(&params).unwrap()[0], y_arg);
}

#[test]
fn test_determinism() {
    let registry = TargetRegistry::with_builtins();
    let mut session = Session::new(add_program());
    session.compile(&registry, "ref").unwrap();

    let mut params = HashMap::new();
    params.insert("x".to_string(), generate_argument(&float_3x3(), 5));
    params.insert("y".to_string(), generate_argument(&float_3x3(), 6));

    let first = session.run(&params).unwrap();
    let second = session.run(&params).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_run_before_compile_fails() {
    let session = Session::new(add_program());
    let result = session.run(&HashMap::new());
    assert!(matches!(result, Err(ExecError::NotCompiled)));
}

#[test]
fn test_missing_argument() {
    let registry = TargetRegistry::with_builtins();
    let mut session = Session::new(add_program());
    session.compile(&registry, "ref").unwrap();

    let mut params = HashMap::new();
    params.insert("x".to_string(), generate_argument(&float_3x3(), 0));
    assert!(matches!(
        session.run(&params),
        Err(ExecError::MissingArgument { param }) if param == "y"
    ));
}

#[test]
fn test_argument_shape_mismatch() {
    let registry = TargetRegistry::with_builtins();
    let mut session = Session::new(add_program());
    session.compile(&registry, "ref").unwrap();

    let wrong = Shape::tensor(ElementType::Float, vec![2, 2]).unwrap();
    let mut params = HashMap::new();
    params.insert("x".to_string(), generate_argument(&wrong, 0));
    params.insert("y".to_string(), generate_argument(&float_3x3(), 0));
    assert!(matches!(
        session.run(&params),
        Err(ExecError::ArgumentShapeMismatch { param, .. }) if param == "x"
    ));
}

/// Counts instruction completions per module.
#[derive(Default)]
struct CountingHook {
    completed: HashMap<String, usize>,
}

impl ExecutionHook for CountingHook {
    fn on_instruction_complete(&mut self, module: &str, _index: usize, _op: &Operator) {
        *self.completed.entry(module.to_string()).or_default() += 1;
    }
}

#[test]
fn test_branch_exclusivity() {
    let registry = TargetRegistry::with_builtins();
    let mut session = Session::new(select_program());
    session.compile(&registry, "ref").unwrap();

    let mut params = HashMap::new();
    params.insert("x".to_string(), generate_argument(&float_3x3(), 30));
    params.insert("y".to_string(), generate_argument(&float_3x3(), 31));
    params.insert(
        "cond".to_string(),
        fill_argument(&cond_shape(), Scalar::Bool(true)).unwrap(),
    );

    let mut hook = CountingHook::default();
    session.run_with_hooks(&params, &mut [&mut hook]).unwrap();
    assert_eq!(hook.completed.get("If_0_if"), Some(&1));
    assert_eq!(hook.completed.get("If_0_else"), None);

    params.insert(
        "cond".to_string(),
        fill_argument(&cond_shape(), Scalar::Bool(false)).unwrap(),
    );
    let mut hook = CountingHook::default();
    session.run_with_hooks(&params, &mut [&mut hook]).unwrap();
    assert_eq!(hook.completed.get("If_0_if"), None);
    assert_eq!(hook.completed.get("If_0_else"), Some(&1));
}

#[test]
fn test_unknown_target() {
    let registry = TargetRegistry::with_builtins();
    let mut session = Session::new(add_program());
    assert!(matches!(
        session.compile(&registry, "gpu"),
        Err(CompileError::UnknownTarget { .. })
    ));
}

/// An extension operator the reference target has no kernel for.
struct OpaqueOp;

impl OpDescriptor for OpaqueOp {
    fn name(&self) -> &str {
        "opaque"
    }

    fn make(&self, _attrs: &OpAttrs) -> Result<Operator, IrError> {
        Ok(Operator::Extension {
            name: "opaque".into(),
            attrs: OpAttrs::new(),
        })
    }

    fn infer_shape(
        &self,
        _op: &Operator,
        inputs: &[Shape],
        _branches: &[Vec<Shape>],
    ) -> Result<Shape, IrError> {
        Ok(inputs[0].clone())
    }
}

#[test]
fn test_unsupported_operator() {
    let mut ops = OpRegistry::with_builtins();
    ops.register(Arc::new(OpaqueOp)).unwrap();

    let mut program = Program::with_registry(ops.clone());
    let mut main = program.main_module();
    let x = main.add_parameter("x", float_3x3()).unwrap();
    let op = ops.make("opaque", &OpAttrs::new()).unwrap();
    let out = main.add_instruction(op, &[x]).unwrap();
    main.add_return(&[out]).unwrap();

    let registry = TargetRegistry::with_builtins();
    let mut session = Session::new(program);
    assert!(matches!(
        session.compile(&registry, "ref"),
        Err(CompileError::UnsupportedOperator { op, .. }) if op == "opaque"
    ));
}

#[test]
fn test_literal_broadcast_add() {
    let mut program = Program::new();
    let row_shape = Shape::tensor(ElementType::Float, vec![3]).unwrap();
    let row = Argument::from_slice(row_shape, &[10.0f32, 20.0, 30.0]).unwrap();

    let mut main = program.main_module();
    let x = main.add_parameter("x", float_3x3()).unwrap();
    let lit = main.add_literal(row).unwrap();
    let spread = main
        .add_instruction(
            Operator::Broadcast {
                axis: 1,
                out_lens: vec![3, 3],
            },
            &[lit],
        )
        .unwrap();
    let sum = main.add_instruction(Operator::Add, &[x, spread]).unwrap();
    main.add_return(&[sum]).unwrap();

    let registry = TargetRegistry::with_builtins();
    let mut session = Session::new(program);
    session.compile(&registry, "ref").unwrap();

    let x_arg = generate_argument(&float_3x3(), 40);
    let mut params = HashMap::new();
    params.insert("x".to_string(), x_arg.clone());
    let out = session.run(&params).unwrap()[0].to_vec::<f32>().unwrap();
    let xs = x_arg.to_vec::<f32>().unwrap();
    let row = [10.0f32, 20.0, 30.0];
    for i in 0..3 {
        for j in 0..3 {
            assert_eq!(out[i * 3 + j], xs[i * 3 + j] + row[j]);
        }
    }
}

#[test]
fn test_multiple_outputs_are_ordered() {
    let mut program = Program::new();
    let mut main = program.main_module();
    let x = main.add_parameter("x", float_3x3()).unwrap();
    let y = main.add_parameter("y", float_3x3()).unwrap();
    let sum = main.add_instruction(Operator::Add, &[x, y]).unwrap();
    let product = main.add_instruction(Operator::Mul, &[x, y]).unwrap();
    main.add_return(&[sum, product]).unwrap();

    let registry = TargetRegistry::with_builtins();
    let mut session = Session::new(program);
    session.compile(&registry, "ref").unwrap();

    let x_arg = generate_argument(&float_3x3(), 50);
    let y_arg = generate_argument(&float_3x3(), 51);
    let mut params = HashMap::new();
    params.insert("x".to_string(), x_arg.clone());
    params.insert("y".to_string(), y_arg.clone());

    let outputs = session.run(&params).unwrap();
    assert_eq!(outputs.len(), 2);
    let xs = x_arg.to_vec::<f32>().unwrap();
    let ys = y_arg.to_vec::<f32>().unwrap();
    let sums = outputs[0].to_vec::<f32>().unwrap();
    let products = outputs[1].to_vec::<f32>().unwrap();
    for i in 0..xs.len() {
        assert_eq!(sums[i], xs[i] + ys[i]);
        assert_eq!(products[i], xs[i] * ys[i]);
    }
}

#[test]
fn test_recompile_replaces_binding() {
    /// Reference kernels under a different backend name.
    struct ShadowTarget {
        inner: RefTarget,
    }

    impl Target for ShadowTarget {
        fn name(&self) -> &str {
            "shadow"
        }

        fn kernel(
            &self,
            op: &Operator,
            inputs: &[Shape],
        ) -> Option<tensorgraph_infer::Kernel> {
            self.inner.kernel(op, inputs)
        }
    }

    let mut registry = TargetRegistry::with_builtins();
    registry
        .register(Arc::new(ShadowTarget {
            inner: RefTarget::new(),
        }))
        .unwrap();

    let mut session = Session::new(add_program());
    session.compile(&registry, "ref").unwrap();
    assert_eq!(session.compiled().unwrap().target_name(), "ref");

    session.compile(&registry, "shadow").unwrap();
    assert_eq!(session.compiled().unwrap().target_name(), "shadow");

    let mut params = HashMap::new();
    params.insert("x".to_string(), generate_argument(&float_3x3(), 60));
    params.insert("y".to_string(), generate_argument(&float_3x3(), 61));
    assert_eq!(session.run(&params).unwrap().len(), 1);
}

#[test]
fn test_compile_with_explicit_config() {
    let registry = TargetRegistry::with_builtins();
    let target = registry.get("ref").unwrap();

    let mut session = Session::new(select_program());
    session
        .compile_with(
            target.as_ref(),
            &CompileConfig {
                pipeline: PipelineConfig::none(),
            },
        )
        .unwrap();

    let mut params = HashMap::new();
    params.insert("x".to_string(), generate_argument(&float_3x3(), 70));
    params.insert("y".to_string(), generate_argument(&float_3x3(), 71));
    params.insert(
        "cond".to_string(),
        fill_argument(&cond_shape(), Scalar::Bool(true)).unwrap(),
    );
    assert_eq!(session.run(&params).unwrap().len(), 1);
}

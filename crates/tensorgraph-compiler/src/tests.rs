//! Unit tests for the pass pipeline.

use tensorgraph_ir::{
    generate_argument, validate_program, ElementType, Operator, Program, Shape, ValueId,
};

use crate::{PassError, PassPipeline, PipelineConfig};

fn float_2x2() -> Shape {
    Shape::tensor(ElementType::Float, vec![2, 2]).unwrap()
}

fn cond_shape() -> Shape {
    Shape::with_strides(ElementType::Bool, vec![1], vec![0]).unwrap()
}

#[test]
fn test_identity_chain_collapses() {
    let mut program = Program::new();
    let mut main = program.main_module();
    let x = main.add_parameter("x", float_2x2()).unwrap();
    let a = main.add_instruction(Operator::Identity, &[x]).unwrap();
    let b = main.add_instruction(Operator::Identity, &[a]).unwrap();
    main.add_return(&[b]).unwrap();

    let stats = PassPipeline::with_default_config().run(&mut program).unwrap();
    assert!(stats.total_rewrites() > 0);

    let main_id = program.main_id();
    assert!(program.module(main_id).is_empty());
    assert_eq!(program.module(main_id).returns(), Some(&[x][..]));
    assert!(validate_program(&program).is_ok());
}

#[test]
fn test_auto_contiguous_after_transpose() {
    let mut program = Program::new();
    let mut main = program.main_module();
    let x = main.add_parameter("x", float_2x2()).unwrap();
    let t = main
        .add_instruction(
            Operator::Transpose {
                permutation: vec![1, 0],
            },
            &[x],
        )
        .unwrap();
    main.add_return(&[t]).unwrap();

    let before = program.module_output_shapes(program.main_id()).unwrap();
    assert!(!before[0].as_tensor().unwrap().standard());
    assert!(before[0].as_tensor().unwrap().transposed());

    PassPipeline::with_default_config().run(&mut program).unwrap();

    let after = program.module_output_shapes(program.main_id()).unwrap();
    assert!(after[0].as_tensor().unwrap().standard());
    assert!(!after[0].as_tensor().unwrap().transposed());
    assert!(validate_program(&program).is_ok());
}

#[test]
fn test_auto_contiguous_after_literal_broadcast() {
    let mut program = Program::new();
    let row = Shape::tensor(ElementType::Float, vec![2]).unwrap();
    let mut main = program.main_module();
    let lit = main.add_literal(generate_argument(&row, 3)).unwrap();
    let b = main
        .add_instruction(
            Operator::Broadcast {
                axis: 1,
                out_lens: vec![2, 2],
            },
            &[lit],
        )
        .unwrap();
    main.add_return(&[b]).unwrap();

    let before = program.module_output_shapes(program.main_id()).unwrap();
    assert!(before[0].as_tensor().unwrap().broadcasted());

    PassPipeline::with_default_config().run(&mut program).unwrap();

    let after = program.module_output_shapes(program.main_id()).unwrap();
    assert!(after[0].as_tensor().unwrap().standard());
    assert!(!after[0].as_tensor().unwrap().broadcasted());
}

#[test]
fn test_dead_code_respects_capture() {
    let mut program = Program::new();
    let mut main = program.main_module();
    let cond = main.add_parameter("cond", cond_shape()).unwrap();
    let x = main.add_parameter("x", float_2x2()).unwrap();
    let y = main.add_parameter("y", float_2x2()).unwrap();
    // Captured by the then-branch; must stay alive.
    let captured = main.add_instruction(Operator::Mul, &[x, y]).unwrap();
    // Feeds nothing; must be removed.
    let dead = main.add_instruction(Operator::Add, &[x, x]).unwrap();

    let then_mod = program.create_module("then").unwrap();
    let t = program
        .edit(then_mod)
        .add_instruction(Operator::Identity, &[captured])
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

    let config = PipelineConfig {
        enable_eliminate_identity: false,
        enable_auto_contiguous: false,
        ..PipelineConfig::default()
    };
    let stats = PassPipeline::new(config).run(&mut program).unwrap();
    assert_eq!(stats.total_rewrites(), 1);

    let main_id = program.main_id();
    let ops: Vec<&str> = program
        .module(main_id)
        .instructions()
        .iter()
        .map(|ins| ins.op.name())
        .collect();
    assert_eq!(ops, vec!["mul", "if", "get_tuple_elem"]);
    assert!(validate_program(&program).is_ok());
    let _ = dead;
}

#[test]
fn test_pipeline_is_idempotent() {
    let mut program = Program::new();
    let mut main = program.main_module();
    let x = main.add_parameter("x", float_2x2()).unwrap();
    let t = main
        .add_instruction(
            Operator::Transpose {
                permutation: vec![1, 0],
            },
            &[x],
        )
        .unwrap();
    let i = main.add_instruction(Operator::Identity, &[t]).unwrap();
    let unused = main.add_instruction(Operator::Neg, &[x]).unwrap();
    main.add_return(&[i]).unwrap();
    let _ = unused;

    let pipeline = PassPipeline::with_default_config();
    let first = pipeline.run(&mut program).unwrap();
    assert!(first.total_rewrites() > 0);

    let second = pipeline.run(&mut program).unwrap();
    assert_eq!(second.total_rewrites(), 0);
    assert_eq!(second.iterations, 1);
}

#[test]
fn test_shape_preservation_is_enforced() {
    use crate::Pass;

    struct BreakReturn;

    impl Pass for BreakReturn {
        fn name(&self) -> &str {
            "break_return"
        }

        fn apply(&self, program: &mut Program) -> Result<usize, PassError> {
            let main = program.main_id();
            let from = ValueId::Param(tensorgraph_ir::ParamId { module: main, index: 0 });
            let to = ValueId::Param(tensorgraph_ir::ParamId { module: main, index: 1 });
            Ok(program.replace_uses(from, to, None))
        }
    }

    let mut program = Program::new();
    let other = Shape::tensor(ElementType::Float, vec![3, 3]).unwrap();
    let mut main = program.main_module();
    let x = main.add_parameter("x", float_2x2()).unwrap();
    main.add_parameter("y", other).unwrap();
    main.add_return(&[x]).unwrap();

    let mut pipeline = PassPipeline::new(PipelineConfig::none());
    pipeline.push(Box::new(BreakReturn));
    assert!(matches!(
        pipeline.run(&mut program),
        Err(PassError::ShapeNotPreserved { .. })
    ));
}

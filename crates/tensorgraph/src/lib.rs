//! Tensorgraph — computation-graph IR and inference execution engine.
//!
//! This is the umbrella crate re-exporting the layers:
//!
//! - **Graph layer**: `ir` — shapes, arguments, operators, programs.
//! - **Lowering layer**: `compiler` — rewrite passes and the pass pipeline.
//! - **Execution layer**: `infer` — targets, compilation, the interpreter.
//!
//! The most common entry points are re-exported at the top level:
//!
//! ```rust
//! use std::collections::HashMap;
//! use tensorgraph::{
//!     generate_argument, ElementType, Operator, Program, Session, Shape, TargetRegistry,
//! };
//!
//! let mut program = Program::new();
//! let shape = Shape::tensor(ElementType::Float, vec![3, 3]).unwrap();
//! let mut main = program.main_module();
//! let x = main.add_parameter("x", shape.clone()).unwrap();
//! let y = main.add_parameter("y", shape.clone()).unwrap();
//! let sum = main.add_instruction(Operator::Add, &[x, y]).unwrap();
//! main.add_return(&[sum]).unwrap();
//!
//! let registry = TargetRegistry::with_builtins();
//! let mut session = Session::new(program);
//! session.compile(&registry, "ref").unwrap();
//!
//! let mut params = HashMap::new();
//! params.insert("x".to_string(), generate_argument(&shape, 0));
//! params.insert("y".to_string(), generate_argument(&shape, 1));
//! let outputs = session.run(&params).unwrap();
//! assert_eq!(outputs.len(), 1);
//! ```

pub use tensorgraph_compiler as compiler;
pub use tensorgraph_infer as infer;
pub use tensorgraph_ir as ir;

pub use tensorgraph_infer::{
    compile, CompileConfig, CompiledProgram, ExecError, RefTarget, Session, Target, TargetRegistry,
};
pub use tensorgraph_ir::{
    fill_argument, generate_argument, Argument, ElementType, Nested, OpRegistry, Operator,
    Program, Scalar, Shape,
};

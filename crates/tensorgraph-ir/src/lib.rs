//! # Tensorgraph IR
//!
//! Computation-graph intermediate representation for inference workloads.
//!
//! A [`Program`] is a set of named [`Module`]s — ordered DAGs of
//! [`Instruction`]s over typed tensor operands — with one distinguished
//! `main` module. Control flow is expressed with nested sub-modules: an `if`
//! instruction references two branch modules whose outputs must agree, and
//! produces a tuple destructured with `get_tuple_elem`.
//!
//! ## Core components
//!
//! - [`Shape`] / [`TensorShape`]: element type, dimension lengths and
//!   strides, with layout queries (`standard`, `packed`, `broadcasted`,
//!   `transposed`). Tuple shapes are first-class for multi-output
//!   instructions.
//! - [`Argument`]: a concrete tensor value (shape + owned bytes), with
//!   nested-list conversion and deterministic generation helpers for test
//!   fixtures.
//! - [`Operator`] / [`OpRegistry`]: a closed built-in operator set with
//!   per-operator shape inference, plus a registry-based extension point.
//!   Registries are explicit values, never ambient globals.
//! - [`Program`] / [`Module`]: the module arena and construction API. Every
//!   `add_instruction` validates its references and computes the output
//!   shape eagerly; malformed graphs are rejected at the offending call.
//! - [`validate_program`]: whole-graph validation run before compilation
//!   (returns present, references resolve, captures scoped, module graph
//!   acyclic).
//!
//! Compilation and execution live in `tensorgraph-compiler` and
//! `tensorgraph-infer`; this crate is the engine-agnostic graph layer.
//!
//! ## Quick start
//!
//! ```rust
//! use tensorgraph_ir::{ElementType, Operator, Program, Shape};
//!
//! let mut program = Program::new();
//! let shape = Shape::tensor(ElementType::Float, vec![3, 3]).unwrap();
//! let mut main = program.main_module();
//! let x = main.add_parameter("x", shape.clone()).unwrap();
//! let y = main.add_parameter("y", shape).unwrap();
//! let sum = main.add_instruction(Operator::Add, &[x, y]).unwrap();
//! main.add_return(&[sum]).unwrap();
//! assert!(tensorgraph_ir::validate_program(&program).is_ok());
//! ```

mod argument;
mod display;
mod error;
mod instruction;
mod module;
mod op;
mod program;
mod rewrite;
mod shape;
mod util;
mod validation;


pub use argument::{
    fill_argument, generate_argument, Argument, Element, Nested, Scalar, SeededRng,
};
pub use error::IrError;
pub use instruction::{InsId, Instruction, ModuleId, ParamId, Parameter, ValueId};
pub use module::Module;
pub use op::{AttrValue, OpAttrs, OpDescriptor, OpRegistry, Operator};
pub use program::{ModuleRef, Program, MAIN_MODULE};
pub use shape::{standard_strides, ElementType, Shape, TensorShape};
pub use util::ProgramStats;
pub use validation::{reachable_modules, validate_program};

//! # Tensorgraph infer
//!
//! Targets, compilation and the interpreter for tensorgraph programs.
//!
//! - [`Target`] / [`TargetRegistry`]: a backend identity contributing
//!   lowering passes and an operator-to-kernel dispatch table. The built-in
//!   [`RefTarget`] (`"ref"`) provides reference CPU kernels used as the
//!   correctness baseline.
//! - [`compile`]: validates the module graph, runs target and generic
//!   passes, binds kernels. All-or-nothing; produces a [`CompiledProgram`].
//! - [`CompiledProgram::run`]: the interpreter — dependency-ordered
//!   evaluation, short-circuit `if` dispatch into branch modules, tuple
//!   results, atomic failure.
//! - [`Session`]: holds a program plus its optional compiled form, with the
//!   `compile`-then-`run` surface (`run` before `compile` fails with
//!   [`ExecError::NotCompiled`]).
//! - [`ExecutionHook`] / [`LoggingHook`]: interpreter observation.
//!
//! ```rust
//! use std::collections::HashMap;
//! use tensorgraph_infer::{Session, TargetRegistry};
//! use tensorgraph_ir::{generate_argument, ElementType, Operator, Program, Shape};
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

mod compile;
mod context;
mod error;
mod interpreter;
mod reference;
mod target;

#[cfg(test)]
mod tests;

pub use compile::{compile, CompileConfig, CompiledProgram};
pub use context::{ExecutionHook, LoggingHook, Session};
pub use error::{CompileError, ExecError, KernelError};
pub use reference::RefTarget;
pub use target::{Kernel, Target, TargetRegistry};

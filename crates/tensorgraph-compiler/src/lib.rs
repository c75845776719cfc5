//! # Tensorgraph compiler
//!
//! Shape-preserving rewrite passes and the fixpoint pipeline that prepares
//! a program graph for a target.
//!
//! Compilation against a target (kernel binding, the executable form) lives
//! in `tensorgraph-infer`; this crate owns the graph-to-graph stage:
//!
//! - [`EliminateIdentity`]: rewrites uses of `identity(x)` to `x`.
//! - [`AutoContiguous`]: inserts `contiguous` after producers of
//!   non-standard layouts so kernels and outputs see row-major data.
//! - [`DeadCodeElimination`]: removes instructions that contribute to no
//!   executed output, respecting cross-module closure capture.
//!
//! [`PassPipeline`] runs the configured passes to a fixed point, refreshing
//! stored shapes and verifying after every application that each module's
//! logical output shapes (element type and dimension lengths) survived —
//! a pass that breaks this aborts compilation with
//! [`PassError::ShapeNotPreserved`].
//!
//! ```rust
//! use tensorgraph_compiler::PassPipeline;
//! use tensorgraph_ir::{ElementType, Operator, Program, Shape};
//!
//! let mut program = Program::new();
//! let shape = Shape::tensor(ElementType::Float, vec![2, 2]).unwrap();
//! let mut main = program.main_module();
//! let x = main.add_parameter("x", shape).unwrap();
//! let id = main.add_instruction(Operator::Identity, &[x]).unwrap();
//! main.add_return(&[id]).unwrap();
//!
//! let stats = PassPipeline::with_default_config().run(&mut program).unwrap();
//! assert!(stats.total_rewrites() > 0);
//! ```

mod error;
mod passes;
mod pipeline;

#[cfg(test)]
mod tests;

pub use error::PassError;
pub use passes::{AutoContiguous, DeadCodeElimination, EliminateIdentity, Pass};
pub use pipeline::{PassPipeline, PipelineConfig, PipelineStats};

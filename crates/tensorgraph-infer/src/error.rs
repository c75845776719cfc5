//! Error types for compilation and execution.

use thiserror::Error;

use tensorgraph_compiler::PassError;
use tensorgraph_ir::IrError;

/// Failure inside a backend kernel (allocation, unsupported data, ...).
#[derive(Error, Debug)]
#[error("{0}")]
pub struct KernelError(pub String);

#[derive(Error, Debug)]
pub enum CompileError {
    #[error(transparent)]
    Graph(#[from] IrError),

    #[error(transparent)]
    Pass(#[from] PassError),

    #[error("target '{target}' has no kernel for operator '{op}'")]
    UnsupportedOperator { target: String, op: String },

    #[error("unknown target '{name}'")]
    UnknownTarget { name: String },

    #[error("target '{name}' already registered")]
    DuplicateTarget { name: String },
}

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("program has not been compiled")]
    NotCompiled,

    #[error("missing argument for parameter '{param}'")]
    MissingArgument { param: String },

    #[error("argument for parameter '{param}' has shape {actual}, expected {expected}")]
    ArgumentShapeMismatch {
        param: String,
        expected: String,
        actual: String,
    },

    #[error("operator '{op}' failed: {source}")]
    KernelFailed {
        op: String,
        #[source]
        source: KernelError,
    },

    #[error("operator '{op}': tuple index {index} out of range for arity {arity}")]
    TupleIndexOutOfRange {
        op: String,
        index: usize,
        arity: usize,
    },

    #[error("value in module '{module}' referenced before evaluation")]
    NotEvaluated { module: String },
}

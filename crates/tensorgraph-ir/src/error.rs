//! Error types for the graph IR.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IrError {
    #[error("invalid shape: {reason}")]
    InvalidShape { reason: String },

    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("expected a tuple shape, got {found}")]
    NotATuple { found: String },

    #[error("expected a tensor shape, got {found}")]
    NotATensor { found: String },

    #[error("unknown operator '{name}'")]
    UnknownOperator { name: String },

    #[error("operator '{name}' already registered")]
    DuplicateOperator { name: String },

    #[error("operator '{op}': {reason}")]
    OperatorShape { op: String, reason: String },

    #[error("operator '{op}': attribute '{attr}' {reason}")]
    InvalidAttribute {
        op: String,
        attr: String,
        reason: String,
    },

    #[error("operator '{op}': tuple index {index} out of range for arity {arity}")]
    IndexOutOfRange {
        op: String,
        index: usize,
        arity: usize,
    },

    #[error("parameter '{name}' already declared in module '{module}'")]
    DuplicateParameter { name: String, module: String },

    #[error("module '{name}' already exists")]
    DuplicateModule { name: String },

    #[error("module reference #{index} does not name a module of this program")]
    UnknownModule { index: usize },

    #[error("input #{input} of '{op}' in module '{module}' does not reference a previously added value")]
    DanglingReference {
        module: String,
        op: String,
        input: usize,
    },

    #[error("module '{module}' captures values from module '{foreign}', which does not enclose it")]
    InvalidCapture { module: String, foreign: String },

    #[error("return already set for module '{module}'")]
    ReturnAlreadySet { module: String },

    #[error("empty return for module '{module}'")]
    EmptyReturn { module: String },

    #[error("module '{module}' has no return and cannot be compiled")]
    MissingReturn { module: String },

    #[error("module reference cycle through '{module}'")]
    CyclicModuleReference { module: String },
}

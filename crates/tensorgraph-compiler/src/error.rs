//! Error types for the pass pipeline.

use thiserror::Error;

use tensorgraph_ir::IrError;

#[derive(Error, Debug)]
pub enum PassError {
    #[error(transparent)]
    Graph(#[from] IrError),

    #[error(
        "pass '{pass}' changed the logical output shape of module '{module}': {expected} -> {actual}"
    )]
    ShapeNotPreserved {
        pass: String,
        module: String,
        expected: String,
        actual: String,
    },
}

//! Identity elimination.

use tensorgraph_ir::{InsId, Operator, Program, ValueId};

use crate::error::PassError;
use crate::passes::Pass;

/// Rewrites every use of `identity(x)` to `x` directly.
///
/// The identity instructions themselves become dead and are left for
/// dead-code elimination. Identity preserves the input shape exactly, so
/// rewritten returns keep branch output shapes in agreement.
pub struct EliminateIdentity;

impl Pass for EliminateIdentity {
    fn name(&self) -> &str {
        "eliminate_identity"
    }

    fn apply(&self, program: &mut Program) -> Result<usize, PassError> {
        let mut rewrites: Vec<(InsId, ValueId)> = Vec::new();
        for (id, module) in program.modules() {
            for (index, ins) in module.instructions().iter().enumerate() {
                if matches!(ins.op, Operator::Identity) {
                    rewrites.push((InsId { module: id, index }, ins.inputs[0]));
                }
            }
        }

        let mut changed = 0usize;
        for (ins, source) in rewrites {
            changed += program.replace_uses(ValueId::Instruction(ins), source, None);
        }
        Ok(changed)
    }
}

//! Layout normalization.

use tensorgraph_ir::{InsId, Operator, Program, ValueId};

use crate::error::PassError;
use crate::passes::Pass;

/// Inserts a `contiguous` instruction after every producer of a
/// non-standard tensor layout (transposed views, broadcast strides), so
/// downstream kernels and module outputs see row-major data.
///
/// A producer whose remaining uses are all `contiguous` instructions is
/// already normalized and is skipped, which makes the pass idempotent.
pub struct AutoContiguous;

impl Pass for AutoContiguous {
    fn name(&self) -> &str {
        "auto_contiguous"
    }

    fn apply(&self, program: &mut Program) -> Result<usize, PassError> {
        let mut inserted = 0usize;
        let module_ids: Vec<_> = program.modules().map(|(id, _)| id).collect();
        for module in module_ids {
            let mut index = 0usize;
            while index < program.module(module).len() {
                let ins = program.module(module).instruction(index).expect("in range");
                if !needs_normalization(program, InsId { module, index }, &ins.op) {
                    index += 1;
                    continue;
                }
                let value = ValueId::Instruction(InsId { module, index });
                let normalized = program
                    .insert_instruction(module, index + 1, Operator::Contiguous, &[value])
                    .map_err(PassError::Graph)?;
                let ValueId::Instruction(normalized_ins) = normalized else {
                    unreachable!()
                };
                program.replace_uses(value, normalized, Some(normalized_ins));
                inserted += 1;
                index += 2;
            }
        }
        Ok(inserted)
    }
}

fn needs_normalization(program: &Program, id: InsId, op: &Operator) -> bool {
    if matches!(op, Operator::Contiguous) {
        return false;
    }
    let ins = program.module(id.module).instruction(id.index).expect("in range");
    let Some(tensor) = ins.shape.as_tensor() else {
        return false;
    };
    if tensor.standard() {
        return false;
    }
    let value = ValueId::Instruction(id);
    let uses = program.uses_of(value);
    if uses.is_empty() && !program.used_in_return(value) {
        return false;
    }
    // Already followed by normalization only.
    uses.iter().any(|&site| {
        let user = program
            .module(site.module)
            .instruction(site.index)
            .expect("use site resolves");
        !matches!(user.op, Operator::Contiguous)
    }) || program.used_in_return(value)
}

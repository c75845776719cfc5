//! Dead code elimination.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tensorgraph_ir::{InsId, ModuleId, Operator, Program, ValueId};

use crate::error::PassError;
use crate::passes::Pass;

/// Removes instructions that cannot contribute to any executed output.
///
/// Liveness starts from the main module's return and flows through
/// instruction inputs. A live `if` keeps the returns of its branch modules
/// live; a branch instruction capturing an outer value keeps that value
/// live. Modules that no live control-flow instruction references are left
/// untouched — they are never executed.
pub struct DeadCodeElimination;

impl Pass for DeadCodeElimination {
    fn name(&self) -> &str {
        "dead_code_elimination"
    }

    fn apply(&self, program: &mut Program) -> Result<usize, PassError> {
        let mut live: HashSet<InsId> = HashSet::new();
        let mut live_modules: HashSet<ModuleId> = HashSet::new();
        let mut stack: Vec<ValueId> = Vec::new();

        live_modules.insert(program.main_id());
        if let Some(returns) = program.module(program.main_id()).returns() {
            stack.extend(returns.iter().copied());
        }

        while let Some(value) = stack.pop() {
            let ValueId::Instruction(id) = value else {
                continue;
            };
            if !live.insert(id) {
                continue;
            }
            let ins = program
                .module(id.module)
                .instruction(id.index)
                .expect("live reference resolves");
            stack.extend(ins.inputs.iter().copied());
            if matches!(ins.op, Operator::If) {
                for &branch in &ins.modules {
                    if live_modules.insert(branch) {
                        if let Some(returns) = program.module(branch).returns() {
                            stack.extend(returns.iter().copied());
                        }
                    }
                }
            }
        }

        let mut plan: BTreeMap<ModuleId, BTreeSet<usize>> = BTreeMap::new();
        let mut removed = 0usize;
        for (id, module) in program.modules() {
            if !live_modules.contains(&id) {
                continue;
            }
            let dead: BTreeSet<usize> = (0..module.len())
                .filter(|&index| !live.contains(&InsId { module: id, index }))
                .collect();
            removed += dead.len();
            if !dead.is_empty() {
                plan.insert(id, dead);
            }
        }

        program.remove_instructions(&plan).map_err(PassError::Graph)?;
        Ok(removed)
    }
}

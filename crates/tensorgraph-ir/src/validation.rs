//! Whole-program validation.
//!
//! Construction-time checks are local to one `add_*` call; this pass checks
//! the global invariants before compilation: every module has a return, all
//! references resolve, captured values come from an enclosing module on
//! every reference path, and the module-reference graph is acyclic.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::IrError;
use crate::instruction::{ModuleId, ValueId};
use crate::program::Program;

/// Validate the whole module graph of a program.
pub fn validate_program(program: &Program) -> Result<(), IrError> {
    check_acyclic(program)?;

    let reachable = reachable_modules(program);
    let ancestors = capture_ancestors(program, &reachable);

    for (id, module) in program.modules() {
        let returns = module.returns().ok_or_else(|| IrError::MissingReturn {
            module: module.name().to_string(),
        })?;

        for (i, &value) in returns.iter().enumerate() {
            check_value(program, id, value, "return", i, &ancestors)?;
        }

        for (index, ins) in module.instructions().iter().enumerate() {
            for (i, &value) in ins.inputs.iter().enumerate() {
                check_value(program, id, value, ins.op.name(), i, &ancestors)?;
                // Same-module inputs must precede their user.
                if let ValueId::Instruction(src) = value {
                    if src.module == id && src.index >= index {
                        return Err(IrError::DanglingReference {
                            module: module.name().to_string(),
                            op: ins.op.name().to_string(),
                            input: i,
                        });
                    }
                }
            }
            for &branch in &ins.modules {
                if program.get_module(branch).is_none() {
                    return Err(IrError::UnknownModule {
                        index: branch.index(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn check_value(
    program: &Program,
    module: ModuleId,
    value: ValueId,
    op: &str,
    input: usize,
    ancestors: &HashMap<ModuleId, HashSet<ModuleId>>,
) -> Result<(), IrError> {
    let owner = program.module(module);
    if program.value_shape(value).is_none() {
        return Err(IrError::DanglingReference {
            module: owner.name().to_string(),
            op: op.to_string(),
            input,
        });
    }
    let foreign = value.module();
    if foreign != module {
        let enclosing = ancestors.get(&module);
        if !enclosing.is_some_and(|a| a.contains(&foreign)) {
            return Err(IrError::InvalidCapture {
                module: owner.name().to_string(),
                foreign: program.module(foreign).name().to_string(),
            });
        }
    }
    Ok(())
}

/// Depth-first cycle check over the module-reference graph.
fn check_acyclic(program: &Program) -> Result<(), IrError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        White,
        Grey,
        Black,
    }

    fn visit(program: &Program, id: ModuleId, marks: &mut Vec<Mark>) -> Result<(), IrError> {
        match marks[id.index()] {
            Mark::Black => return Ok(()),
            Mark::Grey => {
                return Err(IrError::CyclicModuleReference {
                    module: program.module(id).name().to_string(),
                })
            }
            Mark::White => {}
        }
        marks[id.index()] = Mark::Grey;
        for ins in program.module(id).instructions() {
            for &branch in &ins.modules {
                visit(program, branch, marks)?;
            }
        }
        marks[id.index()] = Mark::Black;
        Ok(())
    }

    let mut marks = vec![Mark::White; program.module_count()];
    for (id, _) in program.modules() {
        visit(program, id, &mut marks)?;
    }
    Ok(())
}

/// Modules reachable from main through branch references.
pub fn reachable_modules(program: &Program) -> HashSet<ModuleId> {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([program.main_id()]);
    while let Some(id) = queue.pop_front() {
        if !seen.insert(id) {
            continue;
        }
        for ins in program.module(id).instructions() {
            for &branch in &ins.modules {
                queue.push_back(branch);
            }
        }
    }
    seen
}

/// For every reachable module, the set of modules guaranteed to enclose it on
/// every reference path from main. A captured value is legal only when its
/// owner is in this set.
fn capture_ancestors(
    program: &Program,
    reachable: &HashSet<ModuleId>,
) -> HashMap<ModuleId, HashSet<ModuleId>> {
    let mut parents: HashMap<ModuleId, HashSet<ModuleId>> = HashMap::new();
    for &id in reachable {
        for ins in program.module(id).instructions() {
            for &branch in &ins.modules {
                parents.entry(branch).or_default().insert(id);
            }
        }
    }

    fn ancestors_of(
        id: ModuleId,
        main: ModuleId,
        parents: &HashMap<ModuleId, HashSet<ModuleId>>,
        memo: &mut HashMap<ModuleId, HashSet<ModuleId>>,
    ) -> HashSet<ModuleId> {
        if let Some(cached) = memo.get(&id) {
            return cached.clone();
        }
        let result = if id == main {
            HashSet::new()
        } else {
            let mut common: Option<HashSet<ModuleId>> = None;
            for &parent in parents.get(&id).into_iter().flatten() {
                let mut chain = ancestors_of(parent, main, parents, memo);
                chain.insert(parent);
                common = Some(match common {
                    None => chain,
                    Some(prev) => prev.intersection(&chain).copied().collect(),
                });
            }
            common.unwrap_or_default()
        };
        memo.insert(id, result.clone());
        result
    }

    let mut memo = HashMap::new();
    for &id in reachable {
        ancestors_of(id, program.main_id(), &parents, &mut memo);
    }
    memo
}

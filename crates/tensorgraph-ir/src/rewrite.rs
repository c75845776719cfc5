//! Graph rewrite primitives used by compilation passes.
//!
//! These operations keep the program's reference structure consistent:
//! inserting or removing instructions renumbers every handle that points
//! into the affected modules, across all modules and returns.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::IrError;
use crate::instruction::{InsId, Instruction, ModuleId, ValueId};
use crate::op::Operator;
use crate::program::Program;

impl Program {
    /// Rewrite every use of `from` (instruction inputs and module returns)
    /// to `to`, returning the number of rewritten uses. `skip` exempts one
    /// instruction, typically the replacement itself. The caller is
    /// responsible for shape compatibility.
    pub fn replace_uses(&mut self, from: ValueId, to: ValueId, skip: Option<InsId>) -> usize {
        let mut count = 0;
        let module_ids: Vec<ModuleId> = self.modules().map(|(id, _)| id).collect();
        for id in module_ids {
            let module = self.module_mut(id);
            for (index, ins) in module.instructions_mut().iter_mut().enumerate() {
                if skip == Some(InsId { module: id, index }) {
                    continue;
                }
                for input in &mut ins.inputs {
                    if *input == from {
                        *input = to;
                        count += 1;
                    }
                }
            }
            if let Some(returns) = module.returns_mut() {
                for value in returns.iter_mut() {
                    if *value == from {
                        *value = to;
                        count += 1;
                    }
                }
            }
        }
        count
    }

    /// All instructions and returns that consume `value`.
    pub fn uses_of(&self, value: ValueId) -> Vec<InsId> {
        let mut uses = Vec::new();
        for (id, module) in self.modules() {
            for (index, ins) in module.instructions().iter().enumerate() {
                if ins.inputs.contains(&value) {
                    uses.push(InsId { module: id, index });
                }
            }
        }
        uses
    }

    /// Whether `value` appears in any module's return.
    pub fn used_in_return(&self, value: ValueId) -> bool {
        self.modules()
            .any(|(_, m)| m.returns().is_some_and(|r| r.contains(&value)))
    }

    /// Insert an instruction at `pos` in `module`, renumbering downstream
    /// references. Same-module inputs must precede `pos`.
    pub fn insert_instruction(
        &mut self,
        module: ModuleId,
        pos: usize,
        op: Operator,
        inputs: &[ValueId],
    ) -> Result<ValueId, IrError> {
        let module_name = self.module(module).name().to_string();
        let mut input_shapes = Vec::with_capacity(inputs.len());
        for (i, &value) in inputs.iter().enumerate() {
            if let ValueId::Instruction(src) = value {
                if src.module == module && src.index >= pos {
                    return Err(IrError::DanglingReference {
                        module: module_name.clone(),
                        op: op.name().to_string(),
                        input: i,
                    });
                }
            }
            let shape = self.value_shape(value).ok_or_else(|| IrError::DanglingReference {
                module: module_name.clone(),
                op: op.name().to_string(),
                input: i,
            })?;
            input_shapes.push(shape.clone());
        }
        let shape = self.registry().infer_shape(&op, &input_shapes, &[])?;

        self.shift_references(module, pos, 1);
        self.module_mut(module).instructions_mut().insert(
            pos,
            Instruction {
                op,
                inputs: inputs.to_vec(),
                modules: Vec::new(),
                shape,
            },
        );
        Ok(ValueId::Instruction(InsId { module, index: pos }))
    }

    /// Remove the planned instruction positions, renumbering the survivors.
    /// Fails if a surviving instruction or return still uses a removed
    /// value.
    pub fn remove_instructions(
        &mut self,
        plan: &BTreeMap<ModuleId, BTreeSet<usize>>,
    ) -> Result<(), IrError> {
        if plan.values().all(BTreeSet::is_empty) {
            return Ok(());
        }

        // Old-index -> new-index maps per affected module.
        let mut remaps: BTreeMap<ModuleId, Vec<Option<usize>>> = BTreeMap::new();
        for (&module, remove) in plan {
            let len = self.module(module).len();
            let mut remap = Vec::with_capacity(len);
            let mut next = 0usize;
            for index in 0..len {
                if remove.contains(&index) {
                    remap.push(None);
                } else {
                    remap.push(Some(next));
                    next += 1;
                }
            }
            remaps.insert(module, remap);
        }

        let removed = |id: InsId| -> bool {
            remaps
                .get(&id.module)
                .is_some_and(|remap| remap[id.index].is_none())
        };

        // Reject dangling survivors before touching anything.
        for (id, m) in self.modules() {
            for (index, ins) in m.instructions().iter().enumerate() {
                if removed(InsId { module: id, index }) {
                    continue;
                }
                for (i, input) in ins.inputs.iter().enumerate() {
                    if let ValueId::Instruction(src) = input {
                        if removed(*src) {
                            return Err(IrError::DanglingReference {
                                module: m.name().to_string(),
                                op: ins.op.name().to_string(),
                                input: i,
                            });
                        }
                    }
                }
            }
            if let Some(returns) = m.returns() {
                for (i, value) in returns.iter().enumerate() {
                    if let ValueId::Instruction(src) = value {
                        if removed(*src) {
                            return Err(IrError::DanglingReference {
                                module: m.name().to_string(),
                                op: "return".into(),
                                input: i,
                            });
                        }
                    }
                }
            }
        }

        // Renumber every reference into the affected modules.
        let module_ids: Vec<ModuleId> = self.modules().map(|(id, _)| id).collect();
        for id in module_ids {
            let m = self.module_mut(id);
            for ins in m.instructions_mut().iter_mut() {
                for input in &mut ins.inputs {
                    if let ValueId::Instruction(src) = input {
                        if let Some(Some(new)) =
                            remaps.get(&src.module).map(|remap| remap[src.index])
                        {
                            *input = ValueId::Instruction(InsId {
                                module: src.module,
                                index: new,
                            });
                        }
                    }
                }
            }
            if let Some(returns) = m.returns_mut() {
                for value in returns.iter_mut() {
                    if let ValueId::Instruction(src) = value {
                        if let Some(Some(new)) =
                            remaps.get(&src.module).map(|remap| remap[src.index])
                        {
                            *value = ValueId::Instruction(InsId {
                                module: src.module,
                                index: new,
                            });
                        }
                    }
                }
            }
        }

        for (&module, remove) in plan {
            let instructions = self.module_mut(module).instructions_mut();
            let mut index = 0usize;
            instructions.retain(|_| {
                let keep = !remove.contains(&index);
                index += 1;
                keep
            });
        }
        Ok(())
    }

    /// Recompute every instruction's stored shape from its current inputs.
    ///
    /// Rewrites can change the layout a value carries (e.g. normalizing a
    /// module output); this propagates those changes through dependent
    /// instructions. Modules are processed branches-first so control-flow
    /// tuple shapes see fresh branch outputs; the module-reference graph
    /// must be acyclic.
    pub fn refresh_shapes(&mut self) -> Result<(), IrError> {
        fn visit(
            program: &mut Program,
            id: ModuleId,
            done: &mut Vec<bool>,
        ) -> Result<(), IrError> {
            if done[id.index()] {
                return Ok(());
            }
            done[id.index()] = true;
            let branch_refs: Vec<ModuleId> = program
                .module(id)
                .instructions()
                .iter()
                .flat_map(|ins| ins.modules.iter().copied())
                .collect();
            for branch in branch_refs {
                visit(program, branch, done)?;
            }
            for index in 0..program.module(id).len() {
                let ins = program.module(id).instruction(index).expect("in range");
                let op = ins.op.clone();
                let inputs = ins.inputs.clone();
                let branches = ins.modules.clone();
                let mut input_shapes = Vec::with_capacity(inputs.len());
                for &value in &inputs {
                    let shape =
                        program
                            .value_shape(value)
                            .cloned()
                            .ok_or_else(|| IrError::DanglingReference {
                                module: program.module(id).name().to_string(),
                                op: op.name().to_string(),
                                input: 0,
                            })?;
                    input_shapes.push(shape);
                }
                let mut branch_shapes = Vec::with_capacity(branches.len());
                for &branch in &branches {
                    branch_shapes.push(program.module_output_shapes(branch)?);
                }
                let shape = program
                    .registry()
                    .infer_shape(&op, &input_shapes, &branch_shapes)?;
                program.module_mut(id).instructions_mut()[index].shape = shape;
            }
            Ok(())
        }

        let mut done = vec![false; self.module_count()];
        let ids: Vec<ModuleId> = self.modules().map(|(id, _)| id).collect();
        for id in ids {
            visit(self, id, &mut done)?;
        }
        Ok(())
    }

    /// Renumber references into `module` at positions `>= pos` by `delta`.
    fn shift_references(&mut self, module: ModuleId, pos: usize, delta: usize) {
        let module_ids: Vec<ModuleId> = self.modules().map(|(id, _)| id).collect();
        for id in module_ids {
            let m = self.module_mut(id);
            for ins in m.instructions_mut().iter_mut() {
                for input in &mut ins.inputs {
                    if let ValueId::Instruction(src) = input {
                        if src.module == module && src.index >= pos {
                            *input = ValueId::Instruction(InsId {
                                module,
                                index: src.index + delta,
                            });
                        }
                    }
                }
            }
            if let Some(returns) = m.returns_mut() {
                for value in returns.iter_mut() {
                    if let ValueId::Instruction(src) = value {
                        if src.module == module && src.index >= pos {
                            *value = ValueId::Instruction(InsId {
                                module,
                                index: src.index + delta,
                            });
                        }
                    }
                }
            }
        }
    }
}

//! Programs: the top-level container of modules.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::argument::Argument;
use crate::error::IrError;
use crate::instruction::{InsId, Instruction, ModuleId, ParamId, Parameter, ValueId};
use crate::module::Module;
use crate::op::{OpRegistry, Operator};
use crate::shape::Shape;

pub const MAIN_MODULE: &str = "main";

/// A program: a "main" module plus any number of auxiliary modules,
/// addressable by name and referenced by control-flow instructions.
///
/// The program is the arena owning every module; handles (`ModuleId`,
/// `ValueId`) are only meaningful for the program that issued them. The
/// module-reference graph must stay acyclic; [`crate::validate_program`]
/// checks the whole graph before compilation.
///
/// Construction is single-threaded by contract: the structure provides no
/// internal synchronization.
#[derive(Clone, Debug)]
pub struct Program {
    registry: OpRegistry,
    modules: Vec<Module>,
    names: HashMap<String, ModuleId>,
    main: ModuleId,
}

impl Program {
    /// Program with the built-in operator set.
    pub fn new() -> Self {
        Self::with_registry(OpRegistry::with_builtins())
    }

    /// Program resolving operators through the given registry.
    pub fn with_registry(registry: OpRegistry) -> Self {
        let main = Module::new(MAIN_MODULE);
        let mut names = HashMap::new();
        names.insert(MAIN_MODULE.to_string(), ModuleId(0));
        Program {
            registry,
            modules: vec![main],
            names,
            main: ModuleId(0),
        }
    }

    pub fn registry(&self) -> &OpRegistry {
        &self.registry
    }

    pub fn main_id(&self) -> ModuleId {
        self.main
    }

    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.0]
    }

    pub fn get_module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id.0)
    }

    pub fn module_id(&self, name: &str) -> Option<ModuleId> {
        self.names.get(name).copied()
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn modules(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules.iter().enumerate().map(|(i, m)| (ModuleId(i), m))
    }

    /// Create an empty auxiliary module, addressable by name.
    pub fn create_module(&mut self, name: impl Into<String>) -> Result<ModuleId, IrError> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(IrError::DuplicateModule { name });
        }
        let id = ModuleId(self.modules.len());
        self.modules.push(Module::new(name.clone()));
        self.names.insert(name, id);
        Ok(id)
    }

    /// Editing handle for the main module.
    pub fn main_module(&mut self) -> ModuleRef<'_> {
        let id = self.main;
        ModuleRef { program: self, id }
    }

    /// Editing handle for any module of this program.
    pub fn edit(&mut self, id: ModuleId) -> ModuleRef<'_> {
        assert!(id.0 < self.modules.len(), "foreign module handle");
        ModuleRef { program: self, id }
    }

    /// Shape of a referenced value, if the reference resolves.
    pub fn value_shape(&self, value: ValueId) -> Option<&Shape> {
        match value {
            ValueId::Param(p) => self
                .modules
                .get(p.module.0)
                .and_then(|m| m.params().get(p.index))
                .map(|param| &param.shape),
            ValueId::Instruction(i) => self
                .modules
                .get(i.module.0)
                .and_then(|m| m.instruction(i.index))
                .map(|ins| &ins.shape),
        }
    }

    /// Return shape sequence of a module. Fails when no return is set.
    pub fn module_output_shapes(&self, id: ModuleId) -> Result<Vec<Shape>, IrError> {
        let module = self.get_module(id).ok_or(IrError::UnknownModule { index: id.0 })?;
        let returns = module.returns().ok_or_else(|| IrError::MissingReturn {
            module: module.name().to_string(),
        })?;
        returns
            .iter()
            .map(|&v| {
                self.value_shape(v).cloned().ok_or_else(|| IrError::DanglingReference {
                    module: module.name().to_string(),
                    op: "return".into(),
                    input: 0,
                })
            })
            .collect()
    }

    pub fn add_parameter(
        &mut self,
        module: ModuleId,
        name: impl Into<String>,
        shape: Shape,
    ) -> Result<ValueId, IrError> {
        let name = name.into();
        let m = &self.modules[module.0];
        if m.param_index(&name).is_some() {
            return Err(IrError::DuplicateParameter {
                name,
                module: m.name().to_string(),
            });
        }
        let index = m.params().len();
        self.modules[module.0].push_param(Parameter { name, shape });
        Ok(ValueId::Param(ParamId { module, index }))
    }

    pub fn add_instruction(
        &mut self,
        module: ModuleId,
        op: Operator,
        inputs: &[ValueId],
    ) -> Result<ValueId, IrError> {
        self.add_instruction_with_modules(module, op, inputs, &[])
    }

    /// Append an instruction, validating its references and computing its
    /// output shape. Errors are reported here, never deferred to compile or
    /// run time.
    pub fn add_instruction_with_modules(
        &mut self,
        module: ModuleId,
        op: Operator,
        inputs: &[ValueId],
        branch_modules: &[ModuleId],
    ) -> Result<ValueId, IrError> {
        let module_name = self.modules[module.0].name().to_string();

        if branch_modules.len() != op.module_arity() {
            return Err(IrError::OperatorShape {
                op: op.name().to_string(),
                reason: format!(
                    "expects {} branch module(s), got {}",
                    op.module_arity(),
                    branch_modules.len()
                ),
            });
        }

        let mut input_shapes = Vec::with_capacity(inputs.len());
        for (i, &value) in inputs.iter().enumerate() {
            let shape = self.resolve_input(module, value).ok_or_else(|| {
                IrError::DanglingReference {
                    module: module_name.clone(),
                    op: op.name().to_string(),
                    input: i,
                }
            })?;
            input_shapes.push(shape.clone());
        }

        let mut branch_shapes = Vec::with_capacity(branch_modules.len());
        for &branch in branch_modules {
            if self.get_module(branch).is_none() {
                return Err(IrError::UnknownModule { index: branch.0 });
            }
            branch_shapes.push(self.module_output_shapes(branch)?);
        }

        let shape = self.registry.infer_shape(&op, &input_shapes, &branch_shapes)?;

        let index = self.modules[module.0].len();
        self.modules[module.0].push_instruction(Instruction {
            op,
            inputs: inputs.to_vec(),
            modules: branch_modules.to_vec(),
            shape,
        });
        Ok(ValueId::Instruction(InsId { module, index }))
    }

    /// Append a constant embedded in the graph.
    pub fn add_literal(&mut self, module: ModuleId, value: Argument) -> Result<ValueId, IrError> {
        self.add_instruction(module, Operator::Literal { value }, &[])
    }

    /// Designate the module's outputs.
    pub fn add_return(&mut self, module: ModuleId, outputs: &[ValueId]) -> Result<(), IrError> {
        let module_name = self.modules[module.0].name().to_string();
        if self.modules[module.0].has_return() {
            return Err(IrError::ReturnAlreadySet {
                module: module_name,
            });
        }
        if outputs.is_empty() {
            return Err(IrError::EmptyReturn {
                module: module_name,
            });
        }
        for (i, &value) in outputs.iter().enumerate() {
            if self.resolve_input(module, value).is_none() {
                return Err(IrError::DanglingReference {
                    module: module_name,
                    op: "return".into(),
                    input: i,
                });
            }
        }
        self.modules[module.0].set_returns(outputs.to_vec());
        Ok(())
    }

    /// Resolve a reference used from `module`. Same-module references must
    /// point at already-added entities; foreign references (closure capture
    /// from an enclosing module) are resolved here and scope-checked by
    /// whole-program validation.
    fn resolve_input(&self, _module: ModuleId, value: ValueId) -> Option<&Shape> {
        self.value_shape(value)
    }

    pub(crate) fn module_mut(&mut self, id: ModuleId) -> &mut Module {
        &mut self.modules[id.0]
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

/// Editing handle borrowed from a [`Program`], scoped to one module.
///
/// Mutation goes through the program because instruction validation needs
/// cross-module lookups (branch output shapes, captured values).
pub struct ModuleRef<'a> {
    program: &'a mut Program,
    id: ModuleId,
}

impl<'a> ModuleRef<'a> {
    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn name(&self) -> &str {
        self.program.module(self.id).name()
    }

    pub fn add_parameter(
        &mut self,
        name: impl Into<String>,
        shape: Shape,
    ) -> Result<ValueId, IrError> {
        self.program.add_parameter(self.id, name, shape)
    }

    pub fn add_instruction(
        &mut self,
        op: Operator,
        inputs: &[ValueId],
    ) -> Result<ValueId, IrError> {
        self.program.add_instruction(self.id, op, inputs)
    }

    pub fn add_instruction_with_modules(
        &mut self,
        op: Operator,
        inputs: &[ValueId],
        branch_modules: &[ModuleId],
    ) -> Result<ValueId, IrError> {
        self.program
            .add_instruction_with_modules(self.id, op, inputs, branch_modules)
    }

    pub fn add_literal(&mut self, value: Argument) -> Result<ValueId, IrError> {
        self.program.add_literal(self.id, value)
    }

    pub fn add_return(&mut self, outputs: &[ValueId]) -> Result<(), IrError> {
        self.program.add_return(self.id, outputs)
    }

    /// Output shapes of the module, in return order.
    pub fn output_shapes(&self) -> Result<Vec<Shape>, IrError> {
        self.program.module_output_shapes(self.id)
    }
}

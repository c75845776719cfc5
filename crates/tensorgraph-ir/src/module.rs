//! Modules: named, ordered instruction sequences with parameters and a
//! distinguished return.

use serde::{Deserialize, Serialize};

use crate::instruction::{Instruction, Parameter, ValueId};
use crate::shape::Shape;

/// An ordered DAG of instructions, presented in a legal topological
/// (insertion) order. A module without a return is incomplete and cannot be
/// compiled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Module {
    name: String,
    params: Vec<Parameter>,
    instructions: Vec<Instruction>,
    returns: Option<Vec<ValueId>>,
}

impl Module {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            params: Vec::new(),
            instructions: Vec::new(),
            returns: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }

    /// Declared parameter names and shapes, in declaration order.
    pub fn parameter_shapes(&self) -> Vec<(&str, &Shape)> {
        self.params
            .iter()
            .map(|p| (p.name.as_str(), &p.shape))
            .collect()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn instruction(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    pub fn returns(&self) -> Option<&[ValueId]> {
        self.returns.as_deref()
    }

    pub fn has_return(&self) -> bool {
        self.returns.is_some()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    // Mutation is routed through Program, which owns cross-module lookups.
    pub(crate) fn push_param(&mut self, param: Parameter) {
        self.params.push(param);
    }

    pub(crate) fn push_instruction(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    pub(crate) fn set_returns(&mut self, returns: Vec<ValueId>) {
        self.returns = Some(returns);
    }

    pub(crate) fn instructions_mut(&mut self) -> &mut Vec<Instruction> {
        &mut self.instructions
    }

    pub(crate) fn returns_mut(&mut self) -> Option<&mut Vec<ValueId>> {
        self.returns.as_mut()
    }
}

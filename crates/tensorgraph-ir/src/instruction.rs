//! Graph nodes and the handles that reference them.
//!
//! Modules live in an arena owned by the [`crate::Program`]; instructions
//! and parameters are addressed by stable `(module, index)` handles. A
//! sub-module referenced from more than one control-flow instruction is
//! shared structure, not owned twice.

use serde::{Deserialize, Serialize};

use crate::op::Operator;
use crate::shape::Shape;

/// Handle to a module in its owning program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId(pub(crate) usize);

impl ModuleId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle to a declared parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamId {
    pub module: ModuleId,
    pub index: usize,
}

/// Handle to an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InsId {
    pub module: ModuleId,
    pub index: usize,
}

/// Reference to a value produced within a program: a parameter binding or an
/// instruction result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueId {
    Param(ParamId),
    Instruction(InsId),
}

impl ValueId {
    pub fn module(&self) -> ModuleId {
        match self {
            ValueId::Param(p) => p.module,
            ValueId::Instruction(i) => i.module,
        }
    }
}

impl From<ParamId> for ValueId {
    fn from(value: ParamId) -> Self {
        ValueId::Param(value)
    }
}

impl From<InsId> for ValueId {
    fn from(value: InsId) -> Self {
        ValueId::Instruction(value)
    }
}

/// A declared module parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub shape: Shape,
}

/// One operator application in a module.
///
/// `inputs` may reference parameters and earlier instructions of the owning
/// module, or values of an enclosing module (closure capture, fixed at add
/// time). `modules` names branch modules for control-flow operators. The
/// output shape is computed once when the instruction is added.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub op: Operator,
    pub inputs: Vec<ValueId>,
    pub modules: Vec<ModuleId>,
    pub shape: Shape,
}

//! Operator registry: name-based resolution and the extension point.
//!
//! The registry is an explicit value a [`crate::Program`] is built with —
//! never an ambient global — so construction stays deterministic and
//! testable in isolation. Built-in operators resolve through it by name;
//! custom operators register an [`OpDescriptor`] of their own.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::IrError;
use crate::op::infer::infer_builtin;
use crate::op::{OpAttrs, Operator};
use crate::shape::Shape;

/// Descriptor for one operator: how to construct it from attributes and how
/// to compute its output shape.
pub trait OpDescriptor: Send + Sync {
    fn name(&self) -> &str;

    /// Build an operator value from name-based attributes.
    fn make(&self, attrs: &OpAttrs) -> Result<Operator, IrError>;

    /// Compute the output shape. `branches` holds the return shape sequence
    /// of each referenced branch module.
    fn infer_shape(
        &self,
        op: &Operator,
        inputs: &[Shape],
        branches: &[Vec<Shape>],
    ) -> Result<Shape, IrError>;
}

struct Builtin {
    name: &'static str,
    make: fn(&OpAttrs) -> Result<Operator, IrError>,
}

impl OpDescriptor for Builtin {
    fn name(&self) -> &str {
        self.name
    }

    fn make(&self, attrs: &OpAttrs) -> Result<Operator, IrError> {
        (self.make)(attrs)
    }

    fn infer_shape(
        &self,
        op: &Operator,
        inputs: &[Shape],
        branches: &[Vec<Shape>],
    ) -> Result<Shape, IrError> {
        infer_builtin(op, inputs, branches)
    }
}

/// Maps operator names to descriptors.
#[derive(Clone)]
pub struct OpRegistry {
    table: HashMap<String, Arc<dyn OpDescriptor>>,
}

impl OpRegistry {
    /// Empty registry with no operators.
    pub fn empty() -> Self {
        OpRegistry {
            table: HashMap::new(),
        }
    }

    /// Registry holding the built-in operator set.
    pub fn with_builtins() -> Self {
        let builtins: &[(&'static str, fn(&OpAttrs) -> Result<Operator, IrError>)] = &[
            ("add", |_| Ok(Operator::Add)),
            ("sub", |_| Ok(Operator::Sub)),
            ("mul", |_| Ok(Operator::Mul)),
            ("div", |_| Ok(Operator::Div)),
            ("min", |_| Ok(Operator::Min)),
            ("max", |_| Ok(Operator::Max)),
            ("identity", |_| Ok(Operator::Identity)),
            ("neg", |_| Ok(Operator::Neg)),
            ("abs", |_| Ok(Operator::Abs)),
            ("relu", |_| Ok(Operator::Relu)),
            ("contiguous", |_| Ok(Operator::Contiguous)),
            ("broadcast", |attrs| {
                let axis = attrs.int_or("broadcast", "axis", 0)?;
                let out_lens = attrs.ints("broadcast", "out_lens")?;
                Ok(Operator::Broadcast {
                    axis: axis as usize,
                    out_lens: out_lens.into_iter().map(|l| l as usize).collect(),
                })
            }),
            ("transpose", |attrs| {
                let permutation = attrs.ints("transpose", "permutation")?;
                Ok(Operator::Transpose {
                    permutation: permutation.into_iter().map(|d| d as usize).collect(),
                })
            }),
            ("if", |_| Ok(Operator::If)),
            ("get_tuple_elem", |attrs| {
                let index = attrs.int("get_tuple_elem", "index")?;
                Ok(Operator::GetTupleElem {
                    index: index as usize,
                })
            }),
        ];
        let mut registry = OpRegistry::empty();
        for &(name, make) in builtins {
            registry
                .table
                .insert(name.to_string(), Arc::new(Builtin { name, make }));
        }
        registry
    }

    /// Register an extension operator. Fails if the name is taken.
    pub fn register(&mut self, descriptor: Arc<dyn OpDescriptor>) -> Result<(), IrError> {
        let name = descriptor.name().to_string();
        if self.table.contains_key(&name) {
            return Err(IrError::DuplicateOperator { name });
        }
        self.table.insert(name, descriptor);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    pub fn descriptor(&self, name: &str) -> Result<&Arc<dyn OpDescriptor>, IrError> {
        self.table.get(name).ok_or_else(|| IrError::UnknownOperator {
            name: name.to_string(),
        })
    }

    /// Resolve an operator by name with attributes.
    pub fn make(&self, name: &str, attrs: &OpAttrs) -> Result<Operator, IrError> {
        self.descriptor(name)?.make(attrs)
    }

    /// Compute the output shape of an operator application, dispatching
    /// extensions through their descriptor.
    pub fn infer_shape(
        &self,
        op: &Operator,
        inputs: &[Shape],
        branches: &[Vec<Shape>],
    ) -> Result<Shape, IrError> {
        match op {
            Operator::Extension { name, .. } => {
                self.descriptor(name)?.infer_shape(op, inputs, branches)
            }
            _ => infer_builtin(op, inputs, branches),
        }
    }
}

impl Default for OpRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for OpRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.table.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("OpRegistry")
            .field("operators", &names)
            .finish()
    }
}

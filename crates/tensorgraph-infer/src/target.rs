//! Target abstraction and the target registry.

use std::collections::HashMap;
use std::sync::Arc;

use tensorgraph_compiler::Pass;
use tensorgraph_ir::{Argument, Operator, Shape};

use crate::error::{CompileError, KernelError};
use crate::reference::RefTarget;

/// A bound backend kernel: consumes evaluated input arguments, produces the
/// instruction's output argument.
pub type Kernel = Arc<dyn Fn(&[Argument]) -> Result<Argument, KernelError> + Send + Sync>;

/// A backend a program can be compiled against.
///
/// A target contributes lowering passes and resolves operators to concrete
/// kernels. The kernel closure is built once per instruction at compile
/// time, against the instruction's static input shapes; `run` pays no
/// further lookup cost.
pub trait Target: Send + Sync {
    fn name(&self) -> &str;

    /// Lowering passes this target wants applied before kernel binding.
    fn passes(&self) -> Vec<Box<dyn Pass>> {
        Vec::new()
    }

    /// Kernel for an operator applied to the given input shapes, or `None`
    /// when the target does not support the combination.
    fn kernel(&self, op: &Operator, inputs: &[Shape]) -> Option<Kernel>;
}

/// Maps target names to backends. An explicit, injectable value — tests
/// register instrumented targets without touching process state.
#[derive(Clone)]
pub struct TargetRegistry {
    targets: HashMap<String, Arc<dyn Target>>,
}

impl TargetRegistry {
    pub fn empty() -> Self {
        TargetRegistry {
            targets: HashMap::new(),
        }
    }

    /// Registry holding the built-in reference target (`"ref"`).
    pub fn with_builtins() -> Self {
        let mut registry = TargetRegistry::empty();
        registry
            .register(Arc::new(RefTarget::new()))
            .expect("empty registry accepts the reference target");
        registry
    }

    pub fn register(&mut self, target: Arc<dyn Target>) -> Result<(), CompileError> {
        let name = target.name().to_string();
        if self.targets.contains_key(&name) {
            return Err(CompileError::DuplicateTarget { name });
        }
        self.targets.insert(name, target);
        Ok(())
    }

    /// Look up a target by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Target>, CompileError> {
        self.targets
            .get(name)
            .cloned()
            .ok_or_else(|| CompileError::UnknownTarget {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }
}

impl Default for TargetRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

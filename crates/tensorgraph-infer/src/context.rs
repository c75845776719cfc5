//! Execution sessions and observation hooks.

use std::collections::HashMap;
use std::time::Duration;

use tensorgraph_ir::{Argument, Operator, Program};

use crate::compile::{compile, CompileConfig, CompiledProgram};
use crate::error::{CompileError, ExecError};
use crate::target::{Target, TargetRegistry};

/// Observer of interpreter progress.
///
/// Hooks see instruction start/completion, branch selection and run
/// completion. Tests use counting hooks to assert branch exclusivity.
pub trait ExecutionHook {
    fn on_instruction_start(&mut self, _module: &str, _index: usize, _op: &Operator) {}

    fn on_instruction_complete(&mut self, _module: &str, _index: usize, _op: &Operator) {}

    fn on_branch_taken(&mut self, _branch: &str) {}

    fn on_run_complete(&mut self, _duration: Duration) {}
}

/// Hook that logs progress to stderr.
pub struct LoggingHook {
    log_instructions: bool,
}

impl LoggingHook {
    pub fn new() -> Self {
        LoggingHook {
            log_instructions: false,
        }
    }

    pub fn verbose() -> Self {
        LoggingHook {
            log_instructions: true,
        }
    }
}

impl Default for LoggingHook {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionHook for LoggingHook {
    fn on_instruction_complete(&mut self, module: &str, index: usize, op: &Operator) {
        if self.log_instructions {
            eprintln!("[tensorgraph] {}:%{} {} done", module, index, op);
        }
    }

    fn on_branch_taken(&mut self, branch: &str) {
        if self.log_instructions {
            eprintln!("[tensorgraph] taking branch '{}'", branch);
        }
    }

    fn on_run_complete(&mut self, duration: Duration) {
        eprintln!(
            "[tensorgraph] run completed in {:.3}ms",
            duration.as_secs_f64() * 1000.0
        );
    }
}

/// A program together with its (optional) compiled form.
///
/// The logical graph persists across compilations; compiling again — for
/// the same or a different target — replaces the executable binding.
pub struct Session {
    program: Program,
    compiled: Option<CompiledProgram>,
}

impl Session {
    pub fn new(program: Program) -> Self {
        Session {
            program,
            compiled: None,
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn compiled(&self) -> Option<&CompiledProgram> {
        self.compiled.as_ref()
    }

    /// Compile for a named target with the default configuration.
    pub fn compile(
        &mut self,
        registry: &TargetRegistry,
        target: &str,
    ) -> Result<(), CompileError> {
        let target = registry.get(target)?;
        self.compile_with(target.as_ref(), &CompileConfig::default())
    }

    /// Compile for a target with an explicit configuration.
    pub fn compile_with(
        &mut self,
        target: &dyn Target,
        config: &CompileConfig,
    ) -> Result<(), CompileError> {
        self.compiled = Some(compile(&self.program, target, config)?);
        Ok(())
    }

    /// Run the compiled program. Fails with [`ExecError::NotCompiled`] when
    /// no successful compile preceded the call.
    pub fn run(&self, params: &HashMap<String, Argument>) -> Result<Vec<Argument>, ExecError> {
        self.compiled
            .as_ref()
            .ok_or(ExecError::NotCompiled)?
            .run(params)
    }

    /// Run with observation hooks attached.
    pub fn run_with_hooks(
        &self,
        params: &HashMap<String, Argument>,
        hooks: &mut [&mut dyn ExecutionHook],
    ) -> Result<Vec<Argument>, ExecError> {
        self.compiled
            .as_ref()
            .ok_or(ExecError::NotCompiled)?
            .run_with_hooks(params, hooks)
    }
}

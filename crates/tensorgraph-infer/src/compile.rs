//! Target-directed compilation.
//!
//! `compile` validates the module graph, runs the target's lowering passes
//! plus the generic pipeline, then binds every surviving instruction that
//! needs one to a concrete kernel. The result is a [`CompiledProgram`]
//! bound to exactly one target; compilation is all-or-nothing.

use std::collections::HashMap;

use tensorgraph_compiler::{PassPipeline, PipelineConfig, PipelineStats};
use tensorgraph_ir::{reachable_modules, validate_program, Argument, InsId, Program};

use crate::context::ExecutionHook;
use crate::error::{CompileError, ExecError};
use crate::interpreter::execute;
use crate::target::{Kernel, Target};

/// Configuration for compilation.
#[derive(Debug, Clone, Default)]
pub struct CompileConfig {
    /// Generic pass pipeline applied after the target's own passes.
    pub pipeline: PipelineConfig,
}

/// A program lowered for one target, with every kernel resolved.
///
/// The dispatch table is read-only; concurrent `run` calls on one compiled
/// program are safe, each run owning its intermediate results.
pub struct CompiledProgram {
    program: Program,
    target_name: String,
    kernels: HashMap<InsId, Kernel>,
    stats: PipelineStats,
}

impl CompiledProgram {
    /// The lowered program graph.
    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Pipeline statistics from lowering.
    pub fn pipeline_stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub(crate) fn kernel(&self, id: InsId) -> Option<&Kernel> {
        self.kernels.get(&id)
    }

    /// Execute the main module against the given parameter bindings.
    pub fn run(
        &self,
        params: &HashMap<String, Argument>,
    ) -> Result<Vec<Argument>, ExecError> {
        execute(self, params, &mut [])
    }

    /// Execute with observation hooks attached.
    pub fn run_with_hooks(
        &self,
        params: &HashMap<String, Argument>,
        hooks: &mut [&mut dyn ExecutionHook],
    ) -> Result<Vec<Argument>, ExecError> {
        execute(self, params, hooks)
    }
}

/// Compile a program for a target.
pub fn compile(
    program: &Program,
    target: &dyn Target,
    config: &CompileConfig,
) -> Result<CompiledProgram, CompileError> {
    validate_program(program)?;

    let mut lowered = program.clone();
    let mut pipeline = PassPipeline::new(config.pipeline.clone());
    for pass in target.passes().into_iter().rev() {
        pipeline.push_front(pass);
    }
    let stats = pipeline.run(&mut lowered)?;

    let mut kernels = HashMap::new();
    let reachable = reachable_modules(&lowered);
    for (id, module) in lowered.modules() {
        if !reachable.contains(&id) {
            continue;
        }
        for (index, ins) in module.instructions().iter().enumerate() {
            if !ins.op.needs_kernel() {
                continue;
            }
            let input_shapes: Vec<_> = ins
                .inputs
                .iter()
                .map(|&value| {
                    lowered
                        .value_shape(value)
                        .cloned()
                        .expect("validated reference resolves")
                })
                .collect();
            let kernel = target.kernel(&ins.op, &input_shapes).ok_or_else(|| {
                CompileError::UnsupportedOperator {
                    target: target.name().to_string(),
                    op: ins.op.name().to_string(),
                }
            })?;
            kernels.insert(InsId { module: id, index }, kernel);
        }
    }

    Ok(CompiledProgram {
        program: lowered,
        target_name: target.name().to_string(),
        kernels,
        stats,
    })
}

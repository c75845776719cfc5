//! Fixpoint pass pipeline.
//!
//! Runs the configured passes in order, iterating until an iteration makes
//! no changes or the iteration budget is exhausted. After each pass the
//! pipeline refreshes stored shapes and verifies that every module's
//! logical output shapes (element type and dimension lengths) survived.

use tensorgraph_ir::{ElementType, Program, Shape};

use crate::error::PassError;
use crate::passes::{AutoContiguous, DeadCodeElimination, EliminateIdentity, Pass};

/// Configuration for the pass pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Rewrite uses of `identity(x)` to `x`
    pub enable_eliminate_identity: bool,
    /// Normalize non-standard layouts with `contiguous`
    pub enable_auto_contiguous: bool,
    /// Remove instructions that contribute to no output
    pub enable_dead_code: bool,
    /// Maximum number of iterations before stopping
    pub max_iterations: usize,
    /// Stop early if an iteration makes no changes
    pub stop_on_fixed_point: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            enable_eliminate_identity: true,
            enable_auto_contiguous: true,
            enable_dead_code: true,
            max_iterations: 10,
            stop_on_fixed_point: true,
        }
    }
}

impl PipelineConfig {
    /// All rewrites disabled; the pipeline only validates shapes.
    pub fn none() -> Self {
        PipelineConfig {
            enable_eliminate_identity: false,
            enable_auto_contiguous: false,
            enable_dead_code: false,
            max_iterations: 1,
            stop_on_fixed_point: true,
        }
    }
}

/// Statistics reported by a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Iterations executed
    pub iterations: usize,
    /// Total rewrites per pass, in execution order
    pub rewrites: Vec<(String, usize)>,
}

impl PipelineStats {
    pub fn total_rewrites(&self) -> usize {
        self.rewrites.iter().map(|(_, n)| n).sum()
    }

    fn record(&mut self, pass: &str, count: usize) {
        match self.rewrites.iter_mut().find(|(name, _)| name == pass) {
            Some((_, total)) => *total += count,
            None => self.rewrites.push((pass.to_string(), count)),
        }
    }
}

/// Applies passes to a program until a fixed point is reached.
pub struct PassPipeline {
    config: PipelineConfig,
    passes: Vec<Box<dyn Pass>>,
}

impl PassPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let mut passes: Vec<Box<dyn Pass>> = Vec::new();
        if config.enable_eliminate_identity {
            passes.push(Box::new(EliminateIdentity));
        }
        if config.enable_auto_contiguous {
            passes.push(Box::new(AutoContiguous));
        }
        if config.enable_dead_code {
            passes.push(Box::new(DeadCodeElimination));
        }
        PassPipeline { config, passes }
    }

    pub fn with_default_config() -> Self {
        Self::new(PipelineConfig::default())
    }

    /// Prepend a target-contributed pass. Target passes run before the
    /// generic rewrites within each iteration.
    pub fn push_front(&mut self, pass: Box<dyn Pass>) {
        self.passes.insert(0, pass);
    }

    pub fn push(&mut self, pass: Box<dyn Pass>) {
        self.passes.push(pass);
    }

    /// Run the pipeline to fixpoint, verifying shape preservation after
    /// every pass application.
    pub fn run(&self, program: &mut Program) -> Result<PipelineStats, PassError> {
        let mut stats = PipelineStats::default();
        let baseline = logical_outputs(program)?;

        for _ in 0..self.config.max_iterations.max(1) {
            stats.iterations += 1;
            let mut changed = 0usize;
            for pass in &self.passes {
                let count = pass.apply(program)?;
                if count > 0 {
                    program.refresh_shapes().map_err(PassError::Graph)?;
                    check_preserved(program, &baseline, pass.name())?;
                }
                stats.record(pass.name(), count);
                changed += count;
            }
            if changed == 0 && self.config.stop_on_fixed_point {
                break;
            }
        }
        Ok(stats)
    }
}

/// Logical (layout-free) view of every module's output shapes.
fn logical_outputs(program: &Program) -> Result<Vec<(String, Vec<String>)>, PassError> {
    let mut outputs = Vec::new();
    for (id, module) in program.modules() {
        if module.returns().is_none() {
            continue;
        }
        let shapes = program.module_output_shapes(id).map_err(PassError::Graph)?;
        outputs.push((
            module.name().to_string(),
            shapes.iter().map(logical_signature).collect(),
        ));
    }
    Ok(outputs)
}

fn check_preserved(
    program: &Program,
    baseline: &[(String, Vec<String>)],
    pass: &str,
) -> Result<(), PassError> {
    let current = logical_outputs(program)?;
    for (name, expected) in baseline {
        let Some((_, actual)) = current.iter().find(|(n, _)| n == name) else {
            return Err(PassError::ShapeNotPreserved {
                pass: pass.to_string(),
                module: name.clone(),
                expected: expected.join(", "),
                actual: "<no outputs>".into(),
            });
        };
        if actual != expected {
            return Err(PassError::ShapeNotPreserved {
                pass: pass.to_string(),
                module: name.clone(),
                expected: expected.join(", "),
                actual: actual.join(", "),
            });
        }
    }
    Ok(())
}

/// Element type and lengths only; strides are layout, not meaning.
fn logical_signature(shape: &Shape) -> String {
    fn write(shape: &Shape, out: &mut String) {
        match shape {
            Shape::Tensor(t) => {
                let ty: ElementType = t.element_type();
                out.push_str(ty.name());
                out.push('[');
                for (i, len) in t.lens().iter().enumerate() {
                    if i > 0 {
                        out.push('x');
                    }
                    out.push_str(&len.to_string());
                }
                out.push(']');
            }
            Shape::Tuple(components) => {
                out.push('(');
                for (i, c) in components.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write(c, out);
                }
                out.push(')');
            }
        }
    }
    let mut out = String::new();
    write(shape, &mut out);
    out
}

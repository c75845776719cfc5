//! The interpreter.
//!
//! Walks a compiled module's instructions in their (already topological)
//! order, keeping per-run results in a table keyed by value handle. Branch
//! modules execute recursively against the same table, which is how
//! closure-captured outer values resolve. Evaluation is sequential and
//! deterministic; a failed run produces no outputs.

use std::collections::HashMap;
use std::time::Instant;

use tensorgraph_ir::{Argument, InsId, ModuleId, Operator, ParamId, Program, ValueId};

use crate::compile::CompiledProgram;
use crate::context::ExecutionHook;
use crate::error::{ExecError, KernelError};

pub(crate) fn execute(
    compiled: &CompiledProgram,
    params: &HashMap<String, Argument>,
    hooks: &mut [&mut dyn ExecutionHook],
) -> Result<Vec<Argument>, ExecError> {
    let program = compiled.program();
    let main = program.main_id();
    let start = Instant::now();

    let mut values: HashMap<ValueId, Argument> = HashMap::new();
    bind_parameters(program, main, params, &mut values)?;

    run_module(compiled, main, &mut values, hooks)?;
    let outputs = resolve_returns(program, main, &values)?;

    for hook in hooks.iter_mut() {
        hook.on_run_complete(start.elapsed());
    }
    Ok(outputs)
}

/// Check the bindings against the declared parameters and seed the value
/// table. Every declared parameter must be bound with the exact shape.
fn bind_parameters(
    program: &Program,
    module: ModuleId,
    params: &HashMap<String, Argument>,
    values: &mut HashMap<ValueId, Argument>,
) -> Result<(), ExecError> {
    for (index, param) in program.module(module).params().iter().enumerate() {
        let arg = params
            .get(&param.name)
            .ok_or_else(|| ExecError::MissingArgument {
                param: param.name.clone(),
            })?;
        if arg.shape() != &param.shape {
            return Err(ExecError::ArgumentShapeMismatch {
                param: param.name.clone(),
                expected: param.shape.to_string(),
                actual: arg.shape().to_string(),
            });
        }
        values.insert(
            ValueId::Param(ParamId { module, index }),
            arg.clone(),
        );
    }
    Ok(())
}

fn run_module(
    compiled: &CompiledProgram,
    id: ModuleId,
    values: &mut HashMap<ValueId, Argument>,
    hooks: &mut [&mut dyn ExecutionHook],
) -> Result<(), ExecError> {
    let program = compiled.program();
    let module = program.module(id);

    for (index, ins) in module.instructions().iter().enumerate() {
        for hook in hooks.iter_mut() {
            hook.on_instruction_start(module.name(), index, &ins.op);
        }

        let result = match &ins.op {
            Operator::Literal { value } => value.clone(),
            Operator::If => {
                let cond = resolve(program, values, ins.inputs[0])?;
                let taken = cond
                    .scalar_at(0)
                    .map_err(|err| ExecError::KernelFailed {
                        op: ins.op.name().to_string(),
                        source: KernelError(err.to_string()),
                    })?
                    .is_truthy();
                let branch = ins.modules[if taken { 0 } else { 1 }];
                for hook in hooks.iter_mut() {
                    hook.on_branch_taken(program.module(branch).name());
                }
                run_module(compiled, branch, values, hooks)?;
                Argument::tuple(resolve_returns(program, branch, values)?)
            }
            Operator::GetTupleElem { index: elem } => {
                let tuple = resolve(program, values, ins.inputs[0])?;
                let fields = tuple.fields().ok_or_else(|| ExecError::KernelFailed {
                    op: ins.op.name().to_string(),
                    source: KernelError("input is not a tuple value".into()),
                })?;
                if *elem >= fields.len() {
                    return Err(ExecError::TupleIndexOutOfRange {
                        op: ins.op.name().to_string(),
                        index: *elem,
                        arity: fields.len(),
                    });
                }
                fields[*elem].clone()
            }
            op => {
                let kernel = compiled.kernel(InsId { module: id, index }).ok_or_else(|| {
                    ExecError::KernelFailed {
                        op: op.name().to_string(),
                        source: KernelError("no kernel bound".into()),
                    }
                })?;
                let mut args = Vec::with_capacity(ins.inputs.len());
                for &input in &ins.inputs {
                    args.push(resolve(program, values, input)?.clone());
                }
                kernel.as_ref()(&args).map_err(|source| ExecError::KernelFailed {
                    op: op.name().to_string(),
                    source,
                })?
            }
        };

        values.insert(ValueId::Instruction(InsId { module: id, index }), result);
        for hook in hooks.iter_mut() {
            hook.on_instruction_complete(module.name(), index, &ins.op);
        }
    }
    Ok(())
}

/// Look up an evaluated value. Instructions run in dependency order and
/// captures resolve through the shared table, so a miss means an unbound
/// parameter.
fn resolve<'a>(
    program: &Program,
    values: &'a HashMap<ValueId, Argument>,
    value: ValueId,
) -> Result<&'a Argument, ExecError> {
    values.get(&value).ok_or_else(|| match value {
        ValueId::Param(p) => ExecError::MissingArgument {
            param: program
                .module(p.module)
                .params()
                .get(p.index)
                .map(|param| param.name.clone())
                .unwrap_or_else(|| format!("#{}", p.index)),
        },
        ValueId::Instruction(i) => ExecError::NotEvaluated {
            module: program.module(i.module).name().to_string(),
        },
    })
}

fn resolve_returns(
    program: &Program,
    module: ModuleId,
    values: &HashMap<ValueId, Argument>,
) -> Result<Vec<Argument>, ExecError> {
    let returns = program
        .module(module)
        .returns()
        .expect("compiled modules have returns");
    returns
        .iter()
        .map(|&value| resolve(program, values, value).cloned())
        .collect()
}

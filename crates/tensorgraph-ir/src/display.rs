//! Readable program listings.

use std::fmt;

use crate::instruction::{ModuleId, ValueId};
use crate::module::Module;
use crate::program::Program;

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (id, module)) in self.modules().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write_module(f, self, id, module)?;
        }
        Ok(())
    }
}

fn write_module(
    f: &mut fmt::Formatter<'_>,
    program: &Program,
    id: ModuleId,
    module: &Module,
) -> fmt::Result {
    write!(f, "module {}(", module.name())?;
    for (i, param) in module.params().iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}: {}", param.name, param.shape)?;
    }
    writeln!(f, ") {{")?;
    for (index, ins) in module.instructions().iter().enumerate() {
        write!(f, "  %{} = {}(", index, ins.op)?;
        for (i, &input) in ins.inputs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", ref_name(program, id, input))?;
        }
        write!(f, ")")?;
        if !ins.modules.is_empty() {
            write!(f, " [")?;
            for (i, &branch) in ins.modules.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", program.module(branch).name())?;
            }
            write!(f, "]")?;
        }
        writeln!(f, " -> {}", ins.shape)?;
    }
    if let Some(returns) = module.returns() {
        write!(f, "  return ")?;
        for (i, &value) in returns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", ref_name(program, id, value))?;
        }
        writeln!(f)?;
    }
    writeln!(f, "}}")
}

/// Printable name of a value reference, qualified when it crosses modules.
fn ref_name(program: &Program, current: ModuleId, value: ValueId) -> String {
    match value {
        ValueId::Param(p) => {
            let owner = program.module(p.module);
            let name = owner
                .params()
                .get(p.index)
                .map(|param| param.name.as_str())
                .unwrap_or("?");
            if p.module == current {
                name.to_string()
            } else {
                format!("{}.{}", owner.name(), name)
            }
        }
        ValueId::Instruction(i) => {
            if i.module == current {
                format!("%{}", i.index)
            } else {
                format!("{}.%{}", program.module(i.module).name(), i.index)
            }
        }
    }
}

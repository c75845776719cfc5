//! Program statistics.

use std::fmt;

use crate::op::Operator;
use crate::program::Program;

/// Size summary of a program's module graph.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgramStats {
    pub modules: usize,
    pub instructions: usize,
    pub parameters: usize,
    pub literals: usize,
    pub branches: usize,
}

impl ProgramStats {
    pub fn collect(program: &Program) -> Self {
        let mut stats = ProgramStats {
            modules: program.module_count(),
            ..Default::default()
        };
        for (_, module) in program.modules() {
            stats.parameters += module.params().len();
            stats.instructions += module.len();
            for ins in module.instructions() {
                match ins.op {
                    Operator::Literal { .. } => stats.literals += 1,
                    Operator::If => stats.branches += 1,
                    _ => {}
                }
            }
        }
        stats
    }
}

impl fmt::Display for ProgramStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} module(s), {} instruction(s), {} parameter(s), {} literal(s), {} branch point(s)",
            self.modules, self.instructions, self.parameters, self.literals, self.branches
        )
    }
}

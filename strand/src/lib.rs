pub mod instruction;
pub mod loader;

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

pub use crate::instruction::Instruction;
pub use crate::instruction::condition::Condition;

/// An ordered sequence of instructions.
///
/// Programs nest inside `If`, `While` and `Try` payloads. They are built once
/// and never mutated by execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Program {
    pub instructions: Vec<Instruction>,
}

impl Program {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Program { instructions }
    }

    pub fn empty() -> Self {
        Program::default()
    }
}

impl Deref for Program {
    type Target = [Instruction];

    fn deref(&self) -> &[Instruction] {
        &self.instructions
    }
}

impl From<Vec<Instruction>> for Program {
    fn from(instructions: Vec<Instruction>) -> Self {
        Program { instructions }
    }
}

impl FromIterator<Instruction> for Program {
    fn from_iter<I: IntoIterator<Item = Instruction>>(iter: I) -> Self {
        Program {
            instructions: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

/// Renders the instruction count only; nested bodies are summarized, not expanded.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instructions.len() {
            1 => write!(f, "[1 instruction]"),
            n => write!(f, "[{} instructions]", n),
        }
    }
}

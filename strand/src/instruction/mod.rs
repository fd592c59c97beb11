pub mod condition;
mod wire;

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::Program;
use crate::instruction::condition::Condition;

/// A single instruction of the string machine.
///
/// The set is closed. It is marked `#[non_exhaustive]` so that code matching on it
/// from other crates keeps a fallback arm for variants it does not understand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum Instruction {
    /// Replace the register with `value`.
    SetValue { value: String },
    /// Append `value` to the register.
    Extend { value: String },
    Uppercase,
    Lowercase,
    /// Project the register to its first character.
    FirstChar,
    RemoveFirstChar,
    /// Rotate the register left by one character.
    MoveFirstCharToEnd,

    // Control flow
    If {
        condition: Condition,
        #[serde(rename = "then")]
        then_branch: Program,
        #[serde(rename = "else")]
        else_branch: Program,
    },
    While {
        condition: Condition,
        body: Program,
    },
    Try {
        body: Program,
        catch: Program,
    },
}

impl Instruction {
    pub fn set_value(value: impl Into<String>) -> Self {
        Instruction::SetValue {
            value: value.into(),
        }
    }

    pub fn extend(value: impl Into<String>) -> Self {
        Instruction::Extend {
            value: value.into(),
        }
    }

    /// `SetValue("")`.
    pub fn clear_value() -> Self {
        Instruction::set_value("")
    }

    /// `Extend("")`: reads the register without changing it.
    pub fn current_value() -> Self {
        Instruction::extend("")
    }

    pub fn if_else(
        condition: Condition,
        then_branch: impl Into<Program>,
        else_branch: impl Into<Program>,
    ) -> Self {
        Instruction::If {
            condition,
            then_branch: then_branch.into(),
            else_branch: else_branch.into(),
        }
    }

    pub fn while_loop(condition: Condition, body: impl Into<Program>) -> Self {
        Instruction::While {
            condition,
            body: body.into(),
        }
    }

    pub fn try_catch(body: impl Into<Program>, catch: impl Into<Program>) -> Self {
        Instruction::Try {
            body: body.into(),
            catch: catch.into(),
        }
    }

    /// True for `If`, `While` and `Try`.
    pub fn is_control_flow(&self) -> bool {
        matches!(
            self,
            Instruction::If { .. } | Instruction::While { .. } | Instruction::Try { .. }
        )
    }

    /// Name of the variant, as used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::SetValue { value } if value.is_empty() => "ClearValue",
            Instruction::SetValue { .. } => "SetValue",
            Instruction::Extend { value } if value.is_empty() => "CurrentValue",
            Instruction::Extend { .. } => "Extend",
            Instruction::Uppercase => "Uppercase",
            Instruction::Lowercase => "Lowercase",
            Instruction::FirstChar => "FirstChar",
            Instruction::RemoveFirstChar => "RemoveFirstChar",
            Instruction::MoveFirstCharToEnd => "MoveFirstCharToEnd",
            Instruction::If { .. } => "If",
            Instruction::While { .. } => "While",
            Instruction::Try { .. } => "Try",
        }
    }
}

impl<'de> Deserialize<'de> for Instruction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        wire::InstructionRepr::deserialize(deserializer).map(Instruction::from)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::SetValue { value } | Instruction::Extend { value } if !value.is_empty() => {
                write!(f, "{}({:?})", self.name(), value)
            }
            Instruction::If {
                condition,
                then_branch,
                else_branch,
            } => write!(f, "If({}, {}, {})", condition, then_branch, else_branch),
            Instruction::While { condition, body } => write!(f, "While({}, {})", condition, body),
            Instruction::Try { body, catch } => write!(f, "Try({}, {})", body, catch),
            _ => f.write_str(self.name()),
        }
    }
}

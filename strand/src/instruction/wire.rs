//! Decoding shapes for the JSON encoding.
//!
//! Input accepts a few spellings that never appear on output: the sugar
//! instructions `clear_value` and `current_value`, the `not_equal` condition,
//! and the `car`/`cdr` names for `first_char`/`remove_first_char`.

use serde::Deserialize;

use crate::Program;
use crate::instruction::Instruction;
use crate::instruction::condition::Condition;

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum InstructionRepr {
    SetValue {
        value: String,
    },
    Extend {
        value: String,
    },
    ClearValue,
    CurrentValue,
    Uppercase,
    Lowercase,
    #[serde(alias = "car")]
    FirstChar,
    #[serde(alias = "cdr")]
    RemoveFirstChar,
    MoveFirstCharToEnd,
    If {
        condition: Condition,
        #[serde(rename = "then", default)]
        then_branch: Program,
        #[serde(rename = "else", default)]
        else_branch: Program,
    },
    While {
        condition: Condition,
        #[serde(default)]
        body: Program,
    },
    Try {
        #[serde(default)]
        body: Program,
        #[serde(default)]
        catch: Program,
    },
}

impl From<InstructionRepr> for Instruction {
    fn from(repr: InstructionRepr) -> Self {
        match repr {
            InstructionRepr::SetValue { value } => Instruction::SetValue { value },
            InstructionRepr::Extend { value } => Instruction::Extend { value },
            InstructionRepr::ClearValue => Instruction::clear_value(),
            InstructionRepr::CurrentValue => Instruction::current_value(),
            InstructionRepr::Uppercase => Instruction::Uppercase,
            InstructionRepr::Lowercase => Instruction::Lowercase,
            InstructionRepr::FirstChar => Instruction::FirstChar,
            InstructionRepr::RemoveFirstChar => Instruction::RemoveFirstChar,
            InstructionRepr::MoveFirstCharToEnd => Instruction::MoveFirstCharToEnd,
            InstructionRepr::If {
                condition,
                then_branch,
                else_branch,
            } => Instruction::If {
                condition,
                then_branch,
                else_branch,
            },
            InstructionRepr::While { condition, body } => Instruction::While { condition, body },
            InstructionRepr::Try { body, catch } => Instruction::Try { body, catch },
        }
    }
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ConditionRepr {
    Equal {
        left: Instruction,
        right: Instruction,
    },
    NotEqual {
        left: Instruction,
        right: Instruction,
    },
    Not {
        condition: Condition,
    },
}

impl From<ConditionRepr> for Condition {
    fn from(repr: ConditionRepr) -> Self {
        match repr {
            ConditionRepr::Equal { left, right } => Condition::equal(left, right),
            ConditionRepr::NotEqual { left, right } => Condition::not_equal(left, right),
            ConditionRepr::Not { condition } => Condition::not(condition),
        }
    }
}

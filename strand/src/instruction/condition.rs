use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::instruction::Instruction;
use crate::instruction::wire::ConditionRepr;

/// A boolean test over the register, used by `If` and `While`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// True when both operands, each evaluated from the same register value, agree.
    /// Operands are expected to be plain (non-control-flow) instructions.
    Equal {
        left: Box<Instruction>,
        right: Box<Instruction>,
    },
    Not { condition: Box<Condition> },
}

impl Condition {
    pub fn equal(left: Instruction, right: Instruction) -> Self {
        Condition::Equal {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `Not(Equal(left, right))`.
    pub fn not_equal(left: Instruction, right: Instruction) -> Self {
        Condition::not(Condition::equal(left, right))
    }

    pub fn not(condition: Condition) -> Self {
        Condition::Not {
            condition: Box::new(condition),
        }
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        ConditionRepr::deserialize(deserializer).map(Condition::from)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Equal { left, right } => write!(f, "{} == {}", left, right),
            Condition::Not { condition } => match condition.as_ref() {
                Condition::Equal { left, right } => write!(f, "{} != {}", left, right),
                inner => write!(f, "!({})", inner),
            },
        }
    }
}

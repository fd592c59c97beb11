use strand::Instruction;
use tracing::warn;

use crate::value::{
    EMPTY_FIRST_CHAR, EMPTY_MOVE_FIRST_CHAR, EMPTY_REMOVE_FIRST_CHAR, Exception,
    UNKNOWN_INSTRUCTION, Value,
};

/// Apply one plain (non-control-flow) instruction to the register.
///
/// An exception register passes through untouched. Control-flow instructions,
/// and any variant this evaluator does not know, produce an
/// "Unknown instruction" exception.
pub fn evaluate(instruction: &Instruction, value: Value) -> Value {
    let mut s = match value {
        Value::String(s) => s,
        exception @ Value::Exception(_) => return exception,
    };

    match instruction {
        Instruction::SetValue { value } => Value::String(value.clone()),
        Instruction::Extend { value } => {
            s.push_str(value);
            Value::String(s)
        }
        Instruction::Uppercase => Value::String(s.to_uppercase()),
        Instruction::Lowercase => Value::String(s.to_lowercase()),
        Instruction::FirstChar => match s.chars().next() {
            Some(c) => Value::String(c.to_string()),
            None => Exception::new(EMPTY_FIRST_CHAR, instruction).into(),
        },
        Instruction::RemoveFirstChar => match s.chars().next() {
            Some(c) => {
                s.replace_range(..c.len_utf8(), "");
                Value::String(s)
            }
            None => Exception::new(EMPTY_REMOVE_FIRST_CHAR, instruction).into(),
        },
        Instruction::MoveFirstCharToEnd => match s.chars().next() {
            Some(c) => {
                s.replace_range(..c.len_utf8(), "");
                s.push(c);
                Value::String(s)
            }
            None => Exception::new(EMPTY_MOVE_FIRST_CHAR, instruction).into(),
        },
        _ => {
            warn!(%instruction, "instruction cannot be evaluated in a single step");
            Exception::new(UNKNOWN_INSTRUCTION, instruction).into()
        }
    }
}

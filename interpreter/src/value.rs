use std::fmt;

use serde::{Deserialize, Serialize};
use strand::Instruction;

pub const EMPTY_FIRST_CHAR: &str = "Empty string, cannot get first character";
pub const EMPTY_REMOVE_FIRST_CHAR: &str = "Empty string, cannot remove first character";
pub const EMPTY_MOVE_FIRST_CHAR: &str = "Empty string, cannot move first character to end";
pub const UNKNOWN_INSTRUCTION: &str = "Unknown instruction";
pub const UNKNOWN_CONTROL_FLOW: &str = "Unknown control flow instruction";

/// A failure produced by an instruction. Carried through the program as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exception {
    pub message: String,
    /// The instruction that produced the failure.
    pub instruction: Instruction,
}

impl Exception {
    pub fn new(message: impl Into<String>, instruction: &Instruction) -> Self {
        Exception {
            message: message.into(),
            instruction: instruction.clone(),
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at {})", self.message, self.instruction)
    }
}

/// The register: a string, or the exception that replaced it.
///
/// Equality is structural: two strings compare by content, a string never
/// equals an exception, and two exceptions are equal when both their message
/// and instruction match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ValueRepr", from = "ValueRepr")]
pub enum Value {
    String(String),
    Exception(Exception),
}

impl Value {
    pub fn is_exception(&self) -> bool {
        matches!(self, Value::Exception(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Exception(_) => None,
        }
    }

    pub fn exception(&self) -> Option<&Exception> {
        match self {
            Value::Exception(e) => Some(e),
            Value::String(_) => None,
        }
    }

    pub fn into_result(self) -> Result<String, Exception> {
        match self {
            Value::String(s) => Ok(s),
            Value::Exception(e) => Err(e),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::String(String::new())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Exception> for Value {
    fn from(e: Exception) -> Self {
        Value::Exception(e)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Exception(e) => write!(f, "exception: {}", e),
        }
    }
}

/// Wire shape: `{"kind": "ok", "value": ..}` or `{"kind": "error", "message": .., "instruction": ..}`.
#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum ValueRepr {
    Ok {
        value: String,
    },
    Error {
        message: String,
        instruction: Instruction,
    },
}

impl From<Value> for ValueRepr {
    fn from(value: Value) -> Self {
        match value {
            Value::String(value) => ValueRepr::Ok { value },
            Value::Exception(Exception {
                message,
                instruction,
            }) => ValueRepr::Error {
                message,
                instruction,
            },
        }
    }
}

impl From<ValueRepr> for Value {
    fn from(repr: ValueRepr) -> Self {
        match repr {
            ValueRepr::Ok { value } => Value::String(value),
            ValueRepr::Error {
                message,
                instruction,
            } => Value::Exception(Exception {
                message,
                instruction,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_never_equals_exception() {
        let exception = Value::from(Exception::new(EMPTY_FIRST_CHAR, &Instruction::FirstChar));
        assert_ne!(Value::from(""), exception);
        assert_ne!(Value::from(EMPTY_FIRST_CHAR), exception);
    }

    #[test]
    fn exceptions_compare_message_and_instruction() {
        let a = Exception::new(EMPTY_REMOVE_FIRST_CHAR, &Instruction::RemoveFirstChar);
        let b = Exception::new(EMPTY_REMOVE_FIRST_CHAR, &Instruction::RemoveFirstChar);
        let other_message = Exception::new(UNKNOWN_INSTRUCTION, &Instruction::RemoveFirstChar);
        let other_instruction = Exception::new(EMPTY_REMOVE_FIRST_CHAR, &Instruction::FirstChar);
        assert_eq!(a, b);
        assert_ne!(a, other_message);
        assert_ne!(a, other_instruction);
    }

    #[test]
    fn encodes_as_kind_tagged_record() {
        let ok = serde_json::to_value(Value::from("abc")).unwrap();
        assert_eq!(ok, serde_json::json!({ "kind": "ok", "value": "abc" }));

        let error = serde_json::to_value(Value::from(Exception::new(
            EMPTY_REMOVE_FIRST_CHAR,
            &Instruction::RemoveFirstChar,
        )))
        .unwrap();
        assert_eq!(
            error,
            serde_json::json!({
                "kind": "error",
                "message": "Empty string, cannot remove first character",
                "instruction": { "type": "remove_first_char" }
            })
        );

        let decoded: Value = serde_json::from_value(error).unwrap();
        assert!(decoded.is_exception());
    }

    #[test]
    fn display_names_the_failing_instruction() {
        let value = Value::from(Exception::new(EMPTY_FIRST_CHAR, &Instruction::FirstChar));
        assert_eq!(
            value.to_string(),
            "exception: Empty string, cannot get first character (at FirstChar)"
        );
        assert_eq!(Value::from("ab").to_string(), "ab");
    }
}

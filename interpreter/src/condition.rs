use strand::Condition;

use crate::evaluator::evaluate;
use crate::value::Value;

/// Evaluate a condition against the register.
///
/// Both operands of `Equal` start from the same `value`. A failing operand
/// takes part in the comparison as an exception value, so this never fails.
pub fn evaluate_check(condition: &Condition, value: &Value) -> bool {
    match condition {
        Condition::Equal { left, right } => {
            evaluate(left, value.clone()) == evaluate(right, value.clone())
        }
        Condition::Not { condition } => !evaluate_check(condition, value),
    }
}

use strand::Instruction;
use tracing::{debug, trace, warn};

use crate::budget::{Budget, Step, Unbounded};
use crate::condition::evaluate_check;
use crate::evaluator::evaluate;
use crate::value::{Exception, UNKNOWN_CONTROL_FLOW, Value};

/// Execute a program against an empty register.
pub fn execute(program: &[Instruction]) -> Value {
    execute_with(program, "")
}

/// Execute a program against the given initial register.
pub fn execute_with(program: &[Instruction], initial: impl Into<Value>) -> Value {
    match Executor::new(Unbounded).run(program, initial) {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

/// Runs programs under a host-supplied [`Budget`].
///
/// If and Try recurse into their sub-programs; While iterates in place, so the
/// number of loop iterations is not limited by the call stack.
pub struct Executor<B = Unbounded> {
    budget: B,
    steps: u64,
}

impl<B: Budget> Executor<B> {
    pub fn new(budget: B) -> Self {
        Executor { budget, steps: 0 }
    }

    /// Execute `program` from `initial`, returning the final register.
    ///
    /// `Err` means the budget refused a step; program failures are returned as
    /// `Ok(Value::Exception(..))`.
    pub fn run(
        &mut self,
        program: &[Instruction],
        initial: impl Into<Value>,
    ) -> Result<Value, B::Error> {
        self.steps = 0;
        self.budget.begin();
        let result = self.execute_program(program, initial.into(), 0);
        debug!(steps = self.steps, "run finished");
        result
    }

    /// Steps charged by the most recent run.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn budget(&self) -> &B {
        &self.budget
    }

    fn charge(&mut self, instruction: &Instruction, depth: usize) -> Result<(), B::Error> {
        self.steps += 1;
        self.budget.charge(&Step {
            count: self.steps,
            depth,
            instruction,
        })
    }

    fn execute_program(
        &mut self,
        program: &[Instruction],
        mut value: Value,
        depth: usize,
    ) -> Result<Value, B::Error> {
        for instruction in program {
            value = self.execute_instruction(instruction, value, depth)?;
        }
        Ok(value)
    }

    fn execute_instruction(
        &mut self,
        instruction: &Instruction,
        mut value: Value,
        depth: usize,
    ) -> Result<Value, B::Error> {
        self.charge(instruction, depth)?;
        trace!(depth, %instruction, "step");

        if !instruction.is_control_flow() {
            return Ok(evaluate(instruction, value));
        }

        match instruction {
            Instruction::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let branch = if evaluate_check(condition, &value) {
                    then_branch
                } else {
                    else_branch
                };
                self.execute_program(branch, value, depth + 1)
            }
            Instruction::While { condition, body } => {
                let mut iterations: u64 = 0;
                while evaluate_check(condition, &value) {
                    value = self.execute_program(body, value, depth + 1)?;
                    iterations += 1;
                    // Each re-test of the condition costs a step.
                    self.charge(instruction, depth)?;
                }
                trace!(depth, iterations, "loop exited");
                Ok(value)
            }
            Instruction::Try { body, catch } => {
                match self.execute_program(body, value.clone(), depth + 1)? {
                    Value::Exception(exception) => {
                        debug!(%exception, "caught; running catch program");
                        self.execute_program(catch, value, depth + 1)
                    }
                    result => Ok(result),
                }
            }
            _ => {
                warn!(%instruction, "unknown control flow instruction");
                Ok(Exception::new(UNKNOWN_CONTROL_FLOW, instruction).into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use strand::Condition;

    use super::*;
    use crate::budget::Limits;
    use crate::error::RuntimeError;
    use crate::value::EMPTY_REMOVE_FIRST_CHAR;

    #[test]
    fn empty_program_returns_initial_value() {
        assert_eq!(execute(&[]), Value::from(""));
        assert_eq!(execute_with(&[], "keep"), Value::from("keep"));
    }

    #[test]
    fn branches_start_from_pre_branch_value() {
        let program = [
            Instruction::set_value("a"),
            Instruction::if_else(
                Condition::equal(Instruction::current_value(), Instruction::set_value("zzz")),
                vec![Instruction::extend("t")],
                vec![Instruction::extend("e")],
            ),
        ];
        assert_eq!(execute(&program), Value::from("ae"));
    }

    #[test]
    fn loop_that_never_runs() {
        let program = [Instruction::while_loop(
            Condition::not_equal(Instruction::current_value(), Instruction::set_value("x")),
            vec![Instruction::extend("never")],
        )];
        assert_eq!(execute_with(&program, "x"), Value::from("x"));
    }

    #[test]
    fn catch_sees_pre_try_value() {
        let program = [
            Instruction::set_value("ab"),
            Instruction::try_catch(
                vec![
                    Instruction::clear_value(),
                    Instruction::RemoveFirstChar,
                ],
                vec![Instruction::extend("!")],
            ),
        ];
        assert_eq!(execute(&program), Value::from("ab!"));
    }

    #[test]
    fn successful_try_keeps_body_result() {
        let program = [Instruction::try_catch(
            vec![Instruction::extend("ok")],
            vec![Instruction::set_value("caught")],
        )];
        assert_eq!(execute(&program), Value::from("ok"));
    }

    #[test]
    fn failing_catch_surfaces_its_own_exception() {
        let program = [Instruction::try_catch(
            vec![Instruction::FirstChar],
            vec![Instruction::RemoveFirstChar],
        )];
        assert_eq!(
            execute(&program),
            Value::from(Exception::new(
                EMPTY_REMOVE_FIRST_CHAR,
                &Instruction::RemoveFirstChar
            ))
        );
    }

    #[test]
    fn steps_count_instructions_and_loop_tests() {
        let program = [
            Instruction::clear_value(),
            Instruction::while_loop(
                Condition::not_equal(Instruction::current_value(), Instruction::set_value("aa")),
                vec![Instruction::extend("a")],
            ),
        ];
        let mut executor = Executor::new(Unbounded);
        assert_eq!(executor.run(&program, ""), Ok(Value::from("aa")));
        // ClearValue, While, 2 x (Extend + re-test)
        assert_eq!(executor.steps(), 6);
    }

    #[test]
    fn step_limit_stops_infinite_loop() {
        let program = [Instruction::while_loop(
            Condition::equal(Instruction::current_value(), Instruction::current_value()),
            vec![],
        )];
        let mut executor = Executor::new(Limits::new().with_max_steps(1_000));
        assert_eq!(
            executor.run(&program, "spin"),
            Err(RuntimeError::StepLimitExceeded { limit: 1_000 })
        );
        assert_eq!(executor.steps(), 1_001);
    }

    #[test]
    fn budget_refusal_is_not_caught_by_try() {
        let program = [Instruction::try_catch(
            vec![Instruction::while_loop(
                Condition::equal(Instruction::current_value(), Instruction::current_value()),
                vec![Instruction::Uppercase],
            )],
            vec![Instruction::set_value("caught")],
        )];
        let mut executor = Executor::new(Limits::new().with_max_steps(50));
        assert_eq!(
            executor.run(&program, "x"),
            Err(RuntimeError::StepLimitExceeded { limit: 50 })
        );
    }

    #[test]
    fn depth_limit_applies_to_nested_programs() {
        let mut program = vec![Instruction::extend("!")];
        for _ in 0..5 {
            program = vec![Instruction::try_catch(program, vec![])];
        }

        let mut shallow = Executor::new(Limits::new().with_max_depth(3));
        assert_eq!(
            shallow.run(&program, ""),
            Err(RuntimeError::DepthLimitExceeded { limit: 3 })
        );

        let mut deep_enough = Executor::new(Limits::new().with_max_depth(5));
        assert_eq!(deep_enough.run(&program, ""), Ok(Value::from("!")));
    }

    #[test]
    fn executor_is_reusable() {
        let mut executor = Executor::new(Limits::new().with_max_steps(2));
        let program = [Instruction::extend("a"), Instruction::extend("b")];
        assert_eq!(executor.run(&program, ""), Ok(Value::from("ab")));
        assert_eq!(executor.run(&program, "x"), Ok(Value::from("xab")));
    }
}

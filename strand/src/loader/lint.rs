use crate::Program;
use crate::instruction::Instruction;
use crate::instruction::condition::Condition;
use crate::loader::error::LoadError;

/// Walk a decoded program and collect warnings for constructs that are valid
/// but almost certainly not what the author meant.
pub(crate) fn lint_program(program: &Program, file_id: usize) -> Vec<LoadError> {
    let mut linter = Linter {
        file_id,
        path: Vec::new(),
        warnings: Vec::new(),
    };
    linter.program(program);
    linter.warnings
}

struct Linter {
    file_id: usize,
    /// Breadcrumbs from the root program to the current instruction.
    path: Vec<String>,
    warnings: Vec<LoadError>,
}

impl Linter {
    fn program(&mut self, program: &Program) {
        for (idx, instruction) in program.iter().enumerate() {
            self.path.push(format!("instruction {}", idx));
            self.instruction(instruction);
            self.path.pop();
        }
    }

    fn nested(&mut self, label: &str, program: &Program) {
        self.path.push(label.to_string());
        self.program(program);
        self.path.pop();
    }

    fn instruction(&mut self, instruction: &Instruction) {
        match instruction {
            Instruction::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.condition(condition);
                self.nested("then", then_branch);
                self.nested("else", else_branch);
            }
            Instruction::While { condition, body } => {
                self.condition(condition);
                if body.is_empty() {
                    self.warn(
                        "`While` has an empty body; it never terminates unless its condition is false on entry",
                    );
                }
                self.nested("while body", body);
            }
            Instruction::Try { body, catch } => {
                self.nested("try body", body);
                self.nested("catch", catch);
            }
            _ => {}
        }
    }

    fn condition(&mut self, condition: &Condition) {
        match condition {
            Condition::Equal { left, right } => {
                for operand in [left, right] {
                    if operand.is_control_flow() {
                        self.warn(format!(
                            "condition operand is the control-flow instruction `{}`; it always evaluates to \"Unknown instruction\"",
                            operand.name()
                        ));
                    }
                }
            }
            Condition::Not { condition } => self.condition(condition),
        }
    }

    fn warn(&mut self, message: impl Into<String>) {
        let warning = LoadError::warning(message, self.file_id)
            .with_note(format!("at {}", self.path.join(" > ")));
        self.warnings.push(warning);
    }
}

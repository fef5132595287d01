//! The generated practice problem

use serde::{Deserialize, Serialize};

use super::steps::{self, SolutionStep};
use crate::expression::CompositeExpression;
use crate::types::{Difficulty, Operation};

/// A single practice problem
///
/// `correct_answer` is always the exact value of `operand1 operation operand2`,
/// or of `composite` when present. Problems are built once by the synthesizer
/// and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub operand1: i32,
    pub operand2: i32,
    pub operation: Operation,
    pub correct_answer: i32,
    pub difficulty: Difficulty,
    /// Present for composite-expression problems
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composite: Option<CompositeExpression>,
    /// Rendered composite text, e.g. `2 + 3 × 4 = ?`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression_text: Option<String>,
}

impl Problem {
    /// A single-operation problem; the answer is computed here.
    ///
    /// Division callers pick a non-zero divisor that divides the dividend.
    pub fn basic(operation: Operation, operand1: i32, operand2: i32, difficulty: Difficulty) -> Self {
        Self {
            operand1,
            operand2,
            operation,
            correct_answer: operation.apply(operand1, operand2),
            difficulty,
            composite: None,
            expression_text: None,
        }
    }

    /// Wrap a composite expression. The first operator and first two operands
    /// stand in for the basic fields.
    pub fn composite(expression: CompositeExpression, difficulty: Difficulty) -> Self {
        let operands = expression.operands();
        Self {
            operand1: operands[0],
            operand2: operands[1],
            operation: expression.operators()[0],
            correct_answer: expression.evaluate(),
            difficulty,
            expression_text: Some(format!("{} = ?", expression.render())),
            composite: Some(expression),
        }
    }

    pub fn is_composite(&self) -> bool {
        self.composite.is_some()
    }

    pub fn check_answer(&self, answer: i32) -> bool {
        answer == self.correct_answer
    }

    /// Text shown to the learner
    pub fn question_text(&self) -> String {
        match &self.expression_text {
            Some(text) if self.is_composite() => text.clone(),
            _ => format!("{} {} {} = ?", self.operand1, self.operation.symbol(), self.operand2),
        }
    }

    /// Worked solution, step by step
    pub fn solution_steps(&self) -> Vec<SolutionStep> {
        match &self.composite {
            Some(expression) => steps::composite_steps(expression, self.correct_answer),
            None => steps::basic_steps(self.operation, self.operand1, self.operand2),
        }
    }
}

impl std::fmt::Display for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.question_text())
    }
}

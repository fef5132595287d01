//! Composite expression evaluation
//!
//! A composite expression is a chain of operands joined by operators, e.g.
//! `2 + 3 × 4`. Evaluation reduces the chain in two passes: every `×`/`÷`
//! left to right, then every `+`/`-` left to right. Each pass builds a new,
//! shorter sequence; nothing is removed in place.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Operation, Precedence};

/// Malformed operand/operator sequences
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    #[error("an expression needs at least two operands, got {0}")]
    TooShort(usize),
    #[error("{operands} operands require {} operators, got {operators}", .operands - 1)]
    LengthMismatch { operands: usize, operators: usize },
    #[error("division by zero at operator {position}")]
    DivisionByZero { position: usize },
    #[error("{left} {} {right} overflows", .operation.symbol())]
    Overflow { left: i32, operation: Operation, right: i32 },
}

/// One reduction performed while evaluating an expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReductionStep {
    pub left: i32,
    pub operation: Operation,
    pub right: i32,
    pub result: i32,
    /// Remainder discarded by a truncating division, if any
    pub remainder: Option<i32>,
    /// The whole expression after this reduction
    pub expression_after: String,
}

/// An immutable, validated operand/operator chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ExpressionParts", into = "ExpressionParts")]
pub struct CompositeExpression {
    operands: Vec<i32>,
    operators: Vec<Operation>,
}

#[derive(Serialize, Deserialize)]
struct ExpressionParts {
    operands: Vec<i32>,
    operators: Vec<Operation>,
}

impl TryFrom<ExpressionParts> for CompositeExpression {
    type Error = ExpressionError;

    fn try_from(parts: ExpressionParts) -> Result<Self, Self::Error> {
        CompositeExpression::new(parts.operands, parts.operators)
    }
}

impl From<CompositeExpression> for ExpressionParts {
    fn from(expr: CompositeExpression) -> Self {
        ExpressionParts {
            operands: expr.operands,
            operators: expr.operators,
        }
    }
}

impl CompositeExpression {
    /// Build an expression, checking `operands.len() == operators.len() + 1`
    pub fn new(operands: Vec<i32>, operators: Vec<Operation>) -> Result<Self, ExpressionError> {
        if operands.len() < 2 {
            return Err(ExpressionError::TooShort(operands.len()));
        }
        if operands.len() != operators.len() + 1 {
            return Err(ExpressionError::LengthMismatch {
                operands: operands.len(),
                operators: operators.len(),
            });
        }
        // The right side of every ÷ is an original operand in both passes,
        // so checking the literals here is enough.
        if let Some(position) = operators
            .iter()
            .enumerate()
            .position(|(i, op)| *op == Operation::Div && operands[i + 1] == 0)
        {
            return Err(ExpressionError::DivisionByZero { position });
        }
        try_reduce(&operands, &operators)?;
        Ok(Self { operands, operators })
    }

    pub fn operands(&self) -> &[i32] {
        &self.operands
    }

    pub fn operators(&self) -> &[Operation] {
        &self.operators
    }

    /// Evaluate with standard precedence
    pub fn evaluate(&self) -> i32 {
        self.reduce().0
    }

    /// Every reduction in evaluation order
    pub fn reduction_steps(&self) -> Vec<ReductionStep> {
        self.reduce().1
    }

    /// Whether the expression mixes both precedence classes
    pub fn mixes_precedence(&self) -> bool {
        let has = |class| self.operators.iter().any(|op| op.precedence() == class);
        has(Precedence::Multiplicative) && has(Precedence::Additive)
    }

    /// Render as `2 + 3 × 4`
    pub fn render(&self) -> String {
        render_sequence(self.operands.iter(), self.operators.iter())
    }

    fn reduce(&self) -> (i32, Vec<ReductionStep>) {
        // `new` already ran the same reduction and rejected overflow
        try_reduce(&self.operands, &self.operators).unwrap_or_default()
    }
}

impl std::fmt::Display for CompositeExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Evaluate a raw operand/operator sequence
pub fn evaluate(operands: &[i32], operators: &[Operation]) -> Result<i32, ExpressionError> {
    CompositeExpression::new(operands.to_vec(), operators.to_vec()).map(|expr| expr.evaluate())
}

fn try_reduce(operands: &[i32], operators: &[Operation]) -> Result<(i32, Vec<ReductionStep>), ExpressionError> {
    let mut steps = Vec::with_capacity(operators.len());
    let (operands, operators) = reduce_pass(operands, operators, Precedence::Multiplicative, &mut steps)?;
    let (operands, _) = reduce_pass(&operands, &operators, Precedence::Additive, &mut steps)?;
    Ok((operands.first().copied().unwrap_or_default(), steps))
}

/// Resolve every operator of one precedence class, left to right, into a new sequence
fn reduce_pass(
    operands: &[i32],
    operators: &[Operation],
    class: Precedence,
    steps: &mut Vec<ReductionStep>,
) -> Result<(Vec<i32>, Vec<Operation>), ExpressionError> {
    let mut reduced_operands: Vec<i32> = Vec::with_capacity(operands.len());
    let mut reduced_operators: Vec<Operation> = Vec::with_capacity(operators.len());
    reduced_operands.extend(operands.first().copied());

    let rest = operands.get(1..).unwrap_or_default();
    for (index, (&op, &right)) in operators.iter().zip(rest).enumerate() {
        if op.precedence() != class {
            reduced_operators.push(op);
            reduced_operands.push(right);
            continue;
        }

        if let Some(accumulator) = reduced_operands.last_mut() {
            let left = *accumulator;
            let result = op.checked_apply(left, right).ok_or(ExpressionError::Overflow {
                left,
                operation: op,
                right,
            })?;
            *accumulator = result;

            let remainder = match op {
                Operation::Div if left % right != 0 => Some(left % right),
                _ => None,
            };
            let expression_after = render_sequence(
                reduced_operands.iter().chain(&operands[index + 2..]),
                reduced_operators.iter().chain(&operators[index + 1..]),
            );
            steps.push(ReductionStep {
                left,
                operation: op,
                right,
                result,
                remainder,
                expression_after,
            });
        }
    }

    Ok((reduced_operands, reduced_operators))
}

fn render_sequence<'a>(
    mut operands: impl Iterator<Item = &'a i32>,
    operators: impl Iterator<Item = &'a Operation>,
) -> String {
    let mut text = operands.next().map(|n| n.to_string()).unwrap_or_default();
    for (op, n) in operators.zip(operands) {
        text.push_str(&format!(" {} {}", op.symbol(), n));
    }
    text
}

//! Templated worked solutions

use serde::{Deserialize, Serialize};

use crate::expression::CompositeExpression;
use crate::types::Operation;

/// One titled step of a worked solution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionStep {
    pub title: String,
    pub description: String,
}

impl SolutionStep {
    fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Steps for a single-operation problem
pub fn basic_steps(operation: Operation, a: i32, b: i32) -> Vec<SolutionStep> {
    match operation {
        Operation::Add => addition_steps(a, b),
        Operation::Sub => subtraction_steps(a, b),
        Operation::Mul => multiplication_steps(a, b),
        Operation::Div => division_steps(a, b),
    }
}

/// Steps for a composite expression, one per reduction
pub fn composite_steps(expression: &CompositeExpression, answer: i32) -> Vec<SolutionStep> {
    let rendered = expression.render();
    let mut steps = vec![SolutionStep::new(
        "Analyze",
        format!("{} is a composite expression; work it out following the order of operations", rendered),
    )];

    if expression.mixes_precedence() {
        steps.push(SolutionStep::new(
            "Order of operations",
            "Multiplication (×) and division (÷) come first, then addition (+) and subtraction (-)",
        ));
    } else {
        steps.push(SolutionStep::new("Order of operations", "Work from left to right"));
    }

    let reductions = expression.reduction_steps();
    let last = reductions.len().saturating_sub(1);
    for (i, step) in reductions.iter().enumerate() {
        let description = match (step.operation, step.remainder) {
            (Operation::Mul, _) => format!("Multiply first: {} × {} = {}", step.left, step.right, step.result),
            (Operation::Div, None) => format!("Divide first: {} ÷ {} = {}", step.left, step.right, step.result),
            (Operation::Div, Some(remainder)) => format!(
                "Divide first: {} ÷ {} = {} remainder {} (keep the whole part {})",
                step.left, step.right, step.result, remainder, step.result
            ),
            (Operation::Add, _) => format!("Add: {} + {} = {}", step.left, step.right, step.result),
            (Operation::Sub, _) => format!("Subtract: {} - {} = {}", step.left, step.right, step.result),
        };
        steps.push(SolutionStep::new(format!("Step {}", i + 1), description));

        if i != last {
            steps.push(SolutionStep::new(
                "Expression now",
                format!("The expression becomes {}", step.expression_after),
            ));
        }
    }

    steps.push(SolutionStep::new("Answer", format!("So {} = {}", rendered, answer)));
    steps
}

fn addition_steps(a: i32, b: i32) -> Vec<SolutionStep> {
    let sum = a + b;
    let kind = if sum > 10 { "an addition that needs carrying" } else { "a simple addition" };
    let mut steps = vec![SolutionStep::new("Analyze", format!("Work out {} + {}, {}", a, b, kind))];

    if sum <= 10 {
        steps.push(SolutionStep::new("Method", "The sum is 10 or less, so count on directly"));
        steps.push(SolutionStep::new(
            "Count on",
            format!("Start at {} and count {} more: {}", a, b, counting_sequence(a, b, 1)),
        ));
        steps.push(SolutionStep::new("Check", format!("{} - {} = {} ✓", sum, b, a)));
    } else if a < 10 && b < 10 {
        let complement = 10 - a;
        let remaining = b - complement;
        steps.push(SolutionStep::new("Method", "Make ten first, then add what is left"));
        steps.push(SolutionStep::new(
            "Split",
            format!("Split {} into {} + {}, because {} + {} = 10", b, complement, remaining, a, complement),
        ));
        steps.push(SolutionStep::new("First", format!("{} + {} = 10", a, complement)));
        steps.push(SolutionStep::new("Then", format!("10 + {} = {}", remaining, sum)));
        steps.push(SolutionStep::new("Check", format!("{} - {} = {} ✓", sum, a, b)));
    } else {
        steps.push(SolutionStep::new("Method", "Use column addition, place value by place value"));
        if a >= 10 && b >= 10 {
            steps.push(SolutionStep::new(
                "Place value",
                format!("Tens: {} + {}; ones: {} + {}", a / 10, b / 10, a % 10, b % 10),
            ));
        }
        steps.push(SolutionStep::new("Calculate", format!("{} + {} = {}", a, b, sum)));
        steps.push(SolutionStep::new("Check", format!("{} - {} = {} ✓", sum, a, b)));
    }

    steps.push(SolutionStep::new("Answer", format!("So {} + {} = {}", a, b, sum)));
    steps
}

fn subtraction_steps(a: i32, b: i32) -> Vec<SolutionStep> {
    let difference = a - b;
    let borrow = needs_borrow(a, b);
    let kind = if borrow { "a subtraction that needs borrowing" } else { "a simple subtraction" };
    let mut steps = vec![SolutionStep::new("Analyze", format!("Work out {} - {}, {}", a, b, kind))];

    if a < 20 && b < 10 && !borrow {
        steps.push(SolutionStep::new("Method", "No borrowing is needed, so count back directly"));
        steps.push(SolutionStep::new(
            "Count back",
            format!("Start at {} and count back {}: {}", a, b, counting_sequence(a, b, -1)),
        ));
    } else if borrow {
        let ones = a % 10;
        let other_ones = b % 10;
        steps.push(SolutionStep::new("Method", "Borrow from the tens place"));
        steps.push(SolutionStep::new("Place value", format!("{} has {} tens and {} ones", a, a / 10, ones)));
        steps.push(SolutionStep::new(
            "Borrow",
            format!(
                "{} ones is less than {}, so borrow one ten: {} - {} = {}",
                ones,
                other_ones,
                ones + 10,
                other_ones,
                ones + 10 - other_ones
            ),
        ));
        steps.push(SolutionStep::new("Calculate", format!("{} - {} = {}", a, b, difference)));
    } else {
        steps.push(SolutionStep::new("Method", "Subtract place value by place value"));
        steps.push(SolutionStep::new("Calculate", format!("{} - {} = {}", a, b, difference)));
    }

    steps.push(SolutionStep::new("Check", format!("{} + {} = {} ✓", difference, b, a)));
    steps.push(SolutionStep::new("Answer", format!("So {} - {} = {}", a, b, difference)));
    steps
}

fn multiplication_steps(a: i32, b: i32) -> Vec<SolutionStep> {
    let product = a * b;
    let mut steps = Vec::new();

    if a <= 10 && b <= 10 {
        let (small, large) = (a.min(b), a.max(b));
        steps.push(SolutionStep::new("Analyze", format!("Work out {} × {} from the times tables", a, b)));
        steps.push(SolutionStep::new("Times table", format!("From the {} times table: {} × {} = {}", small, small, large, product)));
        steps.push(SolutionStep::new(
            "Meaning",
            format!("{} × {} means {} groups of {}", a, b, a, b),
        ));
        if a > 0 {
            steps.push(SolutionStep::new("Repeated addition", repeated_addition(a, b)));
        }
    } else {
        steps.push(SolutionStep::new("Analyze", format!("Work out {} × {} with larger numbers", a, b)));
        let decomposition = if a > 10 && b <= 10 {
            format!("Split {} into {} × 10 + {} and multiply each part by {}", a, a / 10, a % 10, b)
        } else if b > 10 && a <= 10 {
            format!("Split {} into {} × 10 + {} and multiply each part by {}", b, b / 10, b % 10, a)
        } else {
            "Use column multiplication".to_string()
        };
        steps.push(SolutionStep::new("Method", decomposition));
        steps.push(SolutionStep::new("Calculate", format!("{} × {} = {}", a, b, product)));
    }

    if a != 0 {
        steps.push(SolutionStep::new("Check", format!("{} ÷ {} = {} ✓", product, a, b)));
    }
    steps.push(SolutionStep::new("Answer", format!("So {} × {} = {}", a, b, product)));
    steps
}

fn division_steps(a: i32, b: i32) -> Vec<SolutionStep> {
    if b == 0 {
        return vec![SolutionStep::new("Analyze", "Division by zero has no answer")];
    }

    let quotient = a / b;
    let remainder = a % b;
    let mut steps = Vec::new();

    if remainder == 0 {
        steps.push(SolutionStep::new("Analyze", format!("Work out {} ÷ {}, which divides exactly", a, b)));
        steps.push(SolutionStep::new("Meaning", format!("Share {} into {} equal groups", a, b)));
        steps.push(SolutionStep::new("Think", format!("{} × ? = {}; the answer is {}", b, a, quotient)));
        steps.push(SolutionStep::new("Check", format!("{} × {} = {} ✓", quotient, b, a)));
        steps.push(SolutionStep::new("Answer", format!("So {} ÷ {} = {}", a, b, quotient)));
    } else {
        steps.push(SolutionStep::new("Analyze", format!("Work out {} ÷ {}, which leaves a remainder", a, b)));
        steps.push(SolutionStep::new("Meaning", format!("How many groups of {} fit into {}?", b, a)));
        steps.push(SolutionStep::new(
            "Quotient",
            format!("The largest whole quotient is {}, because {} × {} = {}", quotient, quotient, b, quotient * b),
        ));
        steps.push(SolutionStep::new("Remainder", format!("{} - {} = {}", a, quotient * b, remainder)));
        steps.push(SolutionStep::new(
            "Check",
            format!("{} × {} + {} = {} ✓", quotient, b, remainder, a),
        ));
        steps.push(SolutionStep::new(
            "Answer",
            format!("So {} ÷ {} = {} remainder {}", a, b, quotient, remainder),
        ));
    }
    steps
}

/// Whether `a - b` needs a borrow in the ones place
pub(crate) fn needs_borrow(a: i32, b: i32) -> bool {
    a >= 10 && a % 10 < b % 10
}

fn counting_sequence(start: i32, count: i32, direction: i32) -> String {
    let mut parts = vec![start.to_string()];
    parts.extend((1..=count).map(|i| (start + i * direction).to_string()));
    parts.join(" → ")
}

fn repeated_addition(times: i32, value: i32) -> String {
    let terms = vec![value.to_string(); times as usize];
    format!("{} = {}", terms.join(" + "), times * value)
}

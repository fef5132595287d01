//! Error pattern analyzer
//!
//! Groups wrong answers by operation and applies threshold heuristics for
//! carrying, borrowing, large numbers and slip-style calculation errors.
//! Every call recomputes from scratch; nothing is cached between calls.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::history::WrongAnswerRecord;
use crate::types::Operation;

/// Share of an operation group that must show a sub-pattern to name it
const SUB_PATTERN_SHARE: f64 = 0.6;
/// Share of all records with a large operand before range is flagged
const LARGE_NUMBER_SHARE: f64 = 0.4;
/// Share of all records matching the carry/borrow slip heuristic
const CALCULATION_ERROR_SHARE: f64 = 0.3;
/// Operands above this count as large numbers
const LARGE_OPERAND: i32 = 20;

/// Kind of detected weakness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    OperationSpecific,
    NumberRange,
    CalculationError,
    ConceptualError,
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternKind::OperationSpecific => write!(f, "operation"),
            PatternKind::NumberRange => write!(f, "number range"),
            PatternKind::CalculationError => write!(f, "calculation"),
            PatternKind::ConceptualError => write!(f, "conceptual"),
        }
    }
}

/// How urgently a pattern needs attention
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Severity from the mean miss count of a group
    pub fn from_mean_misses(mean: f64) -> Self {
        if mean > 3.0 {
            Severity::High
        } else if mean > 2.0 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// A recurring weakness found in the history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPattern {
    pub kind: PatternKind,
    pub operation: Option<Operation>,
    pub description: String,
    pub recommendation: String,
    pub severity: Severity,
    pub affected_records: usize,
}

/// Outcome of one analysis pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub patterns: Vec<ErrorPattern>,
    pub most_problematic_operation: Option<Operation>,
    pub average_miss_count: f64,
    pub total_records: usize,
}

impl AnalysisResult {
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Patterns at or above `severity`
    pub fn patterns_at_least(&self, severity: Severity) -> impl Iterator<Item = &ErrorPattern> {
        self.patterns.iter().filter(move |p| p.severity >= severity)
    }
}

/// Stateless wrong-answer classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorPatternAnalyzer;

impl ErrorPatternAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, records: &[WrongAnswerRecord]) -> AnalysisResult {
        if records.is_empty() {
            return AnalysisResult::default();
        }

        let groups = group_by_operation(records);
        let mut patterns: Vec<ErrorPattern> = groups
            .iter()
            .map(|(operation, group)| operation_pattern(*operation, group))
            .collect();
        patterns.extend(number_range_pattern(records));
        patterns.extend(calculation_error_pattern(records));

        let result = AnalysisResult {
            patterns,
            most_problematic_operation: most_problematic(&groups),
            average_miss_count: mean_misses(records),
            total_records: records.len(),
        };

        debug!(
            "Analyzed {} wrong answers: {} patterns, most problematic {:?}",
            result.total_records,
            result.patterns.len(),
            result.most_problematic_operation
        );
        result
    }
}

/// Groups in first-seen order
fn group_by_operation(records: &[WrongAnswerRecord]) -> Vec<(Operation, Vec<&WrongAnswerRecord>)> {
    let mut groups: Vec<(Operation, Vec<&WrongAnswerRecord>)> = Vec::new();
    for record in records {
        match groups.iter_mut().find(|(operation, _)| *operation == record.operation) {
            Some((_, group)) => group.push(record),
            None => groups.push((record.operation, vec![record])),
        }
    }
    groups
}

fn mean_misses<'a, I>(records: I) -> f64
where
    I: IntoIterator<Item = &'a WrongAnswerRecord>,
{
    let (sum, count) = records
        .into_iter()
        .fold((0u64, 0usize), |(sum, count), r| (sum + u64::from(r.miss_count), count + 1));
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

/// `part` is strictly more than `share` of `whole`
fn exceeds(part: usize, whole: usize, share: f64) -> bool {
    part as f64 > whole as f64 * share
}

/// More than 60% of `group` satisfies `predicate`
fn majority(group: &[&WrongAnswerRecord], predicate: impl Fn(&WrongAnswerRecord) -> bool) -> bool {
    let matching = group.iter().filter(|r| predicate(**r)).count();
    exceeds(matching, group.len(), SUB_PATTERN_SHARE)
}

fn operation_pattern(operation: Operation, group: &[&WrongAnswerRecord]) -> ErrorPattern {
    let mean = mean_misses(group.iter().copied());

    let description = match operation {
        Operation::Add if majority(group, |r| r.operand1 + r.operand2 > 10) => {
            "Carrying is the primary difficulty in addition"
        }
        Operation::Add => "Basic addition needs reinforcement",
        Operation::Sub if majority(group, |r| last_digit(r.operand1) < last_digit(r.operand2)) => {
            "Borrowing is the primary difficulty in subtraction"
        }
        Operation::Sub => "Basic subtraction needs reinforcement",
        Operation::Mul if majority(group, |r| r.operand1 > 5 || r.operand2 > 5) => {
            "Multiplication with larger factors needs more practice"
        }
        Operation::Mul => "Multiplication tables need to be mastered",
        Operation::Div => "Division needs more practice",
    };

    ErrorPattern {
        kind: PatternKind::OperationSpecific,
        operation: Some(operation),
        description: description.to_string(),
        recommendation: operation_recommendation(operation, mean).to_string(),
        severity: Severity::from_mean_misses(mean),
        affected_records: group.len(),
    }
}

fn operation_recommendation(operation: Operation, mean: f64) -> &'static str {
    let struggling = mean > 3.0;
    match (operation, struggling) {
        (Operation::Add, true) => "Revisit the idea of addition and practise the make-ten method",
        (Operation::Add, false) => "Practise more addition with carrying",
        (Operation::Sub, true) => "Revisit the idea of subtraction and practise borrowing step by step",
        (Operation::Sub, false) => "Practise more subtraction with borrowing",
        (Operation::Mul, true) => "Recite the multiplication tables again",
        (Operation::Mul, false) => "Practise more multiplication with larger factors",
        (Operation::Div, true) => "Revisit the idea of division as sharing equally",
        (Operation::Div, false) => "Practise more long division",
    }
}

fn number_range_pattern(records: &[WrongAnswerRecord]) -> Option<ErrorPattern> {
    let large = records
        .iter()
        .filter(|r| r.operand1 > LARGE_OPERAND || r.operand2 > LARGE_OPERAND)
        .count();
    if !exceeds(large, records.len(), LARGE_NUMBER_SHARE) {
        return None;
    }

    Some(ErrorPattern {
        kind: PatternKind::NumberRange,
        operation: None,
        description: "Calculations with large numbers are the main difficulty".to_string(),
        recommendation: "Start with small numbers and widen the range gradually".to_string(),
        severity: Severity::Medium,
        affected_records: large,
    })
}

/// Heuristic for a forgotten carry or borrow. Coincidental mod-10 matches
/// are counted too.
fn is_carry_or_borrow_slip(record: &WrongAnswerRecord) -> bool {
    let gap = record.answer_gap();
    match record.operation {
        Operation::Add => gap == 10 || record.submitted_answer == (record.operand1 + record.operand2) % 10,
        Operation::Sub => gap == 10,
        Operation::Mul | Operation::Div => false,
    }
}

fn calculation_error_pattern(records: &[WrongAnswerRecord]) -> Option<ErrorPattern> {
    let slips = records.iter().filter(|r| is_carry_or_borrow_slip(r)).count();
    if !exceeds(slips, records.len(), CALCULATION_ERROR_SHARE) {
        return None;
    }

    Some(ErrorPattern {
        kind: PatternKind::CalculationError,
        operation: None,
        description: "Carrying and borrowing mistakes happen often".to_string(),
        recommendation: "Focus on how to carry and borrow in column arithmetic".to_string(),
        severity: Severity::High,
        affected_records: slips,
    })
}

/// Largest summed miss count; the first-seen group wins ties
fn most_problematic(groups: &[(Operation, Vec<&WrongAnswerRecord>)]) -> Option<Operation> {
    let mut best: Option<(Operation, u64)> = None;
    for (operation, group) in groups {
        let total: u64 = group.iter().map(|r| u64::from(r.miss_count)).sum();
        if best.map_or(true, |(_, max)| total > max) {
            best = Some((*operation, total));
        }
    }
    best.map(|(operation, _)| operation)
}

fn last_digit(n: i32) -> i32 {
    (n % 10).abs()
}

//! Remediation session builder
//!
//! Turns detected error patterns into a bounded, shuffled drill. Each
//! pattern gets an equal share of the target; any shortfall is padded with
//! problems similar to random entries of the history.

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::analyzer::{AnalysisResult, ErrorPattern, ErrorPatternAnalyzer, PatternKind};
use crate::generator::{Problem, ProblemSynthesizer};
use crate::history::WrongAnswerRecord;
use crate::types::{Difficulty, NumberRange, Operation};

/// Problems per remediation session unless the caller asks otherwise
pub const DEFAULT_TARGET_COUNT: usize = 10;

/// How one pattern is being addressed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub kind: PatternKind,
    pub description: String,
    pub recommendation: String,
    /// Problems this pattern contributed before shuffling and truncation
    pub problem_count: usize,
}

/// A targeted practice session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationSession {
    pub problems: Vec<Problem>,
    pub strategies: Vec<Strategy>,
    pub analysis: AnalysisResult,
    pub focus_areas: Vec<String>,
}

impl RemediationSession {
    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    /// Fewer problems than requested, typically because history is empty
    pub fn is_under_filled(&self, target_count: usize) -> bool {
        self.problems.len() < target_count
    }
}

/// Builds remediation sessions from wrong-answer history
#[derive(Debug, Clone, Copy, Default)]
pub struct RemediationSessionBuilder {
    analyzer: ErrorPatternAnalyzer,
    synthesizer: ProblemSynthesizer,
}

impl RemediationSessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build<R: Rng + ?Sized>(
        &self,
        records: &[WrongAnswerRecord],
        target_count: usize,
        rng: &mut R,
    ) -> RemediationSession {
        let analysis = self.analyzer.analyze(records);
        let mut problems = Vec::with_capacity(target_count);
        let mut strategies = Vec::with_capacity(analysis.patterns.len());

        if !analysis.patterns.is_empty() {
            let per_pattern = target_count / analysis.patterns.len();
            for pattern in &analysis.patterns {
                let generated = self.problems_for_pattern(pattern, per_pattern, rng);
                strategies.push(Strategy {
                    kind: pattern.kind,
                    description: pattern.description.clone(),
                    recommendation: pattern.recommendation.clone(),
                    problem_count: generated.len(),
                });
                problems.extend(generated);
            }
        }

        while problems.len() < target_count {
            let Some(record) = records.choose(rng) else {
                break;
            };
            problems.push(self.synthesizer.generate_similar(&record.as_problem(), rng));
        }

        problems.shuffle(rng);
        problems.truncate(target_count);

        if problems.len() < target_count {
            info!(
                "Remediation session under-filled: {} of {} problems",
                problems.len(),
                target_count
            );
        }
        debug!(
            "Built remediation session with {} problems from {} patterns",
            problems.len(),
            strategies.len()
        );

        let focus_areas = analysis.patterns.iter().map(|p| p.description.clone()).collect();
        RemediationSession {
            problems,
            strategies,
            analysis,
            focus_areas,
        }
    }

    fn problems_for_pattern<R: Rng + ?Sized>(
        &self,
        pattern: &ErrorPattern,
        count: usize,
        rng: &mut R,
    ) -> Vec<Problem> {
        match pattern.kind {
            PatternKind::OperationSpecific | PatternKind::ConceptualError => match pattern.operation {
                Some(operation) => (0..count).map(|_| targeted(operation, rng)).collect(),
                None => Vec::new(),
            },
            PatternKind::NumberRange => self.synthesizer.generate_batch(
                Operation::Add,
                Difficulty::Easy,
                NumberRange::ONE_TO_TEN,
                count,
                rng,
            ),
            PatternKind::CalculationError => (0..count)
                .map(|_| {
                    if rng.random_bool(0.5) {
                        carry_addition(rng)
                    } else {
                        borrow_subtraction(rng)
                    }
                })
                .collect(),
        }
    }
}

/// A deliberately hard instance of `operation`
pub fn targeted<R: Rng + ?Sized>(operation: Operation, rng: &mut R) -> Problem {
    match operation {
        Operation::Add => carry_addition(rng),
        Operation::Sub => borrow_subtraction(rng),
        Operation::Mul => times_table(rng),
        Operation::Div => exact_division(rng),
    }
}

/// Both operands 6-9, so the sum always carries
pub fn carry_addition<R: Rng + ?Sized>(rng: &mut R) -> Problem {
    let a = rng.random_range(6..=9);
    let b = rng.random_range(6..=9);
    Problem::basic(Operation::Add, a, b, Difficulty::Medium)
}

/// A two-digit subtraction whose ones column always needs a borrow
///
/// Minuends span 20-48 but never end in 9 (29, 39 and 49 are skipped):
/// a minuend ending in 9 leaves no larger ones digit for the subtrahend.
pub fn borrow_subtraction<R: Rng + ?Sized>(rng: &mut R) -> Problem {
    let tens = rng.random_range(2..=4);
    let ones = rng.random_range(0..=8);
    let sub_tens = rng.random_range(1..tens);
    let sub_ones = rng.random_range(ones + 1..=9);
    Problem::basic(Operation::Sub, tens * 10 + ones, sub_tens * 10 + sub_ones, Difficulty::Medium)
}

/// Both factors 2-9
pub fn times_table<R: Rng + ?Sized>(rng: &mut R) -> Problem {
    let a = rng.random_range(2..=9);
    let b = rng.random_range(2..=9);
    Problem::basic(Operation::Mul, a, b, Difficulty::Easy)
}

/// Divisor and quotient both 2-9
pub fn exact_division<R: Rng + ?Sized>(rng: &mut R) -> Problem {
    let divisor = rng.random_range(2..=9);
    let quotient = rng.random_range(2..=9);
    Problem::basic(Operation::Div, divisor * quotient, divisor, Difficulty::Easy)
}

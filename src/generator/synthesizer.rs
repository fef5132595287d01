//! Problem synthesizer
//!
//! Every generator takes the random source as an explicit argument, so a
//! seeded `StdRng` gives reproducible batches.

use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::debug;

use super::{GenerateError, Problem, MAX_OPERATORS};
use crate::config::MixedPracticeConfig;
use crate::expression::{CompositeExpression, ExpressionError};
use crate::types::{Difficulty, NumberRange, Operation};

/// Chance that a mixed-batch slot becomes a composite expression
const COMPOSITE_PROBABILITY: f64 = 0.3;

/// Sums at or below this stay "easy" for addition
const EASY_SUM_LIMIT: i32 = 10;

/// Largest divisor a basic division problem uses
const MAX_DIVISOR: i32 = 12;

/// Redraws allowed when a composite overflows `i32`
const MAX_COMPOSITE_ATTEMPTS: usize = 32;

/// Largest quotient similar-problem division keeps
const MAX_SIMILAR_QUOTIENT: i32 = 20;

/// Stateless problem generator
#[derive(Debug, Clone, Copy, Default)]
pub struct ProblemSynthesizer;

impl ProblemSynthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Generate one single-operation problem
    pub fn generate<R: Rng + ?Sized>(
        &self,
        operation: Operation,
        difficulty: Difficulty,
        range: NumberRange,
        rng: &mut R,
    ) -> Problem {
        match operation {
            Operation::Add => self.addition(difficulty, range, rng),
            Operation::Sub => self.subtraction(difficulty, range, rng),
            Operation::Mul => self.multiplication(difficulty, range, rng),
            Operation::Div => self.division(difficulty, range, rng),
        }
    }

    /// Independent repeated calls to [`generate`](Self::generate); duplicates are possible
    pub fn generate_batch<R: Rng + ?Sized>(
        &self,
        operation: Operation,
        difficulty: Difficulty,
        range: NumberRange,
        count: usize,
        rng: &mut R,
    ) -> Vec<Problem> {
        (0..count)
            .map(|_| self.generate(operation, difficulty, range, rng))
            .collect()
    }

    /// Generate `config.question_count` problems across the selected operations
    pub fn generate_mixed_batch<R: Rng + ?Sized>(
        &self,
        config: &MixedPracticeConfig,
        rng: &mut R,
    ) -> Result<Vec<Problem>, GenerateError> {
        config.validate()?;

        let mut problems = Vec::with_capacity(config.question_count);
        for _ in 0..config.question_count {
            if config.allow_complex_expressions && rng.random_bool(COMPOSITE_PROBABILITY) {
                problems.push(self.composite_unchecked(config, rng)?);
            } else {
                let operation = pick_operation(&config.selected_operations, rng)?;
                let range = config.range_for(operation);
                problems.push(self.generate(operation, config.difficulty, range, rng));
            }
        }

        debug!(
            "Generated mixed batch of {} problems ({} composite)",
            problems.len(),
            problems.iter().filter(|p| p.is_composite()).count()
        );
        Ok(problems)
    }

    /// Generate one composite-expression problem
    ///
    /// Draws that overflow `i32` are redrawn; after `MAX_COMPOSITE_ATTEMPTS`
    /// failures the configuration is reported as [`GenerateError::Overflow`].
    pub fn generate_composite<R: Rng + ?Sized>(
        &self,
        config: &MixedPracticeConfig,
        rng: &mut R,
    ) -> Result<Problem, GenerateError> {
        config.validate()?;
        if !config.operator_count_in_bounds() {
            return Err(GenerateError::InvalidOperatorCount(config.max_operators_in_expression));
        }
        self.composite_unchecked(config, rng)
    }

    /// Derive a problem close to `original`, same operation and difficulty
    pub fn generate_similar<R: Rng + ?Sized>(&self, original: &Problem, rng: &mut R) -> Problem {
        let range = NumberRange::for_difficulty(original.difficulty);
        let difficulty = original.difficulty;

        match original.operation {
            Operation::Add => {
                let a = range.clamp(original.operand1 + jitter(3, rng));
                let b = range.clamp(original.operand2 + jitter(3, rng));
                Problem::basic(Operation::Add, a, b, difficulty)
            }
            Operation::Sub => {
                let a = (original.operand1 + jitter(3, rng)).clamp(range.min + 1, range.max);
                let b = (original.operand2 + jitter(3, rng)).clamp(range.min, a);
                Problem::basic(Operation::Sub, a, b, difficulty)
            }
            Operation::Mul => {
                let a = range.clamp(original.operand1 + jitter(2, rng));
                let b = range.clamp(original.operand2 + jitter(2, rng));
                Problem::basic(Operation::Mul, a, b, difficulty)
            }
            Operation::Div => {
                let divisor = (original.operand2 + jitter(2, rng)).clamp(range.min + 1, range.max);
                let quotient = (original.correct_answer + jitter(2, rng)).clamp(1, MAX_SIMILAR_QUOTIENT);
                Problem::basic(Operation::Div, divisor * quotient, divisor, difficulty)
            }
        }
    }

    fn composite_unchecked<R: Rng + ?Sized>(
        &self,
        config: &MixedPracticeConfig,
        rng: &mut R,
    ) -> Result<Problem, GenerateError> {
        for attempt in 1..=MAX_COMPOSITE_ATTEMPTS {
            match self.draw_composite(config, rng) {
                Err(GenerateError::Expression(ExpressionError::Overflow { .. })) => {
                    debug!("Composite draw {} overflowed, redrawing", attempt);
                }
                result => return result,
            }
        }
        Err(GenerateError::Overflow { attempts: MAX_COMPOSITE_ATTEMPTS })
    }

    fn draw_composite<R: Rng + ?Sized>(
        &self,
        config: &MixedPracticeConfig,
        rng: &mut R,
    ) -> Result<Problem, GenerateError> {
        let operator_count = rng.random_range(2..=config.max_operators_in_expression.clamp(2, MAX_OPERATORS));
        let operators = (0..operator_count)
            .map(|_| pick_operation(&config.selected_operations, rng))
            .collect::<Result<Vec<_>, _>>()?;

        // Each operand slot takes the range of the operator at its index;
        // the trailing slot belongs to the last operator.
        let mut operands = Vec::with_capacity(operator_count + 1);
        for index in 0..=operator_count {
            let owner = operators.get(index).or(operators.last()).copied().unwrap_or(Operation::Add);
            let range = config.range_for(owner);
            let divides = index > 0 && operators[index - 1] == Operation::Div;
            let low = if divides { range.min.max(1) } else { range.min };
            operands.push(uniform(low, range.max, rng));
        }

        let expression = CompositeExpression::new(operands, operators)?;
        Ok(Problem::composite(expression, config.difficulty))
    }

    fn addition<R: Rng + ?Sized>(&self, difficulty: Difficulty, range: NumberRange, rng: &mut R) -> Problem {
        let a = uniform(range.min, range.max, rng);
        let b = match difficulty {
            Difficulty::Easy => {
                let cap = EASY_SUM_LIMIT - a;
                if cap >= range.min {
                    uniform(range.min, range.max.min(cap), rng)
                } else {
                    uniform(range.min, range.max, rng)
                }
            }
            Difficulty::Medium | Difficulty::Hard => uniform(range.min, range.max, rng),
        };
        Problem::basic(Operation::Add, a, b, difficulty)
    }

    fn subtraction<R: Rng + ?Sized>(&self, difficulty: Difficulty, range: NumberRange, rng: &mut R) -> Problem {
        let a = uniform((range.min + 1).min(range.max), range.max, rng);
        let b = match difficulty {
            Difficulty::Easy => uniform(range.min, a.min(10), rng),
            Difficulty::Medium | Difficulty::Hard => uniform(range.min, a, rng),
        };
        Problem::basic(Operation::Sub, a, b, difficulty)
    }

    fn multiplication<R: Rng + ?Sized>(&self, difficulty: Difficulty, range: NumberRange, rng: &mut R) -> Problem {
        let max_factor = match difficulty {
            Difficulty::Easy => range.max.min(5),
            Difficulty::Medium => range.max.min(10),
            Difficulty::Hard => range.max,
        };
        let a = uniform(range.min, max_factor, rng);
        let b = uniform(range.min, max_factor, rng);
        Problem::basic(Operation::Mul, a, b, difficulty)
    }

    fn division<R: Rng + ?Sized>(&self, difficulty: Difficulty, range: NumberRange, rng: &mut R) -> Problem {
        let divisor = uniform(range.min + 1, range.max.min(MAX_DIVISOR), rng);
        let quotient = match difficulty {
            Difficulty::Easy => uniform(1, 5, rng),
            Difficulty::Medium => uniform(1, 10, rng),
            Difficulty::Hard => uniform(1, 20, rng),
        };
        Problem::basic(Operation::Div, divisor * quotient, divisor, difficulty)
    }
}

/// Uniform draw from `[low, high]`; an empty band collapses onto `low`
pub(crate) fn uniform<R: Rng + ?Sized>(low: i32, high: i32, rng: &mut R) -> i32 {
    if high <= low {
        low
    } else {
        rng.random_range(low..=high)
    }
}

fn jitter<R: Rng + ?Sized>(variance: i32, rng: &mut R) -> i32 {
    rng.random_range(-variance..=variance)
}

fn pick_operation<R: Rng + ?Sized>(operations: &[Operation], rng: &mut R) -> Result<Operation, GenerateError> {
    operations.choose(rng).copied().ok_or(GenerateError::NoOperations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OperationRanges;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    const DIFFICULTIES: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    #[test]
    fn test_answers_match_operands() {
        let synth = ProblemSynthesizer::new();
        let mut rng = rng();
        for operation in Operation::ALL {
            for difficulty in DIFFICULTIES {
                for problem in synth.generate_batch(operation, difficulty, NumberRange::ONE_TO_FIFTY, 200, &mut rng) {
                    assert_eq!(problem.operation, operation);
                    assert_eq!(problem.difficulty, difficulty);
                    assert_eq!(
                        problem.correct_answer,
                        operation.apply(problem.operand1, problem.operand2),
                        "{}",
                        problem
                    );
                }
            }
        }
    }

    #[test]
    fn test_division_is_exact() {
        let synth = ProblemSynthesizer::new();
        let mut rng = rng();
        for difficulty in DIFFICULTIES {
            for problem in synth.generate_batch(Operation::Div, difficulty, NumberRange::ONE_TO_HUNDRED, 300, &mut rng) {
                assert!(problem.operand2 >= 2 && problem.operand2 <= MAX_DIVISOR);
                assert_eq!(problem.operand1 % problem.operand2, 0);
                assert_eq!(problem.correct_answer, problem.operand1 / problem.operand2);
            }
        }
    }

    #[test]
    fn test_division_quotient_bands() {
        let synth = ProblemSynthesizer::new();
        let mut rng = rng();
        let bands = [(Difficulty::Easy, 5), (Difficulty::Medium, 10), (Difficulty::Hard, 20)];
        for (difficulty, max) in bands {
            for problem in synth.generate_batch(Operation::Div, difficulty, NumberRange::ONE_TO_TEN, 200, &mut rng) {
                assert!((1..=max).contains(&problem.correct_answer));
            }
        }
    }

    #[test]
    fn test_subtraction_never_negative() {
        let synth = ProblemSynthesizer::new();
        let mut rng = rng();
        let ranges = [
            NumberRange::ONE_TO_TEN,
            NumberRange::ONE_TO_HUNDRED,
            NumberRange { min: 0, max: 3 },
            NumberRange { min: 15, max: 40 },
            NumberRange { min: 7, max: 7 },
        ];
        for range in ranges {
            for difficulty in DIFFICULTIES {
                for problem in synth.generate_batch(Operation::Sub, difficulty, range, 200, &mut rng) {
                    assert!(problem.correct_answer >= 0, "{}", problem);
                }
            }
        }
    }

    #[test]
    fn test_easy_subtraction_caps_subtrahend() {
        let synth = ProblemSynthesizer::new();
        let mut rng = rng();
        for problem in synth.generate_batch(Operation::Sub, Difficulty::Easy, NumberRange::ONE_TO_HUNDRED, 300, &mut rng) {
            assert!(problem.operand2 <= 10);
            assert!(problem.operand1 >= 2);
        }
    }

    #[test]
    fn test_easy_addition_stays_within_ten_when_feasible() {
        let synth = ProblemSynthesizer::new();
        let mut rng = rng();
        for problem in synth.generate_batch(Operation::Add, Difficulty::Easy, NumberRange::ONE_TO_TEN, 300, &mut rng) {
            // operand1 = 10 leaves no room for operand2 >= 1, so the full range is used
            if problem.operand1 < 10 {
                assert!(problem.correct_answer <= 10, "{}", problem);
            }
            assert!(NumberRange::ONE_TO_TEN.contains(problem.operand2));
        }
    }

    #[test]
    fn test_multiplication_factor_caps() {
        let synth = ProblemSynthesizer::new();
        let mut rng = rng();
        let caps = [(Difficulty::Easy, 5), (Difficulty::Medium, 10), (Difficulty::Hard, 30)];
        let range = NumberRange { min: 1, max: 30 };
        for (difficulty, cap) in caps {
            for problem in synth.generate_batch(Operation::Mul, difficulty, range, 200, &mut rng) {
                assert!(problem.operand1 <= cap && problem.operand2 <= cap);
                assert!(problem.operand1 >= 1 && problem.operand2 >= 1);
            }
        }
    }

    #[test]
    fn test_degenerate_ranges_do_not_panic() {
        let synth = ProblemSynthesizer::new();
        let mut rng = rng();
        let ranges = [NumberRange { min: 0, max: 0 }, NumberRange { min: 12, max: 12 }, NumberRange { min: 20, max: 25 }];
        for range in ranges {
            for operation in Operation::ALL {
                for difficulty in DIFFICULTIES {
                    let problem = synth.generate(operation, difficulty, range, &mut rng);
                    assert_eq!(problem.correct_answer, operation.apply(problem.operand1, problem.operand2));
                }
            }
        }
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let synth = ProblemSynthesizer::new();
        let a = synth.generate_batch(Operation::Add, Difficulty::Medium, NumberRange::ONE_TO_FIFTY, 20, &mut rng());
        let b = synth.generate_batch(Operation::Add, Difficulty::Medium, NumberRange::ONE_TO_FIFTY, 20, &mut rng());
        assert_eq!(a, b);
    }

    #[test]
    fn test_mixed_batch_uses_selected_operations_and_ranges() {
        let synth = ProblemSynthesizer::new();
        let config = MixedPracticeConfig {
            selected_operations: vec![Operation::Add, Operation::Sub],
            question_count: 50,
            difficulty: Difficulty::Hard,
            ..Default::default()
        };

        let problems = synth.generate_mixed_batch(&config, &mut rng()).unwrap();
        assert_eq!(problems.len(), 50);
        for problem in &problems {
            assert!(!problem.is_composite());
            assert!(matches!(problem.operation, Operation::Add | Operation::Sub));
            assert!(NumberRange::ONE_TO_TWENTY.contains(problem.operand1));
            assert_eq!(problem.difficulty, Difficulty::Hard);
        }
    }

    #[test]
    fn test_mixed_batch_includes_composites_when_allowed() {
        let synth = ProblemSynthesizer::new();
        let config = MixedPracticeConfig {
            question_count: 200,
            allow_complex_expressions: true,
            max_operators_in_expression: 3,
            ..Default::default()
        };

        let problems = synth.generate_mixed_batch(&config, &mut rng()).unwrap();
        let composites: Vec<_> = problems.iter().filter(|p| p.is_composite()).collect();
        assert!(!composites.is_empty());
        assert!(composites.len() < problems.len());
        for problem in composites {
            let expression = problem.composite.as_ref().unwrap();
            assert_eq!(problem.correct_answer, expression.evaluate());
        }
    }

    #[test]
    fn test_mixed_batch_rejects_empty_operations() {
        let synth = ProblemSynthesizer::new();
        let config = MixedPracticeConfig {
            selected_operations: vec![],
            ..Default::default()
        };
        assert_eq!(
            synth.generate_mixed_batch(&config, &mut rng()),
            Err(GenerateError::NoOperations)
        );
    }

    #[test]
    fn test_composite_shape() {
        let synth = ProblemSynthesizer::new();
        let mut rng = rng();
        let config = MixedPracticeConfig {
            selected_operations: vec![Operation::Add, Operation::Mul, Operation::Div],
            max_operators_in_expression: 4,
            operation_ranges: OperationRanges::uniform(NumberRange { min: 0, max: 9 }),
            ..Default::default()
        };

        for _ in 0..300 {
            let problem = synth.generate_composite(&config, &mut rng).unwrap();
            let expression = problem.composite.as_ref().unwrap();
            let count = expression.operators().len();
            assert!((2..=4).contains(&count));
            assert_eq!(expression.operands().len(), count + 1);
            assert!(expression.operands().iter().all(|n| (0..=9).contains(n)));
            assert_eq!(problem.correct_answer, expression.evaluate());

            let text = problem.expression_text.as_deref().unwrap();
            assert!(text.ends_with(" = ?"));
            assert_eq!(text, format!("{} = ?", expression.render()));
        }
    }

    #[test]
    fn test_composite_operands_follow_owning_operator_range() {
        let synth = ProblemSynthesizer::new();
        let config = MixedPracticeConfig {
            selected_operations: vec![Operation::Mul],
            operation_ranges: OperationRanges {
                mul: Some(NumberRange { min: 3, max: 4 }),
                ..Default::default()
            },
            max_operators_in_expression: 2,
            ..Default::default()
        };
        let problem = synth.generate_composite(&config, &mut rng()).unwrap();
        let expression = problem.composite.unwrap();
        assert!(expression.operands().iter().all(|n| (3..=4).contains(n)));
    }

    #[test]
    fn test_composite_rejects_single_operator_limit() {
        let synth = ProblemSynthesizer::new();
        let config = MixedPracticeConfig {
            max_operators_in_expression: 1,
            ..Default::default()
        };
        assert_eq!(
            synth.generate_composite(&config, &mut rng()),
            Err(GenerateError::InvalidOperatorCount(1))
        );
    }

    #[test]
    fn test_composite_rejects_operator_limit_above_max() {
        let synth = ProblemSynthesizer::new();
        let config = MixedPracticeConfig {
            selected_operations: vec![Operation::Mul],
            operation_ranges: OperationRanges::uniform(NumberRange::ONE_TO_HUNDRED),
            max_operators_in_expression: MAX_OPERATORS + 1,
            ..Default::default()
        };
        assert_eq!(
            synth.generate_composite(&config, &mut rng()),
            Err(GenerateError::InvalidOperatorCount(MAX_OPERATORS + 1))
        );
    }

    #[test]
    fn test_composite_products_never_overflow() {
        let synth = ProblemSynthesizer::new();
        let mut rng = rng();
        let config = MixedPracticeConfig {
            selected_operations: vec![Operation::Mul],
            operation_ranges: OperationRanges::uniform(NumberRange::ONE_TO_HUNDRED),
            max_operators_in_expression: MAX_OPERATORS,
            ..Default::default()
        };

        for _ in 0..200 {
            match synth.generate_composite(&config, &mut rng) {
                Ok(problem) => {
                    let expression = problem.composite.as_ref().unwrap();
                    let product = expression
                        .operands()
                        .iter()
                        .try_fold(1i32, |acc, &n| acc.checked_mul(n))
                        .unwrap();
                    assert_eq!(problem.correct_answer, product);
                }
                Err(err) => assert_eq!(err, GenerateError::Overflow { attempts: MAX_COMPOSITE_ATTEMPTS }),
            }
        }
    }

    #[test]
    fn test_composite_reports_unrepresentable_config() {
        let synth = ProblemSynthesizer::new();
        let config = MixedPracticeConfig {
            selected_operations: vec![Operation::Mul],
            operation_ranges: OperationRanges::uniform(NumberRange { min: 5_000, max: NumberRange::MAX_BOUND }),
            max_operators_in_expression: 3,
            ..Default::default()
        };
        assert_eq!(
            synth.generate_composite(&config, &mut rng()),
            Err(GenerateError::Overflow { attempts: MAX_COMPOSITE_ATTEMPTS })
        );
    }

    #[test]
    fn test_largest_range_generates_without_overflow() {
        let synth = ProblemSynthesizer::new();
        let mut rng = rng();
        let range = NumberRange::new(1, NumberRange::MAX_BOUND).unwrap();
        for operation in Operation::ALL {
            for problem in synth.generate_batch(operation, Difficulty::Hard, range, 200, &mut rng) {
                assert_eq!(
                    Some(problem.correct_answer),
                    operation.checked_apply(problem.operand1, problem.operand2)
                );
            }
        }
    }

    #[test]
    fn test_similar_keeps_operation_and_difficulty() {
        let synth = ProblemSynthesizer::new();
        let mut rng = rng();
        let originals = [
            Problem::basic(Operation::Add, 8, 7, Difficulty::Easy),
            Problem::basic(Operation::Sub, 42, 17, Difficulty::Medium),
            Problem::basic(Operation::Mul, 9, 8, Difficulty::Hard),
            Problem::basic(Operation::Div, 56, 8, Difficulty::Medium),
            Problem::basic(Operation::Sub, 3, 3, Difficulty::Easy),
        ];

        for original in &originals {
            for _ in 0..100 {
                let similar = synth.generate_similar(original, &mut rng);
                assert_eq!(similar.operation, original.operation);
                assert_eq!(similar.difficulty, original.difficulty);
                assert_eq!(similar.correct_answer, similar.operation.apply(similar.operand1, similar.operand2));
            }
        }
    }

    #[test]
    fn test_similar_stays_close_and_in_range() {
        let synth = ProblemSynthesizer::new();
        let mut rng = rng();
        let original = Problem::basic(Operation::Add, 8, 7, Difficulty::Easy);
        for _ in 0..200 {
            let similar = synth.generate_similar(&original, &mut rng);
            assert!((similar.operand1 - 8).abs() <= 3);
            assert!((similar.operand2 - 7).abs() <= 3);
            assert!(NumberRange::ONE_TO_TEN.contains(similar.operand1));
            assert!(NumberRange::ONE_TO_TEN.contains(similar.operand2));
        }
    }

    #[test]
    fn test_similar_subtraction_and_division_invariants() {
        let synth = ProblemSynthesizer::new();
        let mut rng = rng();
        let sub = Problem::basic(Operation::Sub, 5, 5, Difficulty::Easy);
        let div = Problem::basic(Operation::Div, 20, 1, Difficulty::Hard);
        for _ in 0..200 {
            let similar = synth.generate_similar(&sub, &mut rng);
            assert!(similar.operand2 <= similar.operand1);
            assert!(similar.correct_answer >= 0);

            let similar = synth.generate_similar(&div, &mut rng);
            assert!(similar.operand2 >= 2);
            assert_eq!(similar.operand1 % similar.operand2, 0);
            assert!((1..=MAX_SIMILAR_QUOTIENT).contains(&similar.correct_answer));
        }
    }
}

//! math-trainer - Adaptive Arithmetic Practice Library
//!
//! An arithmetic practice engine with:
//! - Problem synthesis under range and difficulty constraints
//! - Precedence-aware evaluation of composite expressions
//! - Error-pattern analysis over wrong-answer history
//! - Remediation sessions targeted at detected patterns
//! - SQLite-backed practice history
//!
//! # Example
//!
//! ```
//! use math_trainer::{Difficulty, NumberRange, Operation, ProblemSynthesizer};
//! use rand::SeedableRng;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(1);
//! let problem = ProblemSynthesizer::new().generate(
//!     Operation::Div,
//!     Difficulty::Medium,
//!     NumberRange::ONE_TO_FIFTY,
//!     &mut rng,
//! );
//! assert_eq!(problem.operand1 % problem.operand2, 0);
//! ```

// Core modules (order matters for cross-module dependencies)
pub mod types;
pub mod expression;
pub mod generator;
pub mod history;
pub mod remediation;
pub mod config;
pub mod cli;

// Re-export commonly used types for convenience
pub use types::{Difficulty, NumberRange, Operation};

pub use expression::{CompositeExpression, ExpressionError};

pub use generator::{GenerateError, Problem, ProblemSynthesizer, SolutionStep};

pub use history::{
    HistoryStore,
    OperationStats,
    PracticeOutcome,
    SqliteHistoryStore,
    WrongAnswerRecord,
    WrongAnswerStats,
};

pub use remediation::{
    AnalysisResult,
    ErrorPattern,
    ErrorPatternAnalyzer,
    RemediationSession,
    RemediationSessionBuilder,
};

pub use config::{Config, MixedPracticeConfig, PracticeSettings, SettingsProvider};

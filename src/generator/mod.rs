//! Problem generation
//!
//! Builds practice problems under numeric-range and difficulty constraints:
//! - single-operation problems and batches
//! - mixed batches, optionally with composite expressions
//! - "similar" problems derived from a missed one
//! - templated worked solutions

pub mod problem;
pub mod steps;
pub mod synthesizer;

pub use problem::Problem;
pub use steps::SolutionStep;
pub use synthesizer::ProblemSynthesizer;

use thiserror::Error;

use crate::expression::ExpressionError;
use crate::types::{Operation, RangeError};

/// Most operators a composite expression may carry
pub const MAX_OPERATORS: usize = 5;

/// Configurations generation refuses to sample from
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("no operations selected to generate problems from")]
    NoOperations,
    #[error("composite expressions allow 2 to {max} operators, configured {0}", max = MAX_OPERATORS)]
    InvalidOperatorCount(usize),
    #[error("no composite within i32 after {attempts} draws; narrow the ranges or operator count")]
    Overflow { attempts: usize },
    #[error("invalid range for {operation}: {source}")]
    InvalidRange {
        operation: Operation,
        #[source]
        source: RangeError,
    },
    #[error("generated expression was malformed: {0}")]
    Expression(#[from] ExpressionError),
}

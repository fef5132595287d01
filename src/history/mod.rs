//! Practice history
//!
//! Wrong-answer records and practice outcomes, persisted in SQLite.
//! The analyzer and the remediation builder only ever read
//! [`WrongAnswerRecord`]s; the drill loop writes [`PracticeOutcome`]s.

pub mod sqlite;

pub use sqlite::SqliteHistoryStore;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::generator::Problem;
use crate::types::{Difficulty, Operation};

/// A problem the learner answered incorrectly, possibly more than once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrongAnswerRecord {
    pub id: i64,
    pub operation: Operation,
    pub operand1: i32,
    pub operand2: i32,
    pub correct_answer: i32,
    pub submitted_answer: i32,
    pub difficulty: Difficulty,
    pub miss_count: u32,
    pub last_missed_at: DateTime<Utc>,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl WrongAnswerRecord {
    /// A fresh, unsaved record for a single miss
    pub fn new(problem: &Problem, submitted_answer: i32) -> Self {
        Self {
            id: 0,
            operation: problem.operation,
            operand1: problem.operand1,
            operand2: problem.operand2,
            correct_answer: problem.correct_answer,
            submitted_answer,
            difficulty: problem.difficulty,
            miss_count: 1,
            last_missed_at: Utc::now(),
            resolved: false,
            resolved_at: None,
        }
    }

    /// The problem this record was collected from
    pub fn as_problem(&self) -> Problem {
        Problem {
            operand1: self.operand1,
            operand2: self.operand2,
            operation: self.operation,
            correct_answer: self.correct_answer,
            difficulty: self.difficulty,
            composite: None,
            expression_text: None,
        }
    }

    /// Absolute distance between the submitted and the correct answer
    pub fn answer_gap(&self) -> i32 {
        (self.submitted_answer - self.correct_answer).abs()
    }
}

/// One answered (or skipped) practice problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeOutcome {
    pub problem: Problem,
    /// `None` when the learner skipped the problem
    pub submitted_answer: Option<i32>,
    pub correct: bool,
    pub elapsed_ms: u64,
    pub answered_at: DateTime<Utc>,
}

impl PracticeOutcome {
    /// Grade `submitted_answer` against `problem`
    pub fn grade(problem: Problem, submitted_answer: Option<i32>, elapsed_ms: u64) -> Self {
        let correct = submitted_answer.is_some_and(|answer| problem.check_answer(answer));
        Self {
            problem,
            submitted_answer,
            correct,
            elapsed_ms,
            answered_at: Utc::now(),
        }
    }
}

/// Aggregate view of the wrong-answer table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WrongAnswerStats {
    pub total: usize,
    pub resolved: usize,
    pub unresolved: usize,
    /// Operation with the most unresolved records
    pub weakest_operation: Option<Operation>,
    pub average_miss_count: f64,
}

/// Counts over the practice-record table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeSummary {
    pub total: usize,
    pub correct: usize,
    pub wrong: usize,
}

impl PracticeSummary {
    /// Share of correct answers in percent; 0 with no practice yet
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 * 100.0 / self.total as f64
        }
    }
}

/// Practice counts and pace for one operation; composite records are excluded
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperationStats {
    pub operation: Operation,
    pub total: usize,
    pub correct: usize,
    /// Mean answer time in milliseconds; 0 with no practice yet
    pub average_elapsed_ms: f64,
}

impl OperationStats {
    pub fn accuracy(&self) -> f64 {
        PracticeSummary {
            total: self.total,
            correct: self.correct,
            wrong: self.total - self.correct,
        }
        .accuracy()
    }
}

/// Where wrong answers come from and practice outcomes go
pub trait HistoryStore {
    /// Unresolved wrong answers, most-missed first
    fn wrong_answers(&self) -> Result<Vec<WrongAnswerRecord>>;

    /// Persist one practice outcome, collecting it as a wrong answer if needed
    fn record_outcome(&self, outcome: &PracticeOutcome) -> Result<()>;
}

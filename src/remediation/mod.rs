//! Error-pattern analysis and remediation
//!
//! Classifies a learner's wrong-answer history into named patterns and
//! builds targeted practice sessions from them.

pub mod analyzer;
pub mod builder;

pub use analyzer::{AnalysisResult, ErrorPattern, ErrorPatternAnalyzer, PatternKind, Severity};
pub use builder::{RemediationSession, RemediationSessionBuilder, Strategy, DEFAULT_TARGET_COUNT};

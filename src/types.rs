//! Shared types used across modules
//!
//! Operation kinds, difficulty tiers and numeric ranges are used by the
//! generator, the analyzer, the history store and the config layer alike.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An arithmetic operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Sub,
    Mul,
    Div,
}

/// Precedence class of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precedence {
    /// `×` and `÷`
    Multiplicative,
    /// `+` and `-`
    Additive,
}

impl Operation {
    /// All operation kinds, in display order
    pub const ALL: [Operation; 4] = [Operation::Add, Operation::Sub, Operation::Mul, Operation::Div];

    /// Symbol used when rendering problems
    pub fn symbol(&self) -> &'static str {
        match self {
            Operation::Add => "+",
            Operation::Sub => "-",
            Operation::Mul => "×",
            Operation::Div => "÷",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            Operation::Add => "addition",
            Operation::Sub => "subtraction",
            Operation::Mul => "multiplication",
            Operation::Div => "division",
        }
    }

    pub fn precedence(&self) -> Precedence {
        match self {
            Operation::Mul | Operation::Div => Precedence::Multiplicative,
            Operation::Add | Operation::Sub => Precedence::Additive,
        }
    }

    /// Apply the operation. Division truncates toward zero.
    ///
    /// Callers guarantee a non-zero divisor and operands inside
    /// [`NumberRange::MAX_BOUND`]; use [`checked_apply`](Self::checked_apply)
    /// for anything else.
    pub fn apply(&self, lhs: i32, rhs: i32) -> i32 {
        match self {
            Operation::Add => lhs + rhs,
            Operation::Sub => lhs - rhs,
            Operation::Mul => lhs * rhs,
            Operation::Div => lhs / rhs,
        }
    }

    /// Apply the operation, or `None` on overflow or a zero divisor
    pub fn checked_apply(&self, lhs: i32, rhs: i32) -> Option<i32> {
        match self {
            Operation::Add => lhs.checked_add(rhs),
            Operation::Sub => lhs.checked_sub(rhs),
            Operation::Mul => lhs.checked_mul(rhs),
            Operation::Div => lhs.checked_div(rhs),
        }
    }

    /// Parse from a name or symbol (`add`, `+`, `plus`, ...)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "add" | "addition" | "plus" | "+" => Some(Operation::Add),
            "sub" | "subtraction" | "minus" | "-" => Some(Operation::Sub),
            "mul" | "multiplication" | "times" | "x" | "*" | "×" => Some(Operation::Mul),
            "div" | "division" | "/" | "÷" => Some(Operation::Div),
            _ => None,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Difficulty tier of a problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" | "1" => Some(Difficulty::Easy),
            "medium" | "2" => Some(Difficulty::Medium),
            "hard" | "3" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

/// Rejected [`NumberRange`] bounds
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("range minimum {0} is negative")]
    NegativeMin(i32),
    #[error("range minimum {min} exceeds maximum {max}")]
    Inverted { min: i32, max: i32 },
    #[error("range maximum {0} exceeds the limit of {limit}", limit = NumberRange::MAX_BOUND)]
    TooLarge(i32),
}

/// Inclusive numeric range `[min, max]` with `0 <= min <= max <= MAX_BOUND`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberRange {
    pub min: i32,
    pub max: i32,
}

impl NumberRange {
    pub const ONE_TO_TEN: NumberRange = NumberRange { min: 1, max: 10 };
    pub const ONE_TO_TWENTY: NumberRange = NumberRange { min: 1, max: 20 };
    pub const ONE_TO_FIFTY: NumberRange = NumberRange { min: 1, max: 50 };
    pub const ONE_TO_HUNDRED: NumberRange = NumberRange { min: 1, max: 100 };

    /// Largest allowed bound; keeps every basic product and sum inside `i32`
    pub const MAX_BOUND: i32 = 10_000;

    /// Create a validated range
    pub fn new(min: i32, max: i32) -> Result<Self, RangeError> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    /// Check the range invariant; ranges deserialized from config go through here
    pub fn validate(&self) -> Result<(), RangeError> {
        if self.min < 0 {
            return Err(RangeError::NegativeMin(self.min));
        }
        if self.min > self.max {
            return Err(RangeError::Inverted { min: self.min, max: self.max });
        }
        if self.max > Self::MAX_BOUND {
            return Err(RangeError::TooLarge(self.max));
        }
        Ok(())
    }

    pub fn contains(&self, n: i32) -> bool {
        (self.min..=self.max).contains(&n)
    }

    /// Clamp a value into the range
    pub fn clamp(&self, n: i32) -> i32 {
        n.clamp(self.min, self.max)
    }

    /// The range used for similar-problem derivation at a difficulty tier
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => Self::ONE_TO_TEN,
            Difficulty::Medium => Self::ONE_TO_FIFTY,
            Difficulty::Hard => Self::ONE_TO_HUNDRED,
        }
    }

    /// The predefined ranges offered by the settings layer
    pub fn predefined() -> [NumberRange; 4] {
        [Self::ONE_TO_TEN, Self::ONE_TO_TWENTY, Self::ONE_TO_FIFTY, Self::ONE_TO_HUNDRED]
    }
}

impl Default for NumberRange {
    fn default() -> Self {
        Self::ONE_TO_TEN
    }
}

impl std::fmt::Display for NumberRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_apply() {
        assert_eq!(Operation::Add.apply(7, 5), 12);
        assert_eq!(Operation::Sub.apply(7, 5), 2);
        assert_eq!(Operation::Mul.apply(7, 5), 35);
        assert_eq!(Operation::Div.apply(7, 2), 3);
    }

    #[test]
    fn test_operation_checked_apply() {
        assert_eq!(Operation::Mul.checked_apply(7, 5), Some(35));
        assert_eq!(Operation::Mul.checked_apply(100_000, 100_000), None);
        assert_eq!(Operation::Add.checked_apply(i32::MAX, 1), None);
        assert_eq!(Operation::Sub.checked_apply(i32::MIN, 1), None);
        assert_eq!(Operation::Div.checked_apply(7, 0), None);
        assert_eq!(Operation::Div.checked_apply(-7, 2), Some(-3));
    }

    #[test]
    fn test_operation_parse() {
        assert_eq!(Operation::parse("add"), Some(Operation::Add));
        assert_eq!(Operation::parse("×"), Some(Operation::Mul));
        assert_eq!(Operation::parse(" Division "), Some(Operation::Div));
        assert_eq!(Operation::parse("modulo"), None);
    }

    #[test]
    fn test_precedence() {
        assert_eq!(Operation::Mul.precedence(), Precedence::Multiplicative);
        assert_eq!(Operation::Div.precedence(), Precedence::Multiplicative);
        assert_eq!(Operation::Sub.precedence(), Precedence::Additive);
    }

    #[test]
    fn test_number_range_validation() {
        assert!(NumberRange::new(1, 10).is_ok());
        assert!(NumberRange::new(5, 5).is_ok());
        assert_eq!(NumberRange::new(-1, 10), Err(RangeError::NegativeMin(-1)));
        assert_eq!(NumberRange::new(10, 1), Err(RangeError::Inverted { min: 10, max: 1 }));
        assert!(NumberRange::new(1, NumberRange::MAX_BOUND).is_ok());
        assert_eq!(NumberRange::new(1, 100_000), Err(RangeError::TooLarge(100_000)));
    }

    #[test]
    fn test_number_range_display_and_contains() {
        let range = NumberRange::ONE_TO_TWENTY;
        assert_eq!(range.to_string(), "1-20");
        assert!(range.contains(1));
        assert!(range.contains(20));
        assert!(!range.contains(21));
        assert_eq!(range.clamp(25), 20);
    }

    #[test]
    fn test_difficulty_ordering() {
        assert!(Difficulty::Easy < Difficulty::Medium);
        assert!(Difficulty::Medium < Difficulty::Hard);
        assert_eq!(Difficulty::parse("3"), Some(Difficulty::Hard));
    }
}

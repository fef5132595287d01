//! Configuration management
//!
//! Practice settings, mixed-practice configuration and storage location,
//! persisted as TOML in the platform config directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::generator::{GenerateError, MAX_OPERATORS};
use crate::types::{Difficulty, NumberRange, Operation};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Ordinary single-operation practice
    #[serde(default)]
    pub practice: PracticeSettings,
    /// Mixed practice
    #[serde(default)]
    pub mixed: MixedPracticeConfig,
    /// History database location
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Supplies the configuration a practice batch is generated from
pub trait SettingsProvider {
    fn practice_settings(&self) -> PracticeSettings;
    fn mixed_practice_config(&self) -> MixedPracticeConfig;
}

impl SettingsProvider for Config {
    fn practice_settings(&self) -> PracticeSettings {
        self.practice.clone()
    }

    fn mixed_practice_config(&self) -> MixedPracticeConfig {
        self.mixed.clone()
    }
}

/// Per-operation number ranges. A missing entry falls back to 1-10.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add: Option<NumberRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<NumberRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mul: Option<NumberRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub div: Option<NumberRange>,
}

impl OperationRanges {
    /// The same range for every operation
    pub fn uniform(range: NumberRange) -> Self {
        Self {
            add: Some(range),
            sub: Some(range),
            mul: Some(range),
            div: Some(range),
        }
    }

    pub fn get(&self, operation: Operation) -> Option<NumberRange> {
        match operation {
            Operation::Add => self.add,
            Operation::Sub => self.sub,
            Operation::Mul => self.mul,
            Operation::Div => self.div,
        }
    }

    /// Configured range, or 1-10 when absent
    pub fn range_for(&self, operation: Operation) -> NumberRange {
        self.get(operation).unwrap_or(NumberRange::ONE_TO_TEN)
    }

    pub fn set(&mut self, operation: Operation, range: NumberRange) {
        let slot = match operation {
            Operation::Add => &mut self.add,
            Operation::Sub => &mut self.sub,
            Operation::Mul => &mut self.mul,
            Operation::Div => &mut self.div,
        };
        *slot = Some(range);
    }

    fn validate(&self) -> Result<(), GenerateError> {
        for operation in Operation::ALL {
            if let Some(range) = self.get(operation) {
                range
                    .validate()
                    .map_err(|source| GenerateError::InvalidRange { operation, source })?;
            }
        }
        Ok(())
    }
}

/// Settings for ordinary single-operation practice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeSettings {
    #[serde(default = "default_practice_difficulty")]
    pub default_difficulty: Difficulty,
    #[serde(default = "default_practice_ranges")]
    pub ranges: OperationRanges,
    #[serde(default = "default_enabled_operations")]
    pub enabled_operations: Vec<Operation>,
    #[serde(default = "default_questions_per_session")]
    pub questions_per_session: usize,
    /// Show a worked solution after a wrong answer
    #[serde(default = "default_true")]
    pub show_step_by_step: bool,
    /// Record wrong answers into the history store
    #[serde(default = "default_true")]
    pub auto_collect_wrong_answers: bool,
}

fn default_practice_difficulty() -> Difficulty {
    Difficulty::Easy
}

fn default_practice_ranges() -> OperationRanges {
    OperationRanges::uniform(NumberRange::ONE_TO_TEN)
}

fn default_enabled_operations() -> Vec<Operation> {
    vec![Operation::Add]
}

fn default_questions_per_session() -> usize {
    10
}

fn default_true() -> bool {
    true
}

impl Default for PracticeSettings {
    fn default() -> Self {
        Self {
            default_difficulty: default_practice_difficulty(),
            ranges: default_practice_ranges(),
            enabled_operations: default_enabled_operations(),
            questions_per_session: default_questions_per_session(),
            show_step_by_step: true,
            auto_collect_wrong_answers: true,
        }
    }
}

impl PracticeSettings {
    pub fn validate(&self) -> Result<(), GenerateError> {
        if self.enabled_operations.is_empty() {
            return Err(GenerateError::NoOperations);
        }
        self.ranges.validate()
    }
}

/// Configuration for a mixed practice batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixedPracticeConfig {
    #[serde(default = "default_selected_operations")]
    pub selected_operations: Vec<Operation>,
    #[serde(default = "default_mixed_ranges")]
    pub operation_ranges: OperationRanges,
    #[serde(default = "default_question_count")]
    pub question_count: usize,
    #[serde(default = "default_mixed_difficulty")]
    pub difficulty: Difficulty,
    /// Allow multi-operator expressions such as `2 + 3 × 4`
    #[serde(default)]
    pub allow_complex_expressions: bool,
    #[serde(default = "default_max_operators")]
    pub max_operators_in_expression: usize,
}

fn default_selected_operations() -> Vec<Operation> {
    Operation::ALL.to_vec()
}

fn default_mixed_ranges() -> OperationRanges {
    OperationRanges {
        add: Some(NumberRange::ONE_TO_TWENTY),
        sub: Some(NumberRange::ONE_TO_TWENTY),
        mul: Some(NumberRange::ONE_TO_TEN),
        div: Some(NumberRange::ONE_TO_TEN),
    }
}

fn default_question_count() -> usize {
    20
}

fn default_mixed_difficulty() -> Difficulty {
    Difficulty::Medium
}

fn default_max_operators() -> usize {
    2
}

impl Default for MixedPracticeConfig {
    fn default() -> Self {
        Self {
            selected_operations: default_selected_operations(),
            operation_ranges: default_mixed_ranges(),
            question_count: default_question_count(),
            difficulty: default_mixed_difficulty(),
            allow_complex_expressions: false,
            max_operators_in_expression: default_max_operators(),
        }
    }
}

impl MixedPracticeConfig {
    pub fn range_for(&self, operation: Operation) -> NumberRange {
        self.operation_ranges.range_for(operation)
    }

    /// Whether `max_operators_in_expression` is within `2..=MAX_OPERATORS`
    pub fn operator_count_in_bounds(&self) -> bool {
        (2..=MAX_OPERATORS).contains(&self.max_operators_in_expression)
    }

    /// Check the preconditions batch generation relies on
    pub fn validate(&self) -> Result<(), GenerateError> {
        if self.selected_operations.is_empty() {
            return Err(GenerateError::NoOperations);
        }
        if self.allow_complex_expressions && !self.operator_count_in_bounds() {
            return Err(GenerateError::InvalidOperatorCount(self.max_operators_in_expression));
        }
        self.operation_ranges.validate()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite history database; defaults to `<data_dir>/history.db`
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolve_database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("history.db")),
        }
    }
}

impl Config {
    /// Load from a specific file, writing defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.practice.validate().context("Invalid [practice] settings")?;
        self.mixed.validate().context("Invalid [mixed] settings")?;
        Ok(())
    }
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "math-trainer", "math-trainer")
        .context("Failed to get project directories")?;
    Ok(base.config_dir().join("config.toml"))
}

/// Get the data directory path
pub fn data_dir() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "math-trainer", "math-trainer")
        .context("Failed to get project directories")?;
    Ok(base.data_dir().to_path_buf())
}

/// Reset configuration at `path` to defaults
pub fn reset_config(path: &Path) -> Result<()> {
    Config::default().save_to(path)?;
    println!("Configuration reset to defaults.");
    Ok(())
}

/// Get default configuration as TOML string
pub fn default_config_toml() -> String {
    let config = Config::default();
    toml::to_string_pretty(&config).unwrap_or_else(|_| "# Default configuration\n".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RangeError;

    #[test]
    fn test_mixed_defaults() {
        let config = MixedPracticeConfig::default();
        assert_eq!(config.selected_operations.len(), 4);
        assert_eq!(config.question_count, 20);
        assert_eq!(config.difficulty, Difficulty::Medium);
        assert!(!config.allow_complex_expressions);
        assert_eq!(config.max_operators_in_expression, 2);
        assert_eq!(config.range_for(Operation::Add), NumberRange::ONE_TO_TWENTY);
        assert_eq!(config.range_for(Operation::Div), NumberRange::ONE_TO_TEN);
    }

    #[test]
    fn test_practice_defaults() {
        let settings = PracticeSettings::default();
        assert_eq!(settings.default_difficulty, Difficulty::Easy);
        assert_eq!(settings.enabled_operations, vec![Operation::Add]);
        assert_eq!(settings.questions_per_session, 10);
        assert!(settings.show_step_by_step);
    }

    #[test]
    fn test_missing_range_defaults_to_one_to_ten() {
        let ranges = OperationRanges {
            add: Some(NumberRange::ONE_TO_FIFTY),
            ..Default::default()
        };
        assert_eq!(ranges.range_for(Operation::Add), NumberRange::ONE_TO_FIFTY);
        assert_eq!(ranges.range_for(Operation::Mul), NumberRange::ONE_TO_TEN);
    }

    #[test]
    fn test_validation() {
        let mut config = MixedPracticeConfig::default();
        assert!(config.validate().is_ok());

        config.selected_operations.clear();
        assert!(matches!(config.validate(), Err(GenerateError::NoOperations)));

        let mut config = MixedPracticeConfig {
            allow_complex_expressions: true,
            max_operators_in_expression: 1,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(GenerateError::InvalidOperatorCount(1))));

        config.max_operators_in_expression = MAX_OPERATORS + 1;
        assert!(matches!(config.validate(), Err(GenerateError::InvalidOperatorCount(6))));

        config.max_operators_in_expression = 3;
        config.operation_ranges.mul = Some(NumberRange { min: 1, max: 100_000 });
        assert!(matches!(
            config.validate(),
            Err(GenerateError::InvalidRange { operation: Operation::Mul, source: RangeError::TooLarge(100_000) })
        ));

        config.operation_ranges.mul = None;
        config.operation_ranges.sub = Some(NumberRange { min: 9, max: 2 });
        assert!(matches!(
            config.validate(),
            Err(GenerateError::InvalidRange { operation: Operation::Sub, .. })
        ));
    }

    #[test]
    fn test_toml_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        // First load writes defaults
        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config, Config::default());

        let mut changed = config.clone();
        changed.practice.default_difficulty = Difficulty::Hard;
        changed.mixed.allow_complex_expressions = true;
        changed.practice.ranges.set(Operation::Mul, NumberRange::ONE_TO_HUNDRED);
        changed.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded, changed);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [mixed]
            selected_operations = ["add", "mul"]
            allow_complex_expressions = true

            [mixed.operation_ranges]
            add = { min = 5, max = 50 }
            "#,
        )
        .unwrap();

        assert_eq!(config.mixed.selected_operations, vec![Operation::Add, Operation::Mul]);
        assert_eq!(config.mixed.range_for(Operation::Add), NumberRange { min: 5, max: 50 });
        assert_eq!(config.mixed.range_for(Operation::Mul), NumberRange::ONE_TO_TEN);
        assert_eq!(config.mixed.question_count, 20);
        assert_eq!(config.practice, PracticeSettings::default());
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[practice]\nenabled_operations = []\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_default_config_toml_parses() {
        let text = default_config_toml();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, Config::default());
    }
}

//! SQLite-backed practice history

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use super::{
    HistoryStore, OperationStats, PracticeOutcome, PracticeSummary, WrongAnswerRecord, WrongAnswerStats,
};
use crate::types::{Difficulty, Operation};

const RECORD_COLUMNS: &str = "id, operation, operand1, operand2, correct_answer, submitted_answer,
     difficulty, miss_count, last_missed_at, resolved, resolved_at";

/// Wrong answers and practice records in a single SQLite database
pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
    collect_wrong_answers: bool,
}

impl SqliteHistoryStore {
    /// Open (or create) the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open history database {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::init_schema(&conn)?;

        info!("Opened history database at {}", path.display());
        Ok(Self::from_connection(conn))
    }

    /// A throwaway database that lives as long as the store
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            collect_wrong_answers: true,
        }
    }

    /// Whether wrong answers recorded through [`HistoryStore::record_outcome`]
    /// are collected into the wrong-answer table
    pub fn set_collect_wrong_answers(&mut self, collect: bool) {
        self.collect_wrong_answers = collect;
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS wrong_answers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                operation TEXT NOT NULL,
                operand1 INTEGER NOT NULL,
                operand2 INTEGER NOT NULL,
                correct_answer INTEGER NOT NULL,
                submitted_answer INTEGER NOT NULL,
                difficulty TEXT NOT NULL,
                miss_count INTEGER NOT NULL DEFAULT 1,
                last_missed_at TEXT NOT NULL,
                resolved INTEGER NOT NULL DEFAULT 0,
                resolved_at TEXT,
                UNIQUE (operation, operand1, operand2)
            );

            CREATE TABLE IF NOT EXISTS practice_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                operation TEXT NOT NULL,
                operand1 INTEGER NOT NULL,
                operand2 INTEGER NOT NULL,
                expression_text TEXT,
                correct_answer INTEGER NOT NULL,
                submitted_answer INTEGER,
                correct INTEGER NOT NULL,
                difficulty TEXT NOT NULL,
                elapsed_ms INTEGER NOT NULL,
                answered_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_wrong_answers_resolved ON wrong_answers(resolved, miss_count DESC);
            CREATE INDEX IF NOT EXISTS idx_practice_records_answered ON practice_records(answered_at DESC);
        "#)?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("history database lock poisoned"))
    }

    /// Unresolved wrong answers, most missed first, then most recent
    pub fn unresolved(&self) -> Result<Vec<WrongAnswerRecord>> {
        self.query_records("WHERE resolved = 0")
    }

    /// Resolved wrong answers, most missed first, then most recent
    pub fn resolved(&self) -> Result<Vec<WrongAnswerRecord>> {
        self.query_records("WHERE resolved = 1")
    }

    /// Every wrong-answer record regardless of status
    pub fn all_wrong_answers(&self) -> Result<Vec<WrongAnswerRecord>> {
        self.query_records("")
    }

    fn query_records(&self, filter: &str) -> Result<Vec<WrongAnswerRecord>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM wrong_answers {filter}
             ORDER BY miss_count DESC, last_missed_at DESC, id DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map([], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Look up a single wrong-answer record
    pub fn get(&self, id: i64) -> Result<Option<WrongAnswerRecord>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {RECORD_COLUMNS} FROM wrong_answers WHERE id = ?1");
        let record = conn.query_row(&sql, params![id], row_to_record).optional()?;
        Ok(record)
    }

    /// Mark a record as resolved. Returns false if no such record exists.
    pub fn mark_resolved(&self, id: i64) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE wrong_answers SET resolved = 1, resolved_at = ?2 WHERE id = ?1",
            params![id, timestamp(&Utc::now())],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_wrong_answer(&self, id: i64) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM wrong_answers WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Drop every resolved record, returning how many were removed
    pub fn delete_resolved(&self) -> Result<usize> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM wrong_answers WHERE resolved = 1", [])?;
        info!("Removed {} resolved wrong answers", removed);
        Ok(removed)
    }

    /// Remove all wrong answers and practice records
    pub fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch("DELETE FROM wrong_answers; DELETE FROM practice_records;")?;
        Ok(())
    }

    pub fn stats(&self) -> Result<WrongAnswerStats> {
        let conn = self.lock()?;

        let total: i64 = conn.query_row("SELECT COUNT(*) FROM wrong_answers", [], |row| row.get(0))?;
        let resolved: i64 = conn.query_row(
            "SELECT COUNT(*) FROM wrong_answers WHERE resolved = 1", [], |row| row.get(0)
        )?;
        let average_miss_count: f64 = conn.query_row(
            "SELECT COALESCE(AVG(miss_count), 0.0) FROM wrong_answers", [], |row| row.get(0)
        )?;
        let weakest_operation = conn
            .query_row(
                "SELECT operation FROM wrong_answers WHERE resolved = 0
                 GROUP BY operation ORDER BY COUNT(*) DESC, MIN(id) ASC LIMIT 1",
                [],
                |row| parse_operation(0, row.get::<_, String>(0)?),
            )
            .optional()?;

        Ok(WrongAnswerStats {
            total: total as usize,
            resolved: resolved as usize,
            unresolved: (total - resolved) as usize,
            weakest_operation,
            average_miss_count,
        })
    }

    pub fn practice_summary(&self) -> Result<PracticeSummary> {
        let conn = self.lock()?;
        let (total, correct): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(correct), 0) FROM practice_records",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(PracticeSummary {
            total: total as usize,
            correct: correct as usize,
            wrong: (total - correct) as usize,
        })
    }

    /// Per-operation totals and average answer time over single-operation records
    pub fn operation_stats(&self, operation: Operation) -> Result<OperationStats> {
        let conn = self.lock()?;
        let (total, correct, average_elapsed_ms): (i64, i64, f64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(correct), 0), COALESCE(AVG(elapsed_ms), 0.0)
             FROM practice_records WHERE operation = ?1 AND expression_text IS NULL",
            params![operation.display_name()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(OperationStats {
            operation,
            total: total as usize,
            correct: correct as usize,
            average_elapsed_ms,
        })
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn wrong_answers(&self) -> Result<Vec<WrongAnswerRecord>> {
        self.unresolved()
    }

    fn record_outcome(&self, outcome: &PracticeOutcome) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let problem = &outcome.problem;
        let answered_at = timestamp(&outcome.answered_at);

        tx.execute(
            "INSERT INTO practice_records (operation, operand1, operand2, expression_text, correct_answer,
                submitted_answer, correct, difficulty, elapsed_ms, answered_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                problem.operation.display_name(),
                problem.operand1,
                problem.operand2,
                problem.expression_text,
                problem.correct_answer,
                outcome.submitted_answer,
                outcome.correct,
                problem.difficulty.to_string(),
                outcome.elapsed_ms as i64,
                answered_at,
            ],
        )?;

        // Composite operands do not describe the whole expression
        let collect = self.collect_wrong_answers && !outcome.correct && !problem.is_composite();
        if let (true, Some(submitted)) = (collect, outcome.submitted_answer) {
            let existing: Option<i64> = tx
                .query_row(
                    "SELECT id FROM wrong_answers WHERE operation = ?1 AND operand1 = ?2 AND operand2 = ?3",
                    params![problem.operation.display_name(), problem.operand1, problem.operand2],
                    |row| row.get(0),
                )
                .optional()?;

            match existing {
                Some(id) => {
                    tx.execute(
                        "UPDATE wrong_answers
                         SET miss_count = miss_count + 1, submitted_answer = ?2, last_missed_at = ?3,
                             resolved = 0, resolved_at = NULL
                         WHERE id = ?1",
                        params![id, submitted, answered_at],
                    )?;
                    debug!("Wrong answer {} missed again: {}", id, problem);
                }
                None => {
                    tx.execute(
                        "INSERT INTO wrong_answers (operation, operand1, operand2, correct_answer,
                            submitted_answer, difficulty, miss_count, last_missed_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)",
                        params![
                            problem.operation.display_name(),
                            problem.operand1,
                            problem.operand2,
                            problem.correct_answer,
                            submitted,
                            problem.difficulty.to_string(),
                            answered_at,
                        ],
                    )?;
                    debug!("Collected new wrong answer: {}", problem);
                }
            }
        }

        tx.commit()?;
        Ok(())
    }
}

/// Fixed-width UTC timestamps so text ordering matches time ordering
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_operation(idx: usize, raw: String) -> rusqlite::Result<Operation> {
    Operation::parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, format!("unknown operation '{raw}'").into())
    })
}

fn parse_difficulty(idx: usize, raw: String) -> rusqlite::Result<Difficulty> {
    Difficulty::parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, format!("unknown difficulty '{raw}'").into())
    })
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<WrongAnswerRecord> {
    let last_missed_at: String = row.get(8)?;
    let resolved_at: Option<String> = row.get(10)?;

    Ok(WrongAnswerRecord {
        id: row.get(0)?,
        operation: parse_operation(1, row.get(1)?)?,
        operand1: row.get(2)?,
        operand2: row.get(3)?,
        correct_answer: row.get(4)?,
        submitted_answer: row.get(5)?,
        difficulty: parse_difficulty(6, row.get(6)?)?,
        miss_count: row.get(7)?,
        last_missed_at: parse_timestamp(8, &last_missed_at)?,
        resolved: row.get(9)?,
        resolved_at: resolved_at.as_deref().map(|raw| parse_timestamp(10, raw)).transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::CompositeExpression;
    use crate::generator::Problem;
    use chrono::Duration;
    use tempfile::tempdir;

    fn miss(problem: &Problem, answer: i32) -> PracticeOutcome {
        PracticeOutcome::grade(problem.clone(), Some(answer), 2_000)
    }

    #[test]
    fn test_wrong_answer_is_collected() {
        let store = SqliteHistoryStore::in_memory().unwrap();
        let problem = Problem::basic(Operation::Add, 8, 7, Difficulty::Easy);
        store.record_outcome(&miss(&problem, 5)).unwrap();

        let records = store.wrong_answers().unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.operation, Operation::Add);
        assert_eq!((record.operand1, record.operand2), (8, 7));
        assert_eq!(record.correct_answer, 15);
        assert_eq!(record.submitted_answer, 5);
        assert_eq!(record.difficulty, Difficulty::Easy);
        assert_eq!(record.miss_count, 1);
        assert!(!record.resolved);
    }

    #[test]
    fn test_repeat_miss_increments_and_reopens() {
        let store = SqliteHistoryStore::in_memory().unwrap();
        let problem = Problem::basic(Operation::Sub, 42, 17, Difficulty::Medium);
        store.record_outcome(&miss(&problem, 35)).unwrap();

        let id = store.wrong_answers().unwrap()[0].id;
        assert!(store.mark_resolved(id).unwrap());
        assert!(store.wrong_answers().unwrap().is_empty());
        assert!(store.get(id).unwrap().unwrap().resolved_at.is_some());

        store.record_outcome(&miss(&problem, 24)).unwrap();
        let record = store.get(id).unwrap().unwrap();
        assert_eq!(record.miss_count, 2);
        assert_eq!(record.submitted_answer, 24);
        assert!(!record.resolved);
        assert!(record.resolved_at.is_none());
        assert_eq!(store.all_wrong_answers().unwrap().len(), 1);
    }

    #[test]
    fn test_correct_skipped_and_composite_not_collected() {
        let store = SqliteHistoryStore::in_memory().unwrap();
        let basic = Problem::basic(Operation::Mul, 6, 7, Difficulty::Easy);
        store.record_outcome(&miss(&basic, 42)).unwrap();
        store.record_outcome(&PracticeOutcome::grade(basic, None, 500)).unwrap();

        let expression = CompositeExpression::new(vec![2, 3, 4], vec![Operation::Add, Operation::Mul]).unwrap();
        let composite = Problem::composite(expression, Difficulty::Medium);
        store.record_outcome(&miss(&composite, 20)).unwrap();

        assert!(store.all_wrong_answers().unwrap().is_empty());
        let summary = store.practice_summary().unwrap();
        assert_eq!(summary, PracticeSummary { total: 3, correct: 1, wrong: 2 });
    }

    #[test]
    fn test_collection_can_be_disabled() {
        let mut store = SqliteHistoryStore::in_memory().unwrap();
        store.set_collect_wrong_answers(false);
        let problem = Problem::basic(Operation::Add, 9, 9, Difficulty::Easy);
        store.record_outcome(&miss(&problem, 8)).unwrap();

        assert!(store.all_wrong_answers().unwrap().is_empty());
        assert_eq!(store.practice_summary().unwrap().wrong, 1);
    }

    #[test]
    fn test_ordering_by_miss_count_then_recency() {
        let store = SqliteHistoryStore::in_memory().unwrap();
        let old = Problem::basic(Operation::Add, 1, 2, Difficulty::Easy);
        let recent = Problem::basic(Operation::Add, 3, 4, Difficulty::Easy);
        let frequent = Problem::basic(Operation::Div, 12, 3, Difficulty::Easy);

        let mut outcome = miss(&old, 0);
        outcome.answered_at = Utc::now() - Duration::hours(2);
        store.record_outcome(&outcome).unwrap();
        store.record_outcome(&miss(&recent, 0)).unwrap();
        for _ in 0..3 {
            store.record_outcome(&miss(&frequent, 3)).unwrap();
        }

        let order: Vec<_> = store
            .wrong_answers()
            .unwrap()
            .into_iter()
            .map(|r| (r.operand1, r.operand2))
            .collect();
        assert_eq!(order, vec![(12, 3), (3, 4), (1, 2)]);
    }

    #[test]
    fn test_stats_and_cleanup() {
        let store = SqliteHistoryStore::in_memory().unwrap();
        assert_eq!(store.stats().unwrap(), WrongAnswerStats::default());

        let problems = [
            Problem::basic(Operation::Sub, 31, 9, Difficulty::Medium),
            Problem::basic(Operation::Sub, 40, 12, Difficulty::Medium),
            Problem::basic(Operation::Mul, 7, 8, Difficulty::Easy),
        ];
        for problem in &problems {
            store.record_outcome(&miss(problem, 1)).unwrap();
        }
        store.record_outcome(&miss(&problems[2], 54)).unwrap();

        let mul_id = store
            .all_wrong_answers()
            .unwrap()
            .into_iter()
            .find(|r| r.operation == Operation::Mul)
            .unwrap()
            .id;
        store.mark_resolved(mul_id).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.resolved, 1);
        assert_eq!(stats.unresolved, 2);
        assert_eq!(stats.weakest_operation, Some(Operation::Sub));
        assert!((stats.average_miss_count - 4.0 / 3.0).abs() < 1e-9);

        assert_eq!(store.resolved().unwrap().len(), 1);
        assert_eq!(store.delete_resolved().unwrap(), 1);
        assert_eq!(store.all_wrong_answers().unwrap().len(), 2);

        let sub_id = store.wrong_answers().unwrap()[0].id;
        assert!(store.delete_wrong_answer(sub_id).unwrap());
        assert!(!store.delete_wrong_answer(sub_id).unwrap());
        assert!(!store.mark_resolved(9_999).unwrap());

        store.clear().unwrap();
        assert_eq!(store.stats().unwrap().total, 0);
        assert_eq!(store.practice_summary().unwrap().total, 0);
    }

    #[test]
    fn test_operation_stats() {
        let store = SqliteHistoryStore::in_memory().unwrap();
        let empty = store.operation_stats(Operation::Add).unwrap();
        assert_eq!((empty.total, empty.correct), (0, 0));
        assert_eq!(empty.average_elapsed_ms, 0.0);

        let add = Problem::basic(Operation::Add, 8, 7, Difficulty::Easy);
        store.record_outcome(&PracticeOutcome::grade(add.clone(), Some(15), 1_000)).unwrap();
        store.record_outcome(&PracticeOutcome::grade(add.clone(), Some(14), 3_000)).unwrap();
        store.record_outcome(&PracticeOutcome::grade(add, None, 5_000)).unwrap();
        let mul = Problem::basic(Operation::Mul, 6, 7, Difficulty::Easy);
        store.record_outcome(&PracticeOutcome::grade(mul, Some(42), 9_000)).unwrap();

        // Composite records share the first operator but are not counted
        let expression = CompositeExpression::new(vec![2, 3, 4], vec![Operation::Add, Operation::Mul]).unwrap();
        let composite = Problem::composite(expression, Difficulty::Medium);
        store.record_outcome(&PracticeOutcome::grade(composite, Some(14), 20_000)).unwrap();

        let stats = store.operation_stats(Operation::Add).unwrap();
        assert_eq!(stats.operation, Operation::Add);
        assert_eq!((stats.total, stats.correct), (3, 1));
        assert!((stats.average_elapsed_ms - 3_000.0).abs() < 1e-9);
        assert!((stats.accuracy() - 100.0 / 3.0).abs() < 1e-9);

        let stats = store.operation_stats(Operation::Mul).unwrap();
        assert_eq!((stats.total, stats.correct), (1, 1));
        assert_eq!(stats.average_elapsed_ms, 9_000.0);
        assert_eq!(store.operation_stats(Operation::Div).unwrap().total, 0);
    }

    #[test]
    fn test_history_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("history.db");
        let problem = Problem::basic(Operation::Div, 56, 8, Difficulty::Medium);

        {
            let store = SqliteHistoryStore::open(&path).unwrap();
            store.record_outcome(&miss(&problem, 8)).unwrap();
        }

        let store = SqliteHistoryStore::open(&path).unwrap();
        let records = store.wrong_answers().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].as_problem(), problem);
    }
}

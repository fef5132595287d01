//! CLI interface for math-trainer

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::{self, Config, PracticeSettings, SettingsProvider};
use crate::generator::{Problem, ProblemSynthesizer};
use crate::history::{HistoryStore, PracticeOutcome, SqliteHistoryStore, WrongAnswerRecord};
use crate::remediation::{
    AnalysisResult, ErrorPatternAnalyzer, RemediationSession, RemediationSessionBuilder, Severity,
};
use crate::types::{Difficulty, Operation};

#[derive(Parser)]
#[command(name = "math-trainer")]
#[command(about = "Adaptive arithmetic practice with error-pattern analysis", long_about = None)]
#[command(version)]
struct Cli {
    /// Seed the problem generator for a reproducible session
    #[arg(long, global = true, env = "MATH_TRAINER_SEED")]
    seed: Option<u64>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Practice single-operation problems (default when no command given)
    Practice {
        /// Operation to drill (add, sub, mul, div); defaults to the enabled set
        #[arg(short, long, value_parser = parse_operation)]
        operation: Option<Operation>,
        /// Difficulty (easy, medium, hard)
        #[arg(short, long, value_parser = parse_difficulty)]
        difficulty: Option<Difficulty>,
        /// Number of problems
        #[arg(short, long)]
        count: Option<usize>,
    },
    /// Practice a mixed batch across operations
    Mixed {
        /// Include multi-operator expressions such as 2 + 3 × 4
        #[arg(long)]
        complex: bool,
        /// Number of problems
        #[arg(short, long)]
        count: Option<usize>,
    },
    /// Analyze unresolved wrong answers for error patterns
    Analyze {
        /// Print the analysis as JSON
        #[arg(long)]
        json: bool,
    },
    /// Practice problems targeted at detected error patterns
    Remediate {
        /// Number of problems
        #[arg(short, long, default_value_t = crate::remediation::DEFAULT_TARGET_COUNT)]
        count: usize,
        /// Print the session as JSON instead of running it
        #[arg(long)]
        json: bool,
    },
    /// Manage wrong-answer history
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// List wrong answers
    List {
        /// Include resolved records
        #[arg(short, long)]
        all: bool,
    },
    /// Show wrong-answer and practice statistics
    Stats,
    /// Mark a wrong answer as resolved
    Resolve {
        /// Record ID
        id: i64,
    },
    /// Delete all resolved wrong answers
    ClearResolved,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Reset configuration to defaults
    Reset,
    /// Print the configuration file path
    Path,
}

fn parse_operation(s: &str) -> std::result::Result<Operation, String> {
    Operation::parse(s).ok_or_else(|| format!("unknown operation '{}' (expected add, sub, mul or div)", s))
}

fn parse_difficulty(s: &str) -> std::result::Result<Difficulty, String> {
    Difficulty::parse(s).ok_or_else(|| format!("unknown difficulty '{}' (expected easy, medium or hard)", s))
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => config::config_path()?,
    };

    let mut rng = match cli.seed {
        Some(seed) => {
            info!("Using seed {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_os_rng(),
    };

    match cli.command {
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => {
                let config = Config::load_from(&config_path)?;
                print!("{}", toml::to_string_pretty(&config).context("Failed to serialize config")?);
            }
            ConfigCommands::Reset => config::reset_config(&config_path)?,
            ConfigCommands::Path => println!("{}", config_path.display()),
        },
        Some(Commands::Practice { operation, difficulty, count }) => {
            let config = Config::load_from(&config_path)?;
            let store = open_store(&config)?;
            let problems = practice_problems(&config.practice_settings(), operation, difficulty, count, &mut rng)?;
            run_drill(&problems, &store, config.practice.show_step_by_step)?;
        }
        None => {
            let config = Config::load_from(&config_path)?;
            let store = open_store(&config)?;
            let problems = practice_problems(&config.practice_settings(), None, None, None, &mut rng)?;
            run_drill(&problems, &store, config.practice.show_step_by_step)?;
        }
        Some(Commands::Mixed { complex, count }) => {
            let config = Config::load_from(&config_path)?;
            let store = open_store(&config)?;

            let mut mixed = config.mixed_practice_config();
            mixed.allow_complex_expressions |= complex;
            if let Some(count) = count {
                mixed.question_count = count;
            }

            let problems = ProblemSynthesizer::new().generate_mixed_batch(&mixed, &mut rng)?;
            run_drill(&problems, &store, config.practice.show_step_by_step)?;
        }
        Some(Commands::Analyze { json }) => {
            let config = Config::load_from(&config_path)?;
            let store = open_store(&config)?;
            let records = store.wrong_answers()?;
            let analysis = ErrorPatternAnalyzer::new().analyze(&records);

            if json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            } else {
                print_analysis(&analysis);
            }
        }
        Some(Commands::Remediate { count, json }) => {
            let config = Config::load_from(&config_path)?;
            let store = open_store(&config)?;
            let records = store.wrong_answers()?;
            let session = RemediationSessionBuilder::new().build(&records, count, &mut rng);

            if json {
                println!("{}", serde_json::to_string_pretty(&session)?);
            } else {
                print_session_plan(&session, count);
                if !session.is_empty() {
                    run_drill(&session.problems, &store, config.practice.show_step_by_step)?;
                }
            }
        }
        Some(Commands::History { command }) => {
            let config = Config::load_from(&config_path)?;
            let store = open_store(&config)?;
            match command {
                HistoryCommands::List { all } => {
                    let records = if all { store.all_wrong_answers()? } else { store.unresolved()? };
                    print_records(&records);
                }
                HistoryCommands::Stats => {
                    let stats = store.stats()?;
                    let summary = store.practice_summary()?;
                    println!("Wrong answers:   {} ({} unresolved, {} resolved)", stats.total, stats.unresolved, stats.resolved);
                    println!("Average misses:  {:.2}", stats.average_miss_count);
                    if let Some(operation) = stats.weakest_operation {
                        println!("Weakest:         {}", operation);
                    }
                    println!("Practiced:       {} problems, {} correct ({:.1}%)", summary.total, summary.correct, summary.accuracy());
                    for operation in Operation::ALL {
                        let per_op = store.operation_stats(operation)?;
                        if per_op.total > 0 {
                            println!(
                                "  {:<15} {:>4} practiced, {:>5.1}% correct, {:.1}s average",
                                operation.display_name(),
                                per_op.total,
                                per_op.accuracy(),
                                per_op.average_elapsed_ms / 1000.0
                            );
                        }
                    }
                }
                HistoryCommands::Resolve { id } => {
                    if store.mark_resolved(id)? {
                        println!("Marked #{} as resolved.", id);
                    } else {
                        bail!("No wrong answer with id {}", id);
                    }
                }
                HistoryCommands::ClearResolved => {
                    let removed = store.delete_resolved()?;
                    println!("Removed {} resolved wrong answers.", removed);
                }
            }
        }
    }

    Ok(())
}

fn open_store(config: &Config) -> Result<SqliteHistoryStore> {
    let path = config.storage.resolve_database_path()?;
    let mut store = SqliteHistoryStore::open(&path)?;
    store.set_collect_wrong_answers(config.practice.auto_collect_wrong_answers);
    Ok(store)
}

/// Build a practice batch; explicit arguments override the configured settings
fn practice_problems<R: Rng + ?Sized>(
    settings: &PracticeSettings,
    operation: Option<Operation>,
    difficulty: Option<Difficulty>,
    count: Option<usize>,
    rng: &mut R,
) -> Result<Vec<Problem>> {
    settings.validate().context("Invalid practice settings")?;

    let synthesizer = ProblemSynthesizer::new();
    let difficulty = difficulty.unwrap_or(settings.default_difficulty);
    let count = count.unwrap_or(settings.questions_per_session);

    let mut problems = Vec::with_capacity(count);
    for _ in 0..count {
        let operation = match operation {
            Some(operation) => operation,
            None => *settings
                .enabled_operations
                .choose(rng)
                .context("No operations enabled")?,
        };
        let range = settings.ranges.range_for(operation);
        problems.push(synthesizer.generate(operation, difficulty, range, rng));
    }

    debug!("Prepared {} practice problems at {}", problems.len(), difficulty);
    Ok(problems)
}

/// Result of one interactive drill
#[derive(Debug, Default)]
struct DrillSummary {
    answered: usize,
    correct: usize,
    skipped: usize,
}

/// Ask each problem in turn, recording every outcome in `store`
fn run_drill(problems: &[Problem], store: &dyn HistoryStore, show_steps: bool) -> Result<()> {
    if problems.is_empty() {
        println!("No problems to practice.");
        return Ok(());
    }

    let mut rl = DefaultEditor::new().context("Failed to initialize line editor")?;
    let mut summary = DrillSummary::default();

    println!("Answer each problem. Type 's' to skip, 'q' to stop.");
    println!();

    'problems: for (index, problem) in problems.iter().enumerate() {
        let started = Instant::now();
        let prompt = format!("[{}/{}] {}  ", index + 1, problems.len(), problem.question_text());

        let answer = loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let input = line.trim();
                    match input {
                        "" => continue,
                        "q" | "quit" => break 'problems,
                        "s" | "skip" => break None,
                        _ => match input.parse::<i32>() {
                            Ok(value) => break Some(value),
                            Err(_) => println!("Please enter a whole number."),
                        },
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break 'problems,
                Err(e) => return Err(e).context("Failed to read answer"),
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let outcome = PracticeOutcome::grade(problem.clone(), answer, elapsed_ms);
        store.record_outcome(&outcome)?;

        match answer {
            None => {
                summary.skipped += 1;
                println!("  Skipped. The answer is {}.", problem.correct_answer);
            }
            Some(_) if outcome.correct => {
                summary.answered += 1;
                summary.correct += 1;
                println!("  ✓ Correct!");
            }
            Some(_) => {
                summary.answered += 1;
                println!("  ✗ Not quite. The answer is {}.", problem.correct_answer);
                if show_steps {
                    print_solution(problem);
                }
            }
        }
        println!();
    }

    println!(
        "Done: {} of {} correct, {} skipped.",
        summary.correct, summary.answered, summary.skipped
    );
    Ok(())
}

fn print_solution(problem: &Problem) {
    for (index, step) in problem.solution_steps().iter().enumerate() {
        println!("    {}. {}: {}", index + 1, step.title, step.description);
    }
}

fn print_analysis(analysis: &AnalysisResult) {
    if analysis.total_records == 0 {
        println!("No unresolved wrong answers. Nothing to analyze yet.");
        return;
    }

    println!("Wrong answers analyzed: {}", analysis.total_records);
    println!("Average misses:         {:.2}", analysis.average_miss_count);
    if let Some(operation) = analysis.most_problematic_operation {
        println!("Most problematic:       {}", operation);
    }
    let urgent = analysis.patterns_at_least(Severity::High).count();
    if urgent > 0 {
        println!("High severity:          {} pattern(s)", urgent);
    }
    println!();
    for pattern in &analysis.patterns {
        println!("[{}] {} ({} records)", pattern.severity, pattern.description, pattern.affected_records);
        println!("      → {}", pattern.recommendation);
    }
}

fn print_session_plan(session: &RemediationSession, target: usize) {
    if session.is_empty() {
        println!("Not enough history to personalize practice yet. Try a few practice sessions first.");
        return;
    }
    if session.is_under_filled(target) {
        println!("Only {} of {} problems could be prepared.", session.len(), target);
    }
    for strategy in &session.strategies {
        println!("• {} [{}]: {}", strategy.description, strategy.kind, strategy.recommendation);
    }
    println!();
}

fn print_records(records: &[WrongAnswerRecord]) {
    if records.is_empty() {
        println!("No wrong answers recorded.");
        return;
    }

    for record in records {
        let status = if record.resolved { "resolved" } else { "open" };
        println!(
            "#{:<4} {:>3} {} {:<3} = {:<4} (answered {}, missed {}×, {}, last {})",
            record.id,
            record.operand1,
            record.operation.symbol(),
            record.operand2,
            record.correct_answer,
            record.submitted_answer,
            record.miss_count,
            status,
            record.last_missed_at.format("%Y-%m-%d %H:%M"),
        );
    }
}

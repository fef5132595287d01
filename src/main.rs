//! math-trainer - adaptive arithmetic practice
//!
//! Drills, error-pattern analysis and remediation sessions from the command line.

use math_trainer::cli;

fn main() -> anyhow::Result<()> {
    // Initialize logging (WARN level by default, use RUST_LOG=debug for diagnostics)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into())
        )
        .with_writer(std::io::stderr)
        .init();

    cli::run()
}

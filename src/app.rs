//! Main application orchestration and execution

use crate::{
    cli::Cli,
    config::{display_config_summary, load_config, scenario_file::build_scenario_runner, validate_config, AppConfig, RunMode},
    error::{AppError, Result},
    executor::{
        stress::{StressSpec, StressTest},
        Runner,
    },
    logging::Logger,
    output::{OutputCoordinator, OutputFormatterFactory},
    CancellationToken, BUILD_TIME, GIT_COMMIT, PKG_NAME, VERSION,
};
use std::path::Path;

/// Main application struct that coordinates all components
pub struct App {
    cli: Cli,
}

impl App {
    /// Create a new application instance with CLI configuration
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Resolve the configuration and run the selected mode
    ///
    /// Reports go to stdout, diagnostics and logs to stderr. An interrupt
    /// stops dispatch; whatever was measured is still reported before the
    /// run ends with a cancellation error.
    pub async fn run(self) -> Result<()> {
        let config = load_config(self.cli)?;
        let warnings = validate_config(&config)?;

        let logger = Logger::from_flags(PKG_NAME, config.verbose, config.debug, config.enable_color);
        logger.set_session_id(Logger::new_correlation_id()).await;

        if config.debug {
            eprintln!(
                "{} v{} ({}, built {})",
                PKG_NAME,
                VERSION,
                GIT_COMMIT.unwrap_or("unknown commit"),
                BUILD_TIME
            );
            eprintln!("{}\n", display_config_summary(&config));
        }
        for warning in &warnings {
            eprintln!("{}", warning.format(config.enable_color));
        }

        let cancel = CancellationToken::new();
        let signal_task = {
            let cancel = cancel.clone();
            let logger = logger.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    logger.warn("Interrupt received, stopping dispatch").log().await;
                    cancel.cancel();
                }
            })
        };

        let coordinator = OutputCoordinator::new(
            OutputFormatterFactory::create_formatter(config.enable_color, config.verbose),
            config.output_format,
        );

        let outcome = match config.mode() {
            RunMode::Single => run_single(&config, &coordinator, &logger, &cancel).await,
            RunMode::Stress(spec) => run_stress(&config, &spec, &coordinator, &logger, &cancel).await,
            RunMode::Scenarios(path) => run_scenarios(&config, &path, &coordinator, &logger, &cancel).await,
        };

        signal_task.abort();
        outcome
    }
}

async fn run_single(
    config: &AppConfig,
    coordinator: &OutputCoordinator,
    logger: &Logger,
    cancel: &CancellationToken,
) -> Result<()> {
    let runner = Runner::new(config.load.clone())?.with_logger(logger.child("runner"));

    if let Some(warmup) = config.warmup {
        runner.warmup(cancel, warmup).await?;
        if cancel.is_cancelled() {
            return Err(AppError::cancelled("Interrupted during warmup"));
        }
    }

    let result = runner.run(cancel).await?;
    let violations = config.thresholds.check(&result);
    print!(
        "{}",
        coordinator.render_single(&result, &violations, !config.thresholds.is_empty())?
    );

    interrupted(cancel, "Load test")?;
    config.thresholds.enforce(&result)
}

async fn run_stress(
    config: &AppConfig,
    spec: &StressSpec,
    coordinator: &OutputCoordinator,
    logger: &Logger,
    cancel: &CancellationToken,
) -> Result<()> {
    let steps = StressTest::new(&config.load, spec)
        .with_logger(logger.child("stress"))
        .run(cancel)
        .await?;
    print!("{}", coordinator.render_stress(&steps)?);
    interrupted(cancel, "Stress test")
}

async fn run_scenarios(
    config: &AppConfig,
    path: &Path,
    coordinator: &OutputCoordinator,
    logger: &Logger,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut runner = build_scenario_runner(path, &config.load)?.with_logger(logger.child("scenario"));
    let outcome = runner.run(cancel).await;

    // Scenarios that completed before a failure are still reported.
    print!("{}", coordinator.render_scenarios(&runner.ordered_results())?);
    outcome
}

fn interrupted(cancel: &CancellationToken, what: &str) -> Result<()> {
    if cancel.is_cancelled() {
        Err(AppError::cancelled(format!("{} interrupted; partial results shown", what)))
    } else {
        Ok(())
    }
}

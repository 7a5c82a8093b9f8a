//! mo - a project task runner
//!
//! Loads the task file, runs the requested tasks and renders the resulting
//! event stream through the selected frontend.

use std::process::ExitCode;

use clap::Parser;
use console::style;
use miette::IntoDiagnostic;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use mo::cli::Cli;
use mo::config;
use mo::events::{Event, EventSender};
use mo::frontend;
use mo::runner::Runner;

#[tokio::main]
async fn main() -> ExitCode {
    // Set up panic handler for nice error messages
    miette::set_panic_hook();

    let cli = Cli::parse();

    // Logs go to stderr so they never mix with frontend output
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    if cli.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{}: {:?}", style("error").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Run the invocation, returning whether every requested task succeeded
async fn run(cli: Cli) -> miette::Result<bool> {
    let (tx, rx) = mpsc::unbounded_channel();
    let frontend = cli.frontend.build();
    let consumer = tokio::task::spawn_blocking(move || frontend::drive(frontend, rx));

    // The sender is dropped when `execute` returns, which ends the stream
    let success = execute(&cli, tx).await;

    consumer.await.into_diagnostic()?.into_diagnostic()?;
    Ok(success)
}

async fn execute(cli: &Cli, events: EventSender) -> bool {
    let project = match config::load(cli.file.as_deref()) {
        Ok((project, _)) => project,
        Err(err) => {
            warn!(error = ?err, "failed to load task file");
            let filename = cli
                .file
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| config::TASK_FILES[0].to_string());
            let event = Event::InvalidMofile {
                filename,
                message: err.describe(),
            };
            if events.send(event).is_err() {
                debug!("event receiver closed, dropping load error");
            }
            return false;
        }
    };

    let mut runner = Runner::new(project, cli.overrides(), events);

    if cli.tasks.is_empty() {
        runner.help();
        return true;
    }

    for task in &cli.tasks {
        runner.queue_task(task.as_str());
    }

    runner.run().await.is_success()
}

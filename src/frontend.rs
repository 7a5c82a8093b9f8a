//! Frontends render the event stream
//!
//! Three are available: [`Human`] for colourful terminal output, [`Debug`]
//! for raw event dumps and [`Json`] for one JSON object per line.

use std::io::{self, Write};

use console::style;
use serde_json::Value;

use crate::events::{Event, EventReceiver, Pipe};

/// A frontend takes events from the runner and displays them
pub trait Frontend: Send {
    /// Called once before the first event
    fn begin(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Process a single event
    fn output(&mut self, event: &Event) -> io::Result<()>;

    /// Called once after the last event
    fn end(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Feed every event from `events` to `frontend` until the sender is dropped.
///
/// Blocks the calling thread; run it on a blocking task.
pub fn drive(mut frontend: Box<dyn Frontend>, mut events: EventReceiver) -> io::Result<()> {
    frontend.begin()?;
    while let Some(event) = events.blocking_recv() {
        frontend.output(&event)?;
    }
    frontend.end()
}

/// Prints each event's debug representation
pub struct Debug<W = io::Stdout> {
    out: W,
}

impl Debug {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Default for Debug {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Debug<W> {
    pub fn with_writer(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write + Send> Frontend for Debug<W> {
    fn output(&mut self, event: &Event) -> io::Result<()> {
        writeln!(self.out, "{:?}", event)
    }
}

/// Line-terminated JSON objects: `{"name": .., "kind": .., "args": {..}}`
pub struct Json<W = io::Stdout> {
    out: W,
}

impl Json {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Default for Json {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Json<W> {
    pub fn with_writer(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write + Send> Frontend for Json<W> {
    fn output(&mut self, event: &Event) -> io::Result<()> {
        let mut value = serde_json::to_value(event)?;
        if let Value::Object(object) = &mut value {
            object.insert("kind".to_string(), serde_json::to_value(event.kind())?);
        }
        writeln!(self.out, "{}", value)?;
        self.out.flush()
    }
}

/// Colourful output meant for people
pub struct Human<W = io::Stdout> {
    out: W,
}

impl Human {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Default for Human {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Human<W> {
    pub fn with_writer(out: W) -> Self {
        Self { out }
    }

    fn line(&mut self, marker: impl std::fmt::Display, text: impl std::fmt::Display) -> io::Result<()> {
        writeln!(self.out, " {} {}", marker, text)
    }

    fn error(&mut self, text: impl std::fmt::Display, detail: Option<&str>) -> io::Result<()> {
        self.line(style("!").red().bold(), style(text).red().bold())?;
        if let Some(detail) = detail {
            for line in detail.lines() {
                writeln!(self.out, "    {}", line)?;
            }
        }
        Ok(())
    }
}

impl<W: Write + Send> Frontend for Human<W> {
    fn begin(&mut self) -> io::Result<()> {
        writeln!(self.out)
    }

    fn end(&mut self) -> io::Result<()> {
        writeln!(self.out)?;
        self.out.flush()
    }

    fn output(&mut self, event: &Event) -> io::Result<()> {
        match event {
            Event::FindingTask { .. }
            | Event::StartingTask { .. }
            | Event::RunningStep { .. }
            | Event::FinishedTask { .. } => Ok(()),

            Event::RunningTask { task } => {
                writeln!(self.out)?;
                self.line(
                    style("λ").blue().bold(),
                    format!("{} {}", style("Running task:").bold(), task.name),
                )
            }
            Event::SkippingTask { name } => {
                writeln!(self.out)?;
                self.line(
                    style("λ").yellow().bold(),
                    style(format!("Skipping task: {}", name)).dim(),
                )
            }
            Event::RunningCommand { command, .. } => self.line(
                style(">").blue().bold(),
                format!("{} {}", style("Executing:").bold(), command),
            ),
            Event::CommandOutput { pipe, output } => {
                let text = match pipe {
                    Pipe::Stdout => style(output).dim(),
                    Pipe::Stderr => style(output).dim().red(),
                };
                self.line(" ", text)
            }
            Event::CommandFailed {
                code, description, ..
            } => self.error(
                format!("Command failed with exit code {}", code),
                description.as_deref(),
            ),
            Event::SpawnFailed { command, message } => {
                self.error(format!("Could not run: {}", command), Some(message.as_str()))
            }
            Event::InvalidMofile { filename, message } => {
                self.error(format!("Invalid task file: {}", filename), Some(message.as_str()))
            }
            Event::UndefinedVariable { variable } => {
                self.error(format!("Undefined variable: {}", variable), None)
            }
            Event::UnknownStepType { step } => {
                self.error(format!("Unknown step type: {}", step), None)
            }
            Event::TaskNotFound { name, similarities } => {
                let mut text = format!("No such task: {}", name);
                if !similarities.is_empty() {
                    text.push_str(&format!(" Did you mean? {}", similarities.join(", ")));
                }
                self.error(text, None)
            }
            Event::CyclicDependency { chain } => {
                self.error(format!("Circular dependency: {}", chain.join(" -> ")), None)
            }
            Event::HelpOutput { output } => {
                writeln!(self.out)?;
                for line in output.lines() {
                    writeln!(self.out, " {}", line)?;
                }
                Ok(())
            }
            Event::Help { tasks } => {
                writeln!(self.out, "{}", style("Available tasks:").bold())?;
                writeln!(self.out)?;

                let width = tasks.keys().map(String::len).max().unwrap_or(0);
                for (name, task) in tasks {
                    writeln!(
                        self.out,
                        "  {}{} - {}",
                        style(name).cyan().bold(),
                        " ".repeat(width - name.len()),
                        style(&task.description).dim(),
                    )?;
                }
                Ok(())
            }
        }
    }
}

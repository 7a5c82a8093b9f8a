//! Task execution engine
//!
//! Walks the dependency tree depth-first, runs each task at most once per
//! session and streams command output back as events. Only one task or
//! step is ever active; the sole concurrency is multiplexing a child's
//! stdout and stderr while it runs.

use std::collections::HashSet;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use indexmap::IndexMap;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::TaskError;
use crate::events::{Event, EventSender, Pipe};
use crate::project::{Project, Step, Task};
use crate::variables::{self, ResolvedVariables};

/// Outcome of running every queued task
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Queued task names that finished or were skipped
    pub completed: Vec<String>,
    /// Queued task names whose chain aborted, with the reason
    pub failed: Vec<(String, TaskError)>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs tasks from a project for one invocation
pub struct Runner {
    project: Arc<Project>,
    variables: IndexMap<String, String>,
    events: EventSender,
    tasks_run: HashSet<String>,
    /// Tasks whose dependencies are currently being resolved, outermost first
    resolving: Vec<String>,
    task_queue: Vec<String>,
}

impl Runner {
    /// Create a runner with the given variable overrides
    pub fn new(project: Project, variables: IndexMap<String, String>, events: EventSender) -> Self {
        Self {
            project: Arc::new(project),
            variables,
            events,
            tasks_run: HashSet::new(),
            resolving: Vec::new(),
            task_queue: Vec::new(),
        }
    }

    /// Queue a task for execution
    pub fn queue_task(&mut self, name: impl Into<String>) {
        self.task_queue.push(name.into());
    }

    /// Emit the list of available tasks
    pub fn help(&self) {
        self.emit(Event::Help {
            tasks: self.project.tasks.clone(),
        });
    }

    /// Run every queued task in order.
    ///
    /// A failing task only aborts its own chain; the next queued task
    /// still runs.
    pub async fn run(&mut self) -> RunSummary {
        let queue = std::mem::take(&mut self.task_queue);
        let mut summary = RunSummary::default();

        for name in queue {
            match self.run_task(&name).await {
                Ok(()) => summary.completed.push(name),
                Err(err) => {
                    info!(task = %name, error = %err, "task aborted");
                    summary.failed.push((name, err));
                }
            }
        }

        summary
    }

    /// Run one task and, first, its dependencies
    pub fn run_task<'a>(&'a mut self, name: &'a str) -> BoxFuture<'a, Result<(), TaskError>> {
        async move {
            if self.tasks_run.contains(name) {
                self.emit(Event::SkippingTask {
                    name: name.to_string(),
                });
                return Ok(());
            }

            self.emit(Event::FindingTask {
                name: name.to_string(),
            });

            let project = Arc::clone(&self.project);
            let task = match project.find_task(name) {
                Ok(task) => task,
                Err(err) => {
                    self.emit(Event::TaskNotFound {
                        name: name.to_string(),
                        similarities: err.similarities.into_iter().map(|t| t.name).collect(),
                    });
                    return Err(TaskError::NotFound {
                        name: name.to_string(),
                    });
                }
            };

            // A near-miss name may resolve to a task that already ran
            if task.name != name && self.tasks_run.contains(&task.name) {
                self.emit(Event::SkippingTask {
                    name: task.name.clone(),
                });
                return Ok(());
            }

            if let Some(start) = self.resolving.iter().position(|n| *n == task.name) {
                let mut chain = self.resolving[start..].to_vec();
                chain.push(task.name.clone());
                self.emit(Event::CyclicDependency {
                    chain: chain.clone(),
                });
                return Err(TaskError::CyclicDependency {
                    chain: chain.join(" -> "),
                });
            }

            self.emit(Event::StartingTask { task: task.clone() });

            self.resolving.push(task.name.clone());
            let mut dependencies = Ok(());
            for dependency in &task.dependencies {
                dependencies = self.run_task(dependency).await;
                if dependencies.is_err() {
                    break;
                }
            }
            self.resolving.pop();
            dependencies?;

            // Marked before the steps run: a task that fails part way is
            // skipped, not retried, if it comes up again this session.
            self.tasks_run.insert(task.name.clone());

            self.emit(Event::RunningTask { task: task.clone() });

            for step in &task.steps {
                self.run_step(task, step).await?;
            }

            self.emit(Event::FinishedTask { task: task.clone() });
            Ok(())
        }
        .boxed()
    }

    async fn run_step(&self, task: &Task, step: &Step) -> Result<(), TaskError> {
        self.emit(Event::RunningStep { step: step.clone() });

        let values = variables::resolve(task, &self.variables, &self.project.variables)
            .map_err(|err| self.undefined_variable(err.name))?;

        match step {
            Step::Command { command } => self.run_command_step(command, &values).await,
            Step::Print { text } => {
                let output = variables::render(text, &values)
                    .map_err(|err| self.undefined_variable(err.name))?;
                self.emit(Event::CommandOutput {
                    pipe: Pipe::Stdout,
                    output,
                });
                Ok(())
            }
            Step::Help { task: topic } => self.run_help_step(topic.as_deref(), &values),
            Step::Unknown { kind, .. } => {
                self.emit(Event::UnknownStepType { step: step.clone() });
                Err(TaskError::UnknownStep { kind: kind.clone() })
            }
        }
    }

    async fn run_command_step(&self, template: &str, values: &ResolvedVariables) -> Result<(), TaskError> {
        let command = variables::render(template, values)
            .map_err(|err| self.undefined_variable(err.name))?;
        let argv = split_command(&command);

        self.emit(Event::RunningCommand {
            command: command.clone(),
            argv: argv.clone(),
        });

        let code = self.execute_command(&command).await.map_err(|err| {
            warn!(command = %command, error = %err, "failed to run command");
            self.emit(Event::SpawnFailed {
                command: command.clone(),
                message: err.to_string(),
            });
            TaskError::Spawn {
                command: command.clone(),
                message: err.to_string(),
            }
        })?;

        if code != 0 {
            self.emit(Event::command_failed(&command, &argv, code));
            return Err(TaskError::CommandFailed { command, code });
        }

        Ok(())
    }

    /// Spawn the command through the shell and stream its output until both
    /// pipes close, then wait for the exit code.
    ///
    /// A process killed by a signal reports `-1`.
    async fn execute_command(&self, command: &str) -> std::io::Result<i32> {
        let mut child = shell_command(command, &self.project.path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        debug!(command, pid = ?child.id(), "spawned command");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        self.stream_output(stdout, stderr).await;

        let status = child.wait().await?;
        debug!(command, %status, "command exited");
        Ok(status.code().unwrap_or(-1))
    }

    /// Forward lines from both pipes as they become ready.
    async fn stream_output<O, E>(&self, stdout: Option<O>, stderr: Option<E>)
    where
        O: AsyncRead + Unpin,
        E: AsyncRead + Unpin,
    {
        let mut stdout = stdout.map(|pipe| BufReader::new(pipe).split(b'\n'));
        let mut stderr = stderr.map(|pipe| BufReader::new(pipe).split(b'\n'));

        while stdout.is_some() || stderr.is_some() {
            tokio::select! {
                segment = async { stdout.as_mut()?.next_segment().await.transpose() }, if stdout.is_some() => {
                    match segment {
                        Some(Ok(line)) => self.emit_line(Pipe::Stdout, &line),
                        Some(Err(err)) => {
                            warn!(error = %err, "failed to read stdout");
                            stdout = None;
                        }
                        None => stdout = None,
                    }
                }
                segment = async { stderr.as_mut()?.next_segment().await.transpose() }, if stderr.is_some() => {
                    match segment {
                        Some(Ok(line)) => self.emit_line(Pipe::Stderr, &line),
                        Some(Err(err)) => {
                            warn!(error = %err, "failed to read stderr");
                            stderr = None;
                        }
                        None => stderr = None,
                    }
                }
            }
        }
    }

    /// Emit one output line, trimmed; blank lines are dropped
    fn emit_line(&self, pipe: Pipe, line: &[u8]) {
        let line = String::from_utf8_lossy(line);
        let line = line.trim();
        if !line.is_empty() {
            self.emit(Event::CommandOutput {
                pipe,
                output: line.to_string(),
            });
        }
    }

    fn run_help_step(&self, topic: Option<&str>, values: &ResolvedVariables) -> Result<(), TaskError> {
        let name = topic
            .or_else(|| values.get("topic").map(String::as_str))
            .unwrap_or_default();

        let task = match self.project.find_task(name) {
            Ok(task) => task,
            Err(err) => {
                self.emit(Event::TaskNotFound {
                    name: name.to_string(),
                    similarities: err.similarities.into_iter().map(|t| t.name).collect(),
                });
                return Err(TaskError::NotFound {
                    name: name.to_string(),
                });
            }
        };

        let names: Vec<&str> = task.variables.keys().map(String::as_str).collect();
        let output = format!(
            "# {}\n\n{}\n\nVariables: {}",
            task.name,
            task.description,
            names.join(", ")
        );

        self.emit(Event::HelpOutput { output });
        Ok(())
    }

    fn undefined_variable(&self, name: String) -> TaskError {
        self.emit(Event::UndefinedVariable {
            variable: name.clone(),
        });
        TaskError::UndefinedVariable { name }
    }

    fn emit(&self, event: Event) {
        if self.events.send(event).is_err() {
            debug!("event receiver closed, dropping event");
        }
    }
}

/// Build a command that runs `command` through the platform shell
fn shell_command(command: &str, cwd: &Path) -> Command {
    let (shell, flag) = if cfg!(windows) { ("cmd", "/C") } else { ("sh", "-c") };
    let mut c = Command::new(shell);
    c.arg(flag).arg(command).current_dir(cwd);
    c
}

/// Split a command line into words, honouring single and double quotes
pub fn split_command(cmd: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in cmd.chars() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, c) if c.is_whitespace() => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        parts.push(current);
    }

    parts
}

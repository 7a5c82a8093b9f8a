//! Error types for mo
//!
//! Load-time failures use `miette` for pretty reporting with help text.
//! Run-time failures that abort a single task chain are modelled by
//! [`TaskError`], which the runner consumes instead of propagating.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::project::Task;

/// Main error type for mo operations
#[derive(Error, Diagnostic, Debug)]
pub enum MoError {
    #[error("Task file not found")]
    #[diagnostic(
        code(mo::config::not_found),
        help("Create a Mofile in your project root, or specify one with --file")
    )]
    ConfigNotFound {
        searched: Vec<PathBuf>,
    },

    #[error("Failed to parse {format} task file {}: {message}", .path.display())]
    #[diagnostic(code(mo::config::parse))]
    ConfigParse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    InvalidProject(#[from] InvalidProjectError),

    #[error("I/O error")]
    #[diagnostic(code(mo::io))]
    Io(#[from] std::io::Error),
}

impl MoError {
    /// The error text followed by its help text, if it has one
    pub fn describe(&self) -> String {
        match self.help() {
            Some(help) => format!("{}\n{}", self, help),
            None => self.to_string(),
        }
    }
}

/// The project cannot be loaded because it is invalid
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum InvalidProjectError {
    #[error("No tasks defined.")]
    #[diagnostic(
        code(mo::project::no_tasks),
        help("Add at least one entry under `tasks`")
    )]
    NoTasks,

    #[error("{name} {message}")]
    #[diagnostic(code(mo::project::invalid_variable))]
    InvalidVariable { name: String, message: String },

    #[error("{name} {message}")]
    #[diagnostic(code(mo::project::invalid_task))]
    InvalidTask { name: String, message: String },

    #[error("Invalid task file: {message}")]
    #[diagnostic(code(mo::project::invalid_config))]
    InvalidConfig { message: String },
}

/// A task name could not be resolved to exactly one task
#[derive(Error, Debug, Clone)]
#[error("No such task")]
pub struct NoSuchTaskError {
    /// Tasks whose names are close to the one requested
    pub similarities: Vec<Task>,
}

/// A required variable has neither an override nor a default
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Undefined variable: {name}")]
pub struct UndefinedVariable {
    pub name: String,
}

/// Signal that stops the current task chain.
///
/// By the time one of these is returned the matching error event has
/// already been emitted, so callers only need to unwind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("Task '{name}' not found")]
    NotFound { name: String },

    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String },

    #[error("Unknown step type '{kind}'")]
    UnknownStep { kind: String },

    #[error("Command '{command}' failed with exit code {code}")]
    CommandFailed { command: String, code: i32 },

    #[error("Failed to start '{command}': {message}")]
    Spawn { command: String, message: String },

    #[error("Circular dependency detected: {chain}")]
    CyclicDependency { chain: String },
}

/// Result type alias for mo operations
pub type Result<T> = std::result::Result<T, MoError>;

//! Events emitted by the runner
//!
//! The runner never prints anything itself. Every observable step of a
//! run is described by an [`Event`] and handed to a frontend over an
//! unbounded channel, so execution never waits on presentation.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::project::{Step, Task};

/// Sending half of the event stream
pub type EventSender = mpsc::UnboundedSender<Event>;

/// Receiving half of the event stream
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

/// Broad classification of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Lifecycle and progress signals
    Other,
    /// Content meant for the user
    Output,
    /// Failure conditions
    Error,
}

/// Which output stream of a command a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pipe {
    Stdout,
    Stderr,
}

impl fmt::Display for Pipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pipe::Stdout => f.write_str("stdout"),
            Pipe::Stderr => f.write_str("stderr"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "name", content = "args")]
pub enum Event {
    InvalidMofile {
        filename: String,
        message: String,
    },
    UndefinedVariable {
        variable: String,
    },
    UnknownStepType {
        step: Step,
    },
    FindingTask {
        name: String,
    },
    StartingTask {
        task: Task,
    },
    RunningTask {
        task: Task,
    },
    SkippingTask {
        name: String,
    },
    RunningStep {
        step: Step,
    },
    FinishedTask {
        task: Task,
    },
    Help {
        tasks: IndexMap<String, Task>,
    },
    HelpOutput {
        output: String,
    },
    CommandOutput {
        pipe: Pipe,
        output: String,
    },
    CommandFailed {
        command: String,
        code: i32,
        description: Option<String>,
    },
    RunningCommand {
        command: String,
        argv: Vec<String>,
    },
    SpawnFailed {
        command: String,
        message: String,
    },
    TaskNotFound {
        name: String,
        similarities: Vec<String>,
    },
    CyclicDependency {
        chain: Vec<String>,
    },
}

impl Event {
    /// The event's tag, as used on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Event::InvalidMofile { .. } => "InvalidMofile",
            Event::UndefinedVariable { .. } => "UndefinedVariable",
            Event::UnknownStepType { .. } => "UnknownStepType",
            Event::FindingTask { .. } => "FindingTask",
            Event::StartingTask { .. } => "StartingTask",
            Event::RunningTask { .. } => "RunningTask",
            Event::SkippingTask { .. } => "SkippingTask",
            Event::RunningStep { .. } => "RunningStep",
            Event::FinishedTask { .. } => "FinishedTask",
            Event::Help { .. } => "Help",
            Event::HelpOutput { .. } => "HelpOutput",
            Event::CommandOutput { .. } => "CommandOutput",
            Event::CommandFailed { .. } => "CommandFailed",
            Event::RunningCommand { .. } => "RunningCommand",
            Event::SpawnFailed { .. } => "SpawnFailed",
            Event::TaskNotFound { .. } => "TaskNotFound",
            Event::CyclicDependency { .. } => "CyclicDependency",
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Event::InvalidMofile { .. }
            | Event::UndefinedVariable { .. }
            | Event::UnknownStepType { .. }
            | Event::CommandFailed { .. }
            | Event::SpawnFailed { .. }
            | Event::TaskNotFound { .. }
            | Event::CyclicDependency { .. } => EventKind::Error,
            Event::Help { .. } | Event::HelpOutput { .. } | Event::CommandOutput { .. } => {
                EventKind::Output
            }
            Event::FindingTask { .. }
            | Event::StartingTask { .. }
            | Event::RunningTask { .. }
            | Event::SkippingTask { .. }
            | Event::RunningStep { .. }
            | Event::FinishedTask { .. }
            | Event::RunningCommand { .. } => EventKind::Other,
        }
    }

    /// Build a failure event with a hint for well-known exit codes
    pub fn command_failed(command: &str, argv: &[String], code: i32) -> Self {
        Event::CommandFailed {
            command: command.to_string(),
            code,
            description: failure_hint(code, argv.first().map(String::as_str)),
        }
    }
}

/// Short human hint for a well-known exit code
pub fn failure_hint(code: i32, program: Option<&str>) -> Option<String> {
    match code {
        1 => Some("Details on how the command failed should be available above.".to_string()),
        126 => Some(
            "The command was found but could not be executed.\nCheck its permissions.".to_string(),
        ),
        127 => Some(match program {
            Some(program) => format!(
                "The command cannot be found.\nPerhaps installing {} would help.",
                program
            ),
            None => "The command cannot be found.".to_string(),
        }),
        130 => Some("The command was interrupted.".to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kinds() {
        let output = Event::CommandOutput {
            pipe: Pipe::Stderr,
            output: "oops".to_string(),
        };
        assert_eq!(output.kind(), EventKind::Output);
        assert_eq!(
            Event::SkippingTask { name: "a".into() }.kind(),
            EventKind::Other
        );
        assert_eq!(
            Event::UndefinedVariable { variable: "v".into() }.kind(),
            EventKind::Error
        );
    }

    #[test]
    fn test_wire_format() {
        let event = Event::CommandOutput {
            pipe: Pipe::Stdout,
            output: "hello".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"name": "CommandOutput", "args": {"pipe": "stdout", "output": "hello"}})
        );
        assert_eq!(value["name"], event.name());
    }

    #[test]
    fn test_command_not_found_hint() {
        let argv = vec!["frobnicate".to_string(), "--all".to_string()];
        let event = Event::command_failed("frobnicate --all", &argv, 127);

        match event {
            Event::CommandFailed { code, description, .. } => {
                assert_eq!(code, 127);
                let description = description.unwrap();
                assert!(description.contains("cannot be found"));
                assert!(description.contains("installing frobnicate"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_code_has_no_hint() {
        assert_eq!(failure_hint(42, None), None);
        assert!(failure_hint(1, None).is_some());
    }
}

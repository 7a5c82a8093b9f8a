//! Project model: tasks, variables and steps
//!
//! A [`Project`] is built once per invocation from the parsed task file,
//! which arrives as a plain ordered mapping. Loading validates every task
//! and variable, fills in well-known default descriptions and appends the
//! synthetic `help` task.

use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{InvalidProjectError, NoSuchTaskError};
use crate::similarity;

/// Minimum similarity ratio for a task name to count as a near miss
pub const SIMILARITY_THRESHOLD: f64 = 0.75;

/// Name of the synthetic task injected into every project
pub const HELP_TASK: &str = "help";

/// Descriptions for conventional task names that may omit their own
pub const DEFAULT_DESCRIPTIONS: &[(&str, &str)] = &[
    (
        "bootstrap",
        "Resolve all dependencies that an application requires to run.",
    ),
    ("test", "Run the tests."),
    (
        "ci",
        "Run the tests in an environment suitable for continous integration.",
    ),
    ("console", "Launch a console for the application."),
    ("server", "Launch the application server locally."),
    (
        "setup",
        "Setup the application for the first time after cloning.",
    ),
    (
        "update",
        "Update the application to run for its current checkout.",
    ),
    ("deploy", "Deploy the application to production."),
    (
        "lint",
        "Check the application for linting errors, this task is likely to be called by the test task.",
    ),
    ("release", "Make a new release of the software."),
    ("docs", "Generate the documentation."),
];

/// Look up the built-in description for a conventional task name
pub fn default_description(name: &str) -> Option<&'static str> {
    DEFAULT_DESCRIPTIONS
        .iter()
        .find(|(task, _)| *task == name)
        .map(|(_, description)| *description)
}

/// A named input to a task's command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    pub name: String,
    pub description: String,
    pub default: Option<String>,
}

/// One executable unit of a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Step {
    /// Render the template and run it through the shell
    Command { command: String },
    /// Render the template and emit it as output
    Print { text: String },
    /// Describe a task; `None` means use the `topic` variable
    Help { task: Option<String> },
    /// A step type this version doesn't know how to run
    Unknown { kind: String, args: String },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Command { command } => write!(f, "command: {}", command),
            Step::Print { text } => write!(f, "print: {}", text),
            Step::Help { task: Some(task) } => write!(f, "help: {}", task),
            Step::Help { task: None } => write!(f, "help"),
            Step::Unknown { kind, args } => write!(f, "{}: {}", kind, args),
        }
    }
}

/// A named, described unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub name: String,
    pub description: String,
    #[serde(serialize_with = "serialize_values")]
    pub variables: IndexMap<String, Variable>,
    pub steps: Vec<Step>,
    pub dependencies: Vec<String>,
}

impl Task {
    fn help() -> Self {
        let topic = Variable {
            name: "topic".to_string(),
            description: "Which task to get help about.".to_string(),
            default: None,
        };

        Self {
            name: HELP_TASK.to_string(),
            description: "Get help about a task.".to_string(),
            variables: IndexMap::from([(topic.name.clone(), topic)]),
            steps: vec![Step::Help { task: None }],
            dependencies: Vec::new(),
        }
    }
}

fn serialize_values<S>(variables: &IndexMap<String, Variable>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(variables.values())
}

/// All tasks and global variables loaded from one task file
#[derive(Debug, Clone)]
pub struct Project {
    pub name: String,
    /// Directory containing the task file; commands run here
    pub path: PathBuf,
    pub variables: IndexMap<String, Variable>,
    pub tasks: IndexMap<String, Task>,
}

impl Project {
    /// Build a project from a parsed task file and its directory
    pub fn from_config(config: &Value, path: impl Into<PathBuf>) -> Result<Self, InvalidProjectError> {
        let path = path.into();
        let empty = Map::new();
        let root = match config {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(InvalidProjectError::InvalidConfig {
                    message: format!("expected a mapping at the top level, found {}", kind_of(other)),
                })
            }
        };

        let name = match root.get("name") {
            Some(value) => scalar_string(value).ok_or_else(|| InvalidProjectError::InvalidConfig {
                message: "`name` must be a string".to_string(),
            })?,
            None => guess_name(&path),
        };

        let variables = load_variables(section(root, "variables")?).map_err(|(name, message)| {
            InvalidProjectError::InvalidVariable { name, message }
        })?;
        let tasks_config = section(root, "tasks")?;

        let mut tasks = IndexMap::with_capacity(tasks_config.len() + 1);
        for (task_name, task_config) in tasks_config {
            tasks.insert(task_name.clone(), load_task(task_name, task_config)?);
        }

        if tasks.is_empty() {
            return Err(InvalidProjectError::NoTasks);
        }

        tasks.insert(HELP_TASK.to_string(), Task::help());
        debug!(project = %name, tasks = tasks.len(), "loaded project");

        Ok(Self {
            name,
            path,
            variables,
            tasks,
        })
    }

    /// Find a task by name.
    ///
    /// Without an exact match, tasks whose names are at least
    /// [`SIMILARITY_THRESHOLD`] similar are collected. A single such
    /// candidate is returned as if it had been named exactly; otherwise
    /// the candidates are attached to the error as suggestions.
    pub fn find_task(&self, name: &str) -> Result<&Task, NoSuchTaskError> {
        if let Some(task) = self.tasks.get(name) {
            return Ok(task);
        }

        let similar: Vec<&Task> = self
            .tasks
            .values()
            .filter(|task| similarity::ratio(name, &task.name) >= SIMILARITY_THRESHOLD)
            .collect();

        if let [only] = similar[..] {
            debug!(requested = name, matched = %only.name, "using closest task name");
            return Ok(only);
        }

        Err(NoSuchTaskError {
            similarities: similar.into_iter().cloned().collect(),
        })
    }

    /// Number of tasks defined in the task file, excluding `help`
    pub fn user_task_count(&self) -> usize {
        self.tasks.keys().filter(|name| *name != HELP_TASK).count()
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.tasks.keys().map(String::as_str).collect();
        write!(f, "{} ({})", self.name, names.join(", "))
    }
}

fn guess_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// A top-level or task-level mapping section; absent and null are empty
fn section<'a>(map: &'a Map<String, Value>, key: &str) -> Result<&'a Map<String, Value>, InvalidProjectError> {
    static EMPTY: once_cell::sync::Lazy<Map<String, Value>> = once_cell::sync::Lazy::new(Map::new);

    match map.get(key) {
        None | Some(Value::Null) => Ok(&EMPTY),
        Some(Value::Object(section)) => Ok(section),
        Some(other) => Err(InvalidProjectError::InvalidConfig {
            message: format!("`{}` must be a mapping, found {}", key, kind_of(other)),
        }),
    }
}

fn load_variables(config: &Map<String, Value>) -> Result<IndexMap<String, Variable>, (String, String)> {
    let mut variables = IndexMap::with_capacity(config.len());

    for (name, value) in config {
        let fields = match value {
            Value::Object(fields) => fields,
            Value::Null => return Err((name.clone(), "missing a description.".to_string())),
            other => {
                return Err((
                    name.clone(),
                    format!("must be a mapping, found {}.", kind_of(other)),
                ))
            }
        };

        let description = match fields.get("description") {
            Some(value) => scalar_string(value)
                .ok_or_else(|| (name.clone(), "has a non-text description.".to_string()))?,
            None => return Err((name.clone(), "missing a description.".to_string())),
        };

        let default = match fields.get("default") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                scalar_string(value)
                    .ok_or_else(|| (name.clone(), "has a non-scalar default.".to_string()))?,
            ),
        };

        variables.insert(
            name.clone(),
            Variable {
                name: name.clone(),
                description,
                default,
            },
        );
    }

    Ok(variables)
}

fn load_task(name: &str, config: &Value) -> Result<Task, InvalidProjectError> {
    let invalid = |message: String| InvalidProjectError::InvalidTask {
        name: name.to_string(),
        message,
    };

    let empty = Map::new();
    let fields = match config {
        Value::Object(fields) => fields,
        Value::Null => &empty,
        other => return Err(invalid(format!("must be a mapping, found {}.", kind_of(other)))),
    };

    let description = match fields.get("description") {
        Some(Value::Null) | None => default_description(name)
            .map(str::to_string)
            .ok_or_else(|| invalid("missing a description.".to_string()))?,
        Some(value) => scalar_string(value)
            .ok_or_else(|| invalid("has a non-text description.".to_string()))?,
    };

    let variables_config = match fields.get("variables") {
        None | Some(Value::Null) => &empty,
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(invalid(format!(
                "has invalid variables: expected a mapping, found {}.",
                kind_of(other)
            )))
        }
    };
    let variables = load_variables(variables_config).map_err(|(variable, message)| {
        invalid(format!("has invalid variables: {} {}", variable, message))
    })?;

    let steps = match fields.get("command") {
        None | Some(Value::Null) => Vec::new(),
        Some(command) => load_steps(command).map_err(invalid)?,
    };
    if steps.is_empty() {
        return Err(invalid("missing a command.".to_string()));
    }

    let dependencies = match fields.get("after").or_else(|| fields.get("dependencies")) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(single)) => vec![single.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| invalid("has a non-text dependency.".to_string()))
            })
            .collect::<Result<_, _>>()?,
        Some(other) => {
            return Err(invalid(format!(
                "has invalid dependencies: expected a list, found {}.",
                kind_of(other)
            )))
        }
    };

    Ok(Task {
        name: name.to_string(),
        description,
        variables,
        steps,
        dependencies,
    })
}

/// A command is one template string or a list of step entries
fn load_steps(command: &Value) -> Result<Vec<Step>, String> {
    match command {
        Value::String(template) if template.is_empty() => Ok(Vec::new()),
        Value::String(template) => Ok(vec![Step::Command {
            command: template.clone(),
        }]),
        Value::Array(entries) => entries.iter().map(load_step).collect(),
        other => Err(format!(
            "has an invalid command: expected text or a list, found {}.",
            kind_of(other)
        )),
    }
}

fn load_step(entry: &Value) -> Result<Step, String> {
    let fields = match entry {
        Value::String(command) => {
            return Ok(Step::Command {
                command: command.clone(),
            })
        }
        Value::Object(fields) if fields.len() == 1 => fields,
        other => {
            return Err(format!(
                "has an invalid step: expected text or a single-key mapping, found {}.",
                kind_of(other)
            ))
        }
    };

    let Some((kind, args)) = fields.iter().next() else {
        return Err("has an empty step.".to_string());
    };
    let text = || {
        scalar_string(args).ok_or_else(|| format!("has a `{}` step without text.", kind))
    };

    Ok(match kind.as_str() {
        "command" => Step::Command { command: text()? },
        "print" => Step::Print { text: text()? },
        "help" => Step::Help {
            task: scalar_string(args).filter(|task| !task.is_empty()),
        },
        _ => Step::Unknown {
            kind: kind.clone(),
            args: scalar_string(args).unwrap_or_else(|| args.to_string()),
        },
    })
}

/// Text form of a scalar; YAML happily types `8000` or `yes` as non-strings
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "nothing",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "text",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn load(config: Value) -> Result<Project, InvalidProjectError> {
        Project::from_config(&config, "/projects/demo")
    }

    fn sample() -> Project {
        load(json!({
            "variables": {
                "env": {"description": "Target environment", "default": "dev"}
            },
            "tasks": {
                "test": {"command": "cargo test"},
                "build": {
                    "description": "Build it",
                    "command": "cargo build --profile {profile}",
                    "after": ["test"],
                    "variables": {
                        "profile": {"description": "Cargo profile", "default": "release"}
                    }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_load_project() {
        let project = sample();

        assert_eq!(project.name, "demo");
        assert_eq!(project.path, PathBuf::from("/projects/demo"));
        assert_eq!(project.variables["env"].default.as_deref(), Some("dev"));

        let build = &project.tasks["build"];
        assert_eq!(build.description, "Build it");
        assert_eq!(build.dependencies, vec!["test"]);
        assert_eq!(
            build.steps,
            vec![Step::Command { command: "cargo build --profile {profile}".to_string() }]
        );
        assert_eq!(build.variables["profile"].default.as_deref(), Some("release"));
    }

    #[test]
    fn test_display_lists_tasks() {
        let project = load(json!({"name": "mo", "tasks": {"lint": {"command": "true"}}})).unwrap();
        assert_eq!(project.to_string(), "mo (lint, help)");
    }

    #[test]
    fn test_explicit_name() {
        let project = load(json!({"name": "mo", "tasks": {"test": {"command": "true"}}})).unwrap();
        assert_eq!(project.name, "mo");
    }

    #[test]
    fn test_default_description() {
        let project = sample();
        assert_eq!(project.tasks["test"].description, "Run the tests.");
    }

    #[test]
    fn test_help_task_is_appended() {
        let project = sample();

        assert_eq!(project.tasks.len(), project.user_task_count() + 1);
        assert_eq!(project.tasks.keys().last().map(String::as_str), Some(HELP_TASK));

        let help = &project.tasks[HELP_TASK];
        assert_eq!(help.description, "Get help about a task.");
        assert!(help.variables["topic"].default.is_none());
        assert!(!help.steps.iter().any(|step| matches!(step, Step::Command { .. })));
        assert!(help.dependencies.is_empty());
    }

    #[test]
    fn test_no_tasks() {
        assert_eq!(load(json!({"tasks": {}})).unwrap_err(), InvalidProjectError::NoTasks);
        assert_eq!(load(json!({})).unwrap_err(), InvalidProjectError::NoTasks);
        assert_eq!(load(Value::Null).unwrap_err(), InvalidProjectError::NoTasks);
    }

    #[test]
    fn test_task_missing_description() {
        let err = load(json!({"tasks": {"frobnicate": {"command": "true"}}})).unwrap_err();
        assert_eq!(err.to_string(), "frobnicate missing a description.");
    }

    #[test]
    fn test_task_non_text_description() {
        let err = load(json!({"tasks": {"test": {
            "description": ["not", "text"],
            "command": "true"
        }}}))
        .unwrap_err();
        assert_eq!(err.to_string(), "test has a non-text description.");
    }

    #[test]
    fn test_task_missing_command() {
        let err = load(json!({"tasks": {"test": {"description": "Test"}}})).unwrap_err();
        assert_eq!(
            err,
            InvalidProjectError::InvalidTask {
                name: "test".to_string(),
                message: "missing a command.".to_string()
            }
        );

        let err = load(json!({"tasks": {"test": {"command": []}}})).unwrap_err();
        assert!(matches!(err, InvalidProjectError::InvalidTask { .. }));
    }

    #[test]
    fn test_variable_missing_description() {
        let err = load(json!({
            "variables": {"env": {"default": "dev"}},
            "tasks": {"test": {"command": "true"}}
        }))
        .unwrap_err();
        assert_eq!(
            err,
            InvalidProjectError::InvalidVariable {
                name: "env".to_string(),
                message: "missing a description.".to_string()
            }
        );
    }

    #[test]
    fn test_task_variable_missing_description() {
        let err = load(json!({
            "tasks": {"test": {"command": "true", "variables": {"v": {}}}}
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "test has invalid variables: v missing a description.");
    }

    #[test]
    fn test_non_string_scalars_become_text() {
        let project = load(json!({
            "tasks": {"server": {"command": "serve {port}", "variables": {
                "port": {"description": "Port", "default": 8000}
            }}}
        }))
        .unwrap();
        assert_eq!(project.tasks["server"].variables["port"].default.as_deref(), Some("8000"));
    }

    #[test]
    fn test_step_list() {
        let project = load(json!({
            "tasks": {"docs": {"command": [
                "mkdocs build",
                {"print": "built {env}"},
                {"help": "test"},
                {"brew": "mkdocs"}
            ]}, "test": {"command": "true"}}
        }))
        .unwrap();

        assert_eq!(
            project.tasks["docs"].steps,
            vec![
                Step::Command { command: "mkdocs build".to_string() },
                Step::Print { text: "built {env}".to_string() },
                Step::Help { task: Some("test".to_string()) },
                Step::Unknown { kind: "brew".to_string(), args: "mkdocs".to_string() },
            ]
        );
    }

    #[test]
    fn test_invalid_step() {
        let err = load(json!({
            "tasks": {"docs": {"command": [{"print": "a", "command": "b"}]}}
        }))
        .unwrap_err();
        assert!(err.to_string().starts_with("docs has an invalid step"));
    }

    #[test]
    fn test_top_level_must_be_mapping() {
        let err = load(json!(["test"])).unwrap_err();
        assert!(matches!(err, InvalidProjectError::InvalidConfig { .. }));
    }

    #[test]
    fn test_find_task_exact() {
        let project = sample();
        assert_eq!(project.find_task("build").unwrap().name, "build");
    }

    #[test]
    fn test_find_task_single_similar_match() {
        let project = sample();
        assert_eq!(project.find_task("tets").unwrap().name, "test");
    }

    #[test]
    fn test_find_task_no_match() {
        let project = sample();
        let err = project.find_task("xyz").unwrap_err();
        assert!(err.similarities.is_empty());
    }

    #[test]
    fn test_find_task_ambiguous() {
        let project = load(json!({
            "tasks": {
                "lint": {"command": "true"},
                "link": {"description": "Link", "command": "true"}
            }
        }))
        .unwrap();

        let err = project.find_task("lin").unwrap_err();
        let names: Vec<_> = err.similarities.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["lint", "link"]);
    }

    #[test]
    fn test_task_serialises_with_variable_list() {
        let project = sample();
        let value = serde_json::to_value(&project.tasks["build"]).unwrap();

        assert_eq!(value["name"], "build");
        assert_eq!(value["description"], "Build it");
        assert_eq!(value["variables"][0]["name"], "profile");
        assert_eq!(value["steps"][0]["type"], "command");
        assert_eq!(value["dependencies"], json!(["test"]));
    }
}

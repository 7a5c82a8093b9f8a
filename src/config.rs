//! Task file discovery and parsing
//!
//! Task files may be written in YAML, TOML or JSON. Whatever the format,
//! the contents are parsed into one ordered [`serde_json::Value`] tree that
//! [`Project::from_config`] validates.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{MoError, Result};
use crate::project::Project;

/// Task file names to search for, in order of preference
pub const TASK_FILES: &[&str] = &["Mofile", "mo.yaml", "mo.yml", "mo.toml", "mo.json"];

/// Serialisation format of a task file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Toml,
    Json,
}

impl Format {
    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "yaml" | "yml" => Some(Format::Yaml),
            "toml" => Some(Format::Toml),
            "json" => Some(Format::Json),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Format::Yaml => "YAML",
            Format::Toml => "TOML",
            Format::Json => "JSON",
        }
    }

    /// Parse `content` into a plain value tree
    pub fn parse(self, content: &str) -> std::result::Result<Value, String> {
        match self {
            Format::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            Format::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            Format::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        }
    }
}

/// Load the project from the given task file, or search for one
pub fn load(path: Option<&Path>) -> Result<(Project, PathBuf)> {
    let path = locate(path)?;
    let config = read(&path)?;

    let base = path.canonicalize()?;
    let base = base.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();

    let project = Project::from_config(&config, base)?;
    info!(project = %project, path = %path.display(), "loaded task file");

    Ok((project, path))
}

/// Resolve the task file path: an explicit one must exist, otherwise the
/// current directory and its ancestors are searched
pub fn locate(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(p) if p.is_file() => Ok(p.to_path_buf()),
        Some(p) => Err(MoError::ConfigNotFound {
            searched: vec![p.to_path_buf()],
        }),
        None => find_task_file_from(std::env::current_dir()?),
    }
}

/// Search `start` and then each parent directory for a task file
pub fn find_task_file_from(start: PathBuf) -> Result<PathBuf> {
    let mut current = start;
    let mut searched = Vec::new();

    loop {
        for name in TASK_FILES {
            let candidate = current.join(name);
            if candidate.is_file() {
                debug!(path = %candidate.display(), "found task file");
                return Ok(candidate);
            }
            searched.push(candidate);
        }

        if !current.pop() {
            break;
        }
    }

    Err(MoError::ConfigNotFound { searched })
}

/// Read and parse a task file, detecting its format
pub fn read(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    parse(&content, Format::from_path(path)).map_err(|(format, message)| MoError::ConfigParse {
        path: path.to_path_buf(),
        format: format.name(),
        message,
    })
}

/// Parse task file contents.
///
/// Without a known format, content that opens with `{` is JSON; anything
/// else is tried as YAML and then as TOML.
pub fn parse(content: &str, format: Option<Format>) -> std::result::Result<Value, (Format, String)> {
    if let Some(format) = format {
        return format.parse(content).map_err(|e| (format, e));
    }

    if content.trim_start().starts_with('{') {
        return Format::Json.parse(content).map_err(|e| (Format::Json, e));
    }

    let yaml = Format::Yaml.parse(content);
    if let Ok(value @ (Value::Object(_) | Value::Null)) = &yaml {
        return Ok(value.clone());
    }

    match Format::Toml.parse(content) {
        Ok(value) => {
            debug!("task file parsed as TOML");
            Ok(value)
        }
        Err(_) => yaml.map_err(|e| (Format::Yaml, e)),
    }
}

//! CLI argument definitions
//!
//! Uses `clap` derive API for argument parsing.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use indexmap::IndexMap;

use crate::frontend::{self, Frontend};
use crate::variables::parse_assignment;

/// mo - run the tasks of a project
#[derive(Parser, Debug)]
#[command(name = "mo")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the task file (searched for from the current directory if omitted)
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Set variables, e.g. `-v port=8000 env=prod` (repeatable; end the list with `--`)
    #[arg(
        short = 'v',
        long = "var",
        value_name = "NAME=VALUE",
        value_parser = parse_assignment,
        num_args = 1..,
        action = ArgAction::Append
    )]
    pub variables: Vec<(String, String)>,

    /// How to present the output
    #[arg(short = 'i', long, value_enum, default_value_t = FrontendKind::Human)]
    pub frontend: FrontendKind,

    /// Log internal diagnostics to stderr
    #[arg(long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Tasks to run; lists the available tasks when empty
    pub tasks: Vec<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrontendKind {
    #[default]
    Human,
    Debug,
    Json,
}

impl FrontendKind {
    /// Build a frontend writing to stdout
    pub fn build(self) -> Box<dyn Frontend> {
        match self {
            FrontendKind::Human => Box::new(frontend::Human::new()),
            FrontendKind::Debug => Box::new(frontend::Debug::new()),
            FrontendKind::Json => Box::new(frontend::Json::new()),
        }
    }
}

impl Cli {
    /// Variable overrides; a later `-v` for the same name wins
    pub fn overrides(&self) -> IndexMap<String, String> {
        self.variables.iter().cloned().collect()
    }
}

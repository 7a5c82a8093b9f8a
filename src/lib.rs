//! mo - a project task runner
//!
//! This crate provides both the `mo` CLI and a library for running tasks
//! described in a declarative task file.
//!
//! # Features
//!
//! - **YAML, TOML or JSON task files** - Detected automatically
//! - **Variables** - Defaults, per-task definitions and CLI overrides
//! - **Dependencies** - Depth-first, each task runs at most once
//! - **Live output** - stdout and stderr streamed line by line as they arrive
//! - **Pluggable frontends** - Human, debug or JSON-lines rendering of events
//!
//! # Example
//!
//! ```yaml
//! # Mofile
//! variables:
//!   env:
//!     description: Environment to deploy to
//!     default: staging
//!
//! tasks:
//!   test:
//!     command: cargo test
//!
//!   deploy:
//!     after: [test]
//!     command: ./deploy.sh {env}
//! ```
//!
//! # Library Usage
//!
//! ```rust,ignore
//! use mo::{config, Runner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (project, _) = config::load(None)?;
//!     let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//!
//!     let mut runner = Runner::new(project, Default::default(), tx);
//!     runner.queue_task("deploy");
//!     let summary = runner.run().await;
//!     drop(runner);
//!
//!     while let Some(event) = rx.recv().await {
//!         println!("{:?}", event);
//!     }
//!     assert!(summary.is_success());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod frontend;
pub mod project;
pub mod runner;
pub mod similarity;
pub mod variables;

// Re-export main types
pub use error::{InvalidProjectError, MoError, Result, TaskError};
pub use events::{Event, EventKind, Pipe};
pub use frontend::Frontend;
pub use project::{Project, Step, Task, Variable};
pub use runner::{RunSummary, Runner};

//! Command-line interface for cryptol-eval.
//!
//! Provides the `run` command that evaluates a model against a task catalog
//! and the `tasks` command that inspects a catalog without running anything.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands, RunArgs, TasksArgs};

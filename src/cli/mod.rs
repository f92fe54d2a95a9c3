//! CLI module for dynloop - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;

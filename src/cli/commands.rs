//! CLI command definitions using clap.
//!
//! - run: drive the agent loop for one request
//! - search: query the tool registry once
//! - tools: print the built-in catalog

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// dynloop - a ReAct agent loop with registry-discovered tools
#[derive(Parser, Debug)]
#[command(name = "dynloop")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the agent on a request until it answers or runs out of turns
    Run {
        /// The user's request
        prompt: String,

        /// Write the final transcript as JSON to this path ("-" for stdout)
        #[arg(short, long)]
        transcript: Option<PathBuf>,

        /// Override the iteration budget
        #[arg(short = 'n', long)]
        max_iterations: Option<u32>,

        /// Override the model
        #[arg(short, long)]
        model: Option<String>,

        /// Override the registry base URL
        #[arg(short, long)]
        registry_url: Option<String>,
    },

    /// Search the tool registry and list what it finds
    Search {
        /// Natural-language description of the tool you need
        query: String,

        /// Override the registry base URL
        #[arg(short, long)]
        registry_url: Option<String>,
    },

    /// Print the built-in tool catalog as JSON
    Tools,
}

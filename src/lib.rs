//! dynloop - a ReAct agent loop with dynamic tool discovery
//!
//! A language model picks one tool at a time, sees the result, and repeats
//! until it calls `finish`. The tool set grows at runtime: searching the
//! remote registry installs newly discovered tools into the session catalog,
//! and calls to them are executed by the registry.

pub mod config;
pub mod domain;
pub mod error;
pub mod id;
pub mod llm;
pub mod registry;
pub mod runner;
pub mod tools;

pub use domain::{RunOutcome, RunState, Session, Transcript};
pub use error::{DynloopError, Result};
pub use runner::{AgentRunner, RunEvent, RunnerConfig};

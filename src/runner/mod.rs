//! Agent runner module - the ReAct control loop.
//!
//! This module provides:
//! - AgentRunner for driving one session turn by turn
//! - RunnerConfig for the iteration budget and model limits
//! - RunEvent progress notifications

mod agent_runner;

pub use agent_runner::{AgentRunner, DEFAULT_MAX_ITERATIONS, RunEvent, RunnerConfig};

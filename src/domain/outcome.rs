//! Run state and outcome types.

use serde::Serialize;

use crate::llm::Usage;

/// State of an agent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Still exchanging turns with the model
    Running,
    /// The finish tool ran
    Finished,
    /// Iteration budget spent without a finish call
    BudgetExhausted,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunState::Running)
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub state: RunState,
    /// Final answer, present when `state` is `Finished`
    pub answer: Option<String>,
    /// Turns performed
    pub iterations: u32,
    pub usage: Usage,
}

impl RunOutcome {
    pub fn finished(answer: impl Into<String>, iterations: u32, usage: Usage) -> Self {
        Self {
            state: RunState::Finished,
            answer: Some(answer.into()),
            iterations,
            usage,
        }
    }

    pub fn budget_exhausted(iterations: u32, usage: Usage) -> Self {
        Self {
            state: RunState::BudgetExhausted,
            answer: None,
            iterations,
            usage,
        }
    }
}

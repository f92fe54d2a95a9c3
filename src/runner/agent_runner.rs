//! Agent runner - drives the turn-by-turn exchange with the model.
//!
//! Each turn sends the whole transcript plus the current catalog snapshot,
//! appends the assistant reply, then dispatches its tool calls in order and
//! appends one observation per call. The run ends when the finish tool runs
//! or the iteration budget is spent.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use log::{debug, info, warn};

use crate::domain::{RunOutcome, RunState, Session};
use crate::error::{DynloopError, Result};
use crate::llm::{CompletionRequest, CompletionResponse, LlmClient, ToolChoice, Usage};
use crate::tools::{DispatchError, Dispatcher, ToolOutcome};

/// Default iteration budget
pub const DEFAULT_MAX_ITERATIONS: u32 = 20;

/// Configuration for the AgentRunner.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Turns allowed before the run ends as budget-exhausted
    pub max_iterations: u32,
    /// Maximum tokens per completion
    pub max_tokens: Option<u32>,
    /// Bound on each completion request; exceeding it aborts the run
    pub llm_timeout: Option<Duration>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_tokens: None,
            llm_timeout: None,
        }
    }
}

/// Progress notifications emitted while a run advances
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    TurnStarted { iteration: u32 },
    /// The model replied without calling a tool
    TextReply { content: String },
    ToolSelected { call_id: String, name: String, arguments: String },
    Observation { call_id: String, name: String, content: String, failed: bool },
    Finished { answer: String },
    BudgetExhausted { iterations: u32 },
}

/// Runs one session to completion.
pub struct AgentRunner<L>
where
    L: LlmClient + ?Sized,
{
    llm: Arc<L>,
    dispatcher: Arc<Dispatcher>,
    config: RunnerConfig,
    events: Option<UnboundedSender<RunEvent>>,
}

impl<L> AgentRunner<L>
where
    L: LlmClient + ?Sized,
{
    pub fn new(llm: Arc<L>, dispatcher: Arc<Dispatcher>) -> Self {
        Self::with_config(llm, dispatcher, RunnerConfig::default())
    }

    pub fn with_config(llm: Arc<L>, dispatcher: Arc<Dispatcher>, config: RunnerConfig) -> Self {
        Self {
            llm,
            dispatcher,
            config,
            events: None,
        }
    }

    /// Send progress events to `tx`
    pub fn with_events(mut self, tx: UnboundedSender<RunEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Run the session until the finish tool runs or the budget is spent.
    ///
    /// Per-call tool failures are recorded as observations and never end the
    /// run. Model failures, model timeouts, cancellation, and transcript
    /// invariant violations are returned as errors. A session that already
    /// reached a terminal state is rejected.
    pub async fn run(&self, session: &mut Session, cancel: &CancellationToken) -> Result<RunOutcome> {
        if session.state.is_terminal() {
            return Err(DynloopError::InvalidState(format!(
                "session {} already ended as {:?}",
                session.id, session.state
            )));
        }
        let run_id = session.id.clone();
        let mut usage = Usage::default();

        info!(
            "Run {} started: model={} max_iterations={}",
            run_id,
            self.llm.model(),
            self.config.max_iterations
        );

        for iteration in 1..=self.config.max_iterations {
            if cancel.is_cancelled() {
                return Err(DynloopError::Cancelled);
            }

            debug!("Run {} turn {} with {} tools", run_id, iteration, session.catalog.len());
            self.emit(RunEvent::TurnStarted { iteration });

            let mut request = CompletionRequest::new(session.transcript.messages().to_vec())
                .with_tools(session.catalog.snapshot())
                .with_tool_choice(ToolChoice::Required);
            if let Some(max_tokens) = self.config.max_tokens {
                request = request.with_max_tokens(max_tokens);
            }

            let response = self.complete(request, cancel).await?;
            usage.add(&response.usage);

            let truncated = response.stop_reason.is_truncated();
            if truncated {
                warn!("Run {} turn {}: reply cut off at the token limit", run_id, iteration);
            }

            let message = response.message;
            let calls = message.tool_calls.clone();
            let text = message.content.clone();
            session.transcript.push(message)?;

            if calls.is_empty() {
                warn!("Run {} turn {}: model replied without a tool call", run_id, iteration);
                self.emit(RunEvent::TextReply {
                    content: text.unwrap_or_default(),
                });
                continue;
            }

            for call in &calls {
                info!("Run {} turn {}: selected {} ({})", run_id, iteration, call.name, call.id);
                self.emit(RunEvent::ToolSelected {
                    call_id: call.id.clone(),
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                });

                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(DynloopError::Cancelled),
                    outcome = self.dispatcher.dispatch(call, &mut session.catalog) => outcome,
                };

                let mut content = outcome.observation_text();
                if truncated && matches!(outcome, ToolOutcome::Failed(DispatchError::ArgumentDecode { .. })) {
                    content.push_str(" The reply was cut off at the token limit; send shorter arguments.");
                }
                session
                    .transcript
                    .push_observation(call.id.clone(), call.name.clone(), content.clone())?;
                self.emit(RunEvent::Observation {
                    call_id: call.id.clone(),
                    name: call.name.clone(),
                    content,
                    failed: matches!(outcome, ToolOutcome::Failed(_)),
                });

                if let ToolOutcome::Finish(answer) = outcome {
                    info!("Run {} finished on turn {}", run_id, iteration);
                    session.state = RunState::Finished;
                    self.emit(RunEvent::Finished { answer: answer.clone() });
                    return Ok(RunOutcome::finished(answer, iteration, usage));
                }
            }
        }

        warn!("Run {} exhausted its budget of {} turns", run_id, self.config.max_iterations);
        session.state = RunState::BudgetExhausted;
        self.emit(RunEvent::BudgetExhausted {
            iterations: self.config.max_iterations,
        });
        Ok(RunOutcome::budget_exhausted(self.config.max_iterations, usage))
    }

    /// One completion request, bounded by the model timeout and cancellation
    async fn complete(&self, request: CompletionRequest, cancel: &CancellationToken) -> Result<CompletionResponse> {
        let completion = async {
            match self.config.llm_timeout {
                Some(limit) => match tokio::time::timeout(limit, self.llm.complete(request)).await {
                    Ok(result) => result.map_err(DynloopError::from),
                    Err(_) => Err(DynloopError::Timeout {
                        operation: "completion".to_string(),
                        timeout_ms: limit.as_millis() as u64,
                    }),
                },
                None => self.llm.complete(request).await.map_err(DynloopError::from),
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DynloopError::Cancelled),
            result = completion => result,
        }
    }

    fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

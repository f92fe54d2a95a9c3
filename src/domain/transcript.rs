//! Conversation transcript
//!
//! Append-only within a run. Every tool message must answer a call id emitted
//! by the most recent assistant message and not yet answered.

use serde::Serialize;

use crate::error::{DynloopError, Result};
use crate::llm::{Message, Role};

#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
    #[serde(skip)]
    pending: Vec<String>,
}

impl Transcript {
    /// Seed a transcript with a system prompt and the user's request
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system), Message::user(user)],
            pending: Vec::new(),
        }
    }

    /// Append a message, enforcing the back-reference invariant
    pub fn push(&mut self, message: Message) -> Result<()> {
        match message.role {
            Role::Assistant => {
                if !self.pending.is_empty() {
                    return Err(DynloopError::InvalidState(format!(
                        "assistant message while calls are unanswered: {}",
                        self.pending.join(", ")
                    )));
                }
                self.pending = message.tool_calls.iter().map(|c| c.id.clone()).collect();
            }
            Role::Tool => {
                let Some(call_id) = message.tool_call_id.as_deref() else {
                    return Err(DynloopError::InvalidState("tool message without a call id".to_string()));
                };
                let Some(pos) = self.pending.iter().position(|id| id == call_id) else {
                    return Err(DynloopError::InvalidState(format!(
                        "tool message answers unknown or already answered call '{}'",
                        call_id
                    )));
                };
                self.pending.remove(pos);
            }
            Role::System | Role::User => {}
        }

        self.messages.push(message);
        Ok(())
    }

    /// Append a tool observation for `call_id`
    pub fn push_observation(
        &mut self,
        call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<()> {
        self.push(Message::tool(call_id, name, content))
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Call ids of the latest assistant message not yet answered
    pub fn pending_calls(&self) -> &[String] {
        &self.pending
    }
}

//! Per-run session state

use crate::id::generate_run_id;
use crate::tools::ToolCatalog;

use super::outcome::RunState;
use super::transcript::Transcript;

/// State of one agent run, owned by the caller and lent to the runner
#[derive(Debug, Clone)]
pub struct Session {
    /// Run id for log correlation
    pub id: String,
    pub transcript: Transcript,
    pub catalog: ToolCatalog,
    /// `Running` until the runner ends the session
    pub state: RunState,
}

impl Session {
    pub fn new(system: impl Into<String>, user: impl Into<String>, catalog: ToolCatalog) -> Self {
        Self {
            id: generate_run_id(),
            transcript: Transcript::new(system, user),
            catalog,
            state: RunState::Running,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolDescriptor;

    #[test]
    fn test_new_session() {
        let catalog = ToolCatalog::new(vec![ToolDescriptor::new("finish", "done")]);
        let session = Session::new("system", "hello", catalog);

        assert_eq!(session.transcript.len(), 2);
        assert_eq!(session.catalog.len(), 1);
        assert!(session.id.contains('-'));
        assert_eq!(session.state, RunState::Running);
    }

    #[test]
    fn test_sessions_get_distinct_ids() {
        let a = Session::new("s", "u", ToolCatalog::default());
        let b = Session::new("s", "u", ToolCatalog::default());
        assert_ne!(a.id, b.id);
    }
}

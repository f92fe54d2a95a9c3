//! Domain types for dynloop
//!
//! - Transcript: the ordered conversation with its back-reference invariant
//! - Session: per-run state owned by the caller (transcript + tool catalog)
//! - RunOutcome: how a run ended

pub mod outcome;
pub mod session;
pub mod transcript;

pub use outcome::{RunOutcome, RunState};
pub use session::Session;
pub use transcript::Transcript;

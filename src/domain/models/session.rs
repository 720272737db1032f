use std::fmt;
use std::path;

use super::Conversation;
use super::ExecutionResult;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AbortReason {
    Api(String),
    Filesystem(String),
    Execution(String),
    IterationLimitExceeded,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AbortReason::Api(err) => return write!(f, "model request failed: {err}"),
            AbortReason::Filesystem(err) => return write!(f, "saving generated code failed: {err}"),
            AbortReason::Execution(err) => return write!(f, "running generated code failed: {err}"),
            AbortReason::IterationLimitExceeded => return write!(f, "too many iterations"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Generating,
    Executing,
    Retrying,
    Done,
    Aborted(AbortReason),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        return matches!(self, SessionState::Done | SessionState::Aborted(_));
    }
}

/// Everything one submitted prompt produced, from the first generation to the
/// terminal state.
#[derive(Clone, Debug)]
pub struct Session {
    pub user_prompt: String,
    pub conversation: Conversation,
    /// Repair attempts made so far. The initial generation is not one.
    pub iteration: usize,
    /// Completed model calls.
    pub generations: usize,
    pub artifacts: Vec<path::PathBuf>,
    pub last_result: Option<ExecutionResult>,
    pub state: SessionState,
}

impl Session {
    pub fn new(user_prompt: &str, system_prompt: &str) -> Session {
        return Session {
            user_prompt: user_prompt.to_string(),
            conversation: Conversation::new(system_prompt),
            iteration: 0,
            generations: 0,
            artifacts: vec![],
            last_result: None,
            state: SessionState::Init,
        };
    }

    pub fn abort_reason(&self) -> Option<&AbortReason> {
        if let SessionState::Aborted(reason) = &self.state {
            return Some(reason);
        }

        return None;
    }
}

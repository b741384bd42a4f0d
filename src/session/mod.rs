// Persistent agent session management

mod agent_session;
pub mod oneshot;

pub use agent_session::AgentSession;
pub use oneshot::{run_one_shot, OneShotResult};

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::agents::{Agent, CliPattern};

/// An agent's response to one prompt.
#[derive(Debug, Clone, Default)]
pub struct Response {
    /// The agent's output, after parsing
    pub output: String,
    /// Context usage as 0.0-1.0
    pub context_usage: f64,
}

/// Errors from session and one-shot subprocess operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session already started")]
    AlreadyStarted,

    #[error("session not started")]
    NotStarted,

    #[error("session not alive")]
    Dead,

    #[error("AGENTS.md not found at {}", path.display())]
    AgentsFileMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start agent: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("failed to send prompt: {0}")]
    SendFailed(#[source] std::io::Error),

    #[error("agent process failed: {0}")]
    ProcessFailed(#[source] std::io::Error),

    #[error("agent {0} is not authenticated")]
    NotAuthenticated(String),

    #[error("agent exited with code {0}")]
    AgentExited(i32),

    #[error("operation cancelled")]
    Cancelled,
}

/// A persistent conversation with one AI agent.
///
/// Query operations are safe to call concurrently; callers run one `send`
/// at a time per session.
#[async_trait]
pub trait Session: Send + Sync {
    /// Starts the agent process with the path to AGENTS.md as its first
    /// instruction.
    async fn start(
        &self,
        token: &CancellationToken,
        agents_path: &Path,
    ) -> Result<(), SessionError>;

    /// Sends a prompt and returns whatever output the readers have
    /// accumulated at the moment of the call. There is no completion
    /// marker; callers that need turn boundaries poll.
    async fn send(&self, token: &CancellationToken, prompt: &str)
        -> Result<Response, SessionError>;

    /// Current context usage (0.0 to 1.0).
    fn context_usage(&self) -> f64;

    /// Whether the session process is still active.
    fn is_alive(&self) -> bool;

    /// The underlying agent for this session.
    fn agent(&self) -> &Agent;

    /// Terminates the session. Idempotent.
    async fn close(&self) -> Result<(), SessionError>;
}

/// Creates sessions and advises on session recycling.
pub struct SessionManager;

impl SessionManager {
    pub fn new() -> Self {
        Self
    }

    /// Creates a new session for the given agent. Unauthenticated agents
    /// are refused; a session for them could only fail at first use.
    pub fn create_session(&self, agent: Agent) -> Result<AgentSession, SessionError> {
        if !agent.authenticated {
            return Err(SessionError::NotAuthenticated(agent.name));
        }
        Ok(AgentSession::new(agent))
    }

    /// Returns true if the session's context usage exceeds the threshold,
    /// meaning a caller should cycle it before it saturates.
    pub fn should_respawn(&self, session: &dyn Session, threshold: f64) -> bool {
        session.context_usage() > threshold
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the argument vector for driving an agent with a prompt:
/// non-interactive flags, the prompt itself, then JSON output and
/// skip-approval flags. Shared by sessions and one-shot runs.
pub(crate) fn build_invocation_args(pattern: &CliPattern, prompt: &str) -> Vec<String> {
    let mut args: Vec<String> = pattern
        .non_interactive_args
        .iter()
        .map(|s| s.to_string())
        .collect();

    args.push(prompt.to_string());
    args.extend(pattern.json_output_args.iter().map(|s| s.to_string()));
    args.extend(pattern.skip_approvals_args.iter().map(|s| s.to_string()));
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{parser_for, pattern_for};

    fn test_agent(name: &str, authenticated: bool) -> Agent {
        Agent {
            name: name.to_string(),
            path: PathBuf::from(format!("/usr/local/bin/{}", name)),
            authenticated,
            version: "1.0".to_string(),
            pattern: pattern_for("claude").unwrap().clone(),
            parser: parser_for(name),
        }
    }

    #[test]
    fn test_build_invocation_args_order() {
        let pattern = pattern_for("claude").unwrap();
        let args = build_invocation_args(pattern, "do the thing");

        assert_eq!(
            args,
            vec![
                "-p",
                "do the thing",
                "--output-format",
                "stream-json",
                "--verbose",
                "--dangerously-skip-permissions",
            ]
        );
    }

    #[test]
    fn test_build_invocation_args_empty_sections_omitted() {
        // Gemini has no non-interactive args, auggie has no skip-approvals
        let gemini = pattern_for("gemini").unwrap();
        let args = build_invocation_args(gemini, "prompt");
        assert_eq!(args[0], "prompt");

        let auggie = pattern_for("auggie").unwrap();
        let args = build_invocation_args(auggie, "prompt");
        assert_eq!(args.last().map(String::as_str), Some("json"));
    }

    #[test]
    fn test_create_session_refuses_unauthenticated() {
        let manager = SessionManager::new();
        let err = manager
            .create_session(test_agent("claude", false))
            .err()
            .expect("expected error");
        assert!(matches!(err, SessionError::NotAuthenticated(name) if name == "claude"));
    }

    #[test]
    fn test_create_session_for_authenticated_agent() {
        let manager = SessionManager::new();
        let session = manager.create_session(test_agent("claude", true)).unwrap();
        assert!(!session.is_alive());
        assert_eq!(session.agent().name, "claude");
    }

    #[test]
    fn test_should_respawn_threshold() {
        let manager = SessionManager::new();
        let session = manager.create_session(test_agent("claude", true)).unwrap();

        // Fresh session has zero usage
        assert!(!manager.should_respawn(&session, 0.5));
        assert!(manager.should_respawn(&session, -0.1));
    }
}

// Parallel dispatch: fan one prompt out to many sessions at once
//
// The counterpart to the orchestrator's sequential rounds: every session
// gets the same prompt simultaneously and no turn sees another's tracker
// effects. Results come back in a deterministic order (sorted by agent
// name) regardless of completion order.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::agents::Agent;
use crate::session::{Response, Session, SessionError};

/// The outcome of dispatching to a single agent.
#[derive(Debug)]
pub struct DispatchResult {
    /// The agent that was dispatched to
    pub agent: Agent,
    /// The agent's response
    pub response: Response,
    /// Error if the dispatch failed
    pub error: Option<SessionError>,
}

/// Sends a prompt to every session concurrently and collects the results.
///
/// One result per session, always: a session's failure or cancellation is
/// recorded in its own result and never aborts its peers. Cancellation is
/// propagated into each in-flight send, so a cancelled dispatch returns
/// near the cancellation instant rather than waiting out slow agents.
pub async fn dispatch(
    token: &CancellationToken,
    sessions: &[Arc<dyn Session>],
    prompt: &str,
) -> Vec<DispatchResult> {
    if sessions.is_empty() {
        return Vec::new();
    }

    let mut handles = Vec::with_capacity(sessions.len());
    for session in sessions {
        let session = Arc::clone(session);
        let token = token.clone();
        let prompt = prompt.to_string();

        handles.push(tokio::spawn(async move {
            let agent = session.agent().clone();
            match session.send(&token, &prompt).await {
                Ok(response) => DispatchResult {
                    agent,
                    response,
                    error: None,
                },
                Err(e) => DispatchResult {
                    agent,
                    response: Response::default(),
                    error: Some(e),
                },
            }
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        // Task panics are unreachable through the Session contract; a
        // panicked task simply contributes no result
        if let Ok(result) = handle.await {
            results.push(result);
        }
    }

    // Deterministic output order
    results.sort_by(|a, b| a.agent.name.cmp(&b.agent.name));
    results
}

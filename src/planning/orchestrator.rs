// Round orchestration: sequential agent turns over shared beads state
//
// Agents run one at a time so each sees the tracker effects of its
// predecessors in the same round. The dispatcher is the parallel
// alternative for turns that must not see each other's effects.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tokio_util::sync::CancellationToken;

use crate::agents::Agent;
use crate::beads::BeadsClient;
use crate::planning::context::{ContextBuilder, PlanningContext};
use crate::session::{Response, Session, SessionError, SessionManager};

const NO_CHANGES: &str = "(no changes)";

/// Matches bead ids in `bd list --json` snapshot lines. The payload is
/// otherwise treated as opaque.
static BEAD_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""id"\s*:\s*"([^"]+)""#).unwrap());

/// Receives progress updates during round execution.
pub trait ProgressReporter: Send + Sync {
    /// Called when an agent begins its turn. Indices are 1-based.
    fn on_agent_start(&self, round: u32, agent_index: usize, total_agents: usize, agent: &Agent);

    /// Called when an agent finishes its turn, with a line-level diff of
    /// the beads snapshot around the turn.
    fn on_agent_complete(
        &self,
        round: u32,
        agent_index: usize,
        total_agents: usize,
        result: &AgentResult,
        beads_diff: &str,
    );
}

/// The outcome of a single agent's turn.
#[derive(Debug)]
pub struct AgentResult {
    /// The agent that ran
    pub agent: Agent,
    /// The agent's response
    pub response: Response,
    /// Ids of beads created or modified during the turn
    pub beads_changed: Vec<String>,
    /// Error if the turn failed
    pub error: Option<SessionError>,
    /// True if the agent was skipped (not authenticated)
    pub skipped: bool,
}

/// The outcome of a complete round.
#[derive(Debug, Default)]
pub struct RoundResult {
    /// Round number, 1-based
    pub round: u32,
    /// Results from each agent, in input order
    pub agent_results: Vec<AgentResult>,
    /// Total beads created or modified across the round
    pub total_changes: usize,
    /// Number of agents that failed
    pub failed_count: usize,
    /// Number of agents that were skipped
    pub skipped_count: usize,
}

/// Coordinates executing multiple agents in a round.
pub struct RoundOrchestrator {
    session_mgr: SessionManager,
    context_builder: ContextBuilder,
    beads: BeadsClient,
    progress: Option<Box<dyn ProgressReporter>>,
}

impl RoundOrchestrator {
    pub fn new(
        session_mgr: SessionManager,
        context_builder: ContextBuilder,
        beads: BeadsClient,
    ) -> Self {
        Self {
            session_mgr,
            context_builder,
            beads,
            progress: None,
        }
    }

    /// Enables progress reporting for verbose output.
    pub fn set_progress_reporter(&mut self, reporter: Box<dyn ProgressReporter>) {
        self.progress = Some(reporter);
    }

    /// Executes each agent in sequence. Each agent sees the beads state
    /// AFTER previous agents in the round; the beads snapshot is refreshed
    /// between turns and once more after the round.
    ///
    /// Per-agent failures are encoded in the result, never returned as an
    /// error. An error return is reserved for catastrophic faults.
    pub async fn run_round(
        &self,
        token: &CancellationToken,
        agents: &[Agent],
        plan_ctx: &mut PlanningContext,
    ) -> anyhow::Result<RoundResult> {
        let mut result = RoundResult {
            round: plan_ctx.round,
            agent_results: Vec::with_capacity(agents.len()),
            ..Default::default()
        };
        let total = agents.len();

        for (i, agent) in agents.iter().enumerate() {
            let mut agent_result = AgentResult {
                agent: agent.clone(),
                response: Response::default(),
                beads_changed: Vec::new(),
                error: None,
                skipped: false,
            };

            if !agent.authenticated {
                log::info!("[Orchestrator] Skipping unauthenticated agent {}", agent.name);
                agent_result.skipped = true;
                result.skipped_count += 1;
                self.report_complete(plan_ctx.round, i + 1, total, &agent_result, "");
                result.agent_results.push(agent_result);
                continue;
            }

            if let Some(reporter) = &self.progress {
                reporter.on_agent_start(plan_ctx.round, i + 1, total, agent);
            }

            // Snapshot before the turn for change detection
            let before = self.capture_snapshot().await;

            // Agents after the first re-read the tracker so they see
            // their predecessors' effects
            if i > 0 {
                self.context_builder.refresh_beads_state(plan_ctx).await;
            }

            let session = match self.session_mgr.create_session(agent.clone()) {
                Ok(session) => session,
                Err(e) => {
                    agent_result.error = Some(e);
                    result.failed_count += 1;
                    self.report_complete(plan_ctx.round, i + 1, total, &agent_result, "");
                    result.agent_results.push(agent_result);
                    continue;
                }
            };

            if let Err(e) = session
                .start(token, plan_ctx.agents_path.as_ref())
                .await
            {
                agent_result.error = Some(e);
                result.failed_count += 1;
                let _ = session.close().await;
                self.report_complete(plan_ctx.round, i + 1, total, &agent_result, "");
                result.agent_results.push(agent_result);
                continue;
            }

            let prompt = self.context_builder.format(plan_ctx);
            match session.send(token, &prompt).await {
                Ok(response) => {
                    agent_result.response = response;

                    let after = self.capture_snapshot().await;
                    let diff = diff_beads_state(&before, &after);
                    agent_result.beads_changed = extract_ids_from_diff(&diff);
                    result.total_changes += count_changes(&diff, &agent_result.beads_changed);

                    self.report_complete(plan_ctx.round, i + 1, total, &agent_result, &diff);
                    result.agent_results.push(agent_result);
                }
                Err(e) => {
                    log::warn!("[Orchestrator] Agent {} failed: {}", agent.name, e);
                    agent_result.error = Some(e);
                    result.failed_count += 1;

                    let after = self.capture_snapshot().await;
                    let diff = diff_beads_state(&before, &after);
                    self.report_complete(plan_ctx.round, i + 1, total, &agent_result, &diff);
                    result.agent_results.push(agent_result);
                }
            }

            let _ = session.close().await;
        }

        // Refresh once more so the next round starts with the latest state
        if !agents.is_empty() {
            self.context_builder.refresh_beads_state(plan_ctx).await;
        }

        Ok(result)
    }

    fn report_complete(
        &self,
        round: u32,
        agent_index: usize,
        total: usize,
        result: &AgentResult,
        diff: &str,
    ) {
        if let Some(reporter) = &self.progress {
            reporter.on_agent_complete(round, agent_index, total, result, diff);
        }
    }

    /// Captures the current tracker state via `bd list --json`. Failures
    /// degrade to an empty snapshot.
    async fn capture_snapshot(&self) -> String {
        match self.beads.list_json().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::debug!("[Orchestrator] Snapshot failed: {:#}", e);
                String::new()
            }
        }
    }
}

/// Computes a human-readable diff between two beads snapshots.
fn diff_beads_state(before: &str, after: &str) -> String {
    if before == after {
        return NO_CHANGES.to_string();
    }
    if before.is_empty() {
        return format!("(beads initialized)\n{}", after);
    }
    if after.is_empty() {
        return "(beads cleared)".to_string();
    }
    compute_line_diff(before, after)
}

/// Line-level symmetric difference: `- <line>` for removals, `+ <line>`
/// for additions.
fn compute_line_diff(before: &str, after: &str) -> String {
    let before_lines: Vec<&str> = before.lines().collect();
    let after_lines: Vec<&str> = after.lines().collect();

    let before_set: HashSet<&str> = before_lines.iter().copied().collect();
    let after_set: HashSet<&str> = after_lines.iter().copied().collect();

    let mut diff = String::new();
    for line in &before_lines {
        if !after_set.contains(line) && !line.is_empty() {
            diff.push_str("- ");
            diff.push_str(line);
            diff.push('\n');
        }
    }
    for line in &after_lines {
        if !before_set.contains(line) && !line.is_empty() {
            diff.push_str("+ ");
            diff.push_str(line);
            diff.push('\n');
        }
    }

    if diff.is_empty() {
        return "(whitespace changes only)".to_string();
    }
    diff
}

/// Pulls bead ids out of the changed snapshot lines, deduplicated in
/// order of appearance.
fn extract_ids_from_diff(diff: &str) -> Vec<String> {
    if diff == NO_CHANGES {
        return Vec::new();
    }

    let mut ids = Vec::new();
    for capture in BEAD_ID_REGEX.captures_iter(diff) {
        let id = capture[1].to_string();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// Number of changes a turn contributed. When the snapshot moved but no
/// id could be extracted, the turn still counts as one change so
/// convergence cannot fire on an active round.
fn count_changes(diff: &str, ids: &[String]) -> usize {
    if !ids.is_empty() {
        return ids.len();
    }
    if diff == NO_CHANGES {
        0
    } else {
        1
    }
}

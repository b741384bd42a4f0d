// Engine-level planning flow tests: real agent subprocesses (mock shell
// scripts), a scripted bd runner, rounds and convergence wired together
// the way the plan command wires them.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use volley::agents::{parser_for, pattern_for, Agent};
use volley::beads::{BeadsClient, CommandRunner};
use volley::planning::{ContextBuilder, ConvergenceDetector, RoundOrchestrator};
use volley::session::SessionManager;

/// bd stand-in that replays canned stdout per invocation.
struct ScriptedBd {
    responses: Mutex<Vec<Result<String, String>>>,
}

impl ScriptedBd {
    fn new(responses: Vec<Result<String, String>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses),
        })
    }

    /// Endless empty output; the tracker exists but holds nothing.
    fn empty() -> Arc<Self> {
        Self::new((0..100).map(|_| Ok(String::new())).collect())
    }
}

#[async_trait]
impl CommandRunner for ScriptedBd {
    async fn run(&self, _program: &str, _args: &[&str]) -> Result<String> {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Ok(String::new());
        }
        responses.remove(0).map_err(|e| anyhow!(e))
    }
}

fn mock_agent(dir: &Path, name: &str, script: &str, authenticated: bool) -> Agent {
    let path = dir.join(name);
    fs::write(&path, script).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }
    Agent {
        name: name.to_string(),
        path,
        authenticated,
        version: "mock".to_string(),
        pattern: pattern_for("claude").unwrap().clone(),
        parser: parser_for(name),
    }
}

fn agents_file(dir: &Path) -> String {
    let path = dir.join("AGENTS.md");
    fs::write(&path, "# Shared agent guidance\n").unwrap();
    path.to_str().unwrap().to_string()
}

const ECHO_AGENT: &str = "#!/bin/sh\nwhile read line; do echo ok; done\n";

#[tokio::test]
async fn test_three_rounds_with_stable_tracker_converge() {
    let tmp = tempfile::tempdir().unwrap();
    let agents = vec![
        mock_agent(tmp.path(), "claude", ECHO_AGENT, true),
        mock_agent(tmp.path(), "codex", ECHO_AGENT, true),
    ];

    let beads = BeadsClient::new(ScriptedBd::empty());
    let builder = ContextBuilder::new(beads.clone());
    let orchestrator =
        RoundOrchestrator::new(SessionManager::new(), ContextBuilder::new(beads.clone()), beads);

    let mut convergence = ConvergenceDetector::new();
    convergence.set_threshold(3);

    let token = CancellationToken::new();
    let mut plan_ctx = builder
        .build("stabilize the plan", &agents_file(tmp.path()), 1, true)
        .await;

    let mut converged_at = None;
    for round in 1..=5u32 {
        plan_ctx.round = round;
        plan_ctx.is_first_turn = round == 1;

        let result = orchestrator
            .run_round(&token, &agents, &mut plan_ctx)
            .await
            .unwrap();

        assert_eq!(result.round, round);
        assert_eq!(result.failed_count, 0);
        assert_eq!(result.total_changes, 0);

        if convergence.check_convergence(&result) {
            converged_at = Some(round);
            break;
        }
    }

    // An unchanging tracker converges exactly at the threshold
    assert_eq!(converged_at, Some(3));
}

#[tokio::test]
async fn test_round_with_unauthenticated_agent_still_converges() {
    let tmp = tempfile::tempdir().unwrap();
    let agents = vec![
        mock_agent(tmp.path(), "claude", ECHO_AGENT, true),
        mock_agent(tmp.path(), "codex", ECHO_AGENT, false),
        mock_agent(tmp.path(), "cursor-agent", ECHO_AGENT, true),
    ];

    let beads = BeadsClient::new(ScriptedBd::empty());
    let builder = ContextBuilder::new(beads.clone());
    let orchestrator =
        RoundOrchestrator::new(SessionManager::new(), ContextBuilder::new(beads.clone()), beads);

    let token = CancellationToken::new();
    let mut plan_ctx = builder
        .build("review", &agents_file(tmp.path()), 1, true)
        .await;

    let result = orchestrator
        .run_round(&token, &agents, &mut plan_ctx)
        .await
        .unwrap();

    assert_eq!(result.agent_results.len(), 3);
    assert!(result.agent_results[1].skipped);
    assert_eq!(result.skipped_count, 1);

    let mut convergence = ConvergenceDetector::new();
    assert!(convergence.check_convergence(&result));
}

#[tokio::test]
async fn test_tracker_changes_block_and_then_allow_convergence() {
    let tmp = tempfile::tempdir().unwrap();
    let agents = vec![mock_agent(tmp.path(), "claude", ECHO_AGENT, true)];

    // Round 1: the snapshot changes under the agent's turn.
    // Round 2: the tracker is stable.
    let before = "[\n  \"id\": \"vly-1\"\n]\n";
    let after = "[\n  \"id\": \"vly-1\"\n  \"id\": \"vly-2\"\n]\n";
    let beads = BeadsClient::new(ScriptedBd::new(vec![
        // round 1: snapshot before, snapshot after, final refresh (list)
        Ok(before.to_string()),
        Ok(after.to_string()),
        Ok(String::new()),
        // round 2: stable snapshots, final refresh
        Ok(after.to_string()),
        Ok(after.to_string()),
        Ok(String::new()),
    ]));

    let builder = ContextBuilder::new(beads.clone());
    let orchestrator =
        RoundOrchestrator::new(SessionManager::new(), ContextBuilder::new(beads.clone()), beads);
    let mut convergence = ConvergenceDetector::new();

    let token = CancellationToken::new();
    let mut plan_ctx = builder
        .build("extend the plan", &agents_file(tmp.path()), 1, true)
        .await;

    plan_ctx.round = 1;
    let round1 = orchestrator
        .run_round(&token, &agents, &mut plan_ctx)
        .await
        .unwrap();
    assert!(round1.total_changes > 0);
    assert_eq!(round1.agent_results[0].beads_changed, vec!["vly-2"]);
    assert!(!convergence.check_convergence(&round1));

    plan_ctx.round = 2;
    plan_ctx.is_first_turn = false;
    let round2 = orchestrator
        .run_round(&token, &agents, &mut plan_ctx)
        .await
        .unwrap();
    assert_eq!(round2.total_changes, 0);
    assert!(convergence.check_convergence(&round2));
}

#[tokio::test]
async fn test_missing_tracker_never_blocks_planning() {
    let tmp = tempfile::tempdir().unwrap();
    let agents = vec![mock_agent(tmp.path(), "claude", ECHO_AGENT, true)];

    // Every bd invocation fails, as if bd were not installed
    let beads = BeadsClient::new(ScriptedBd::new(
        (0..20).map(|_| Err("bd: command not found".to_string())).collect(),
    ));
    let builder = ContextBuilder::new(beads.clone());
    let orchestrator =
        RoundOrchestrator::new(SessionManager::new(), ContextBuilder::new(beads.clone()), beads);

    let token = CancellationToken::new();
    let mut plan_ctx = builder
        .build("plan without tracker", &agents_file(tmp.path()), 1, true)
        .await;

    assert!(plan_ctx.beads_state.contains("no beads state available"));

    let result = orchestrator
        .run_round(&token, &agents, &mut plan_ctx)
        .await
        .unwrap();

    assert_eq!(result.failed_count, 0);
    assert_eq!(result.agent_results.len(), 1);
}

#[tokio::test]
async fn test_dead_agent_binary_is_recorded_not_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let agents = vec![
        Agent {
            name: "amp".to_string(),
            path: PathBuf::from("/nonexistent/amp"),
            authenticated: true,
            version: String::new(),
            pattern: pattern_for("amp").unwrap().clone(),
            parser: parser_for("amp"),
        },
        mock_agent(tmp.path(), "claude", ECHO_AGENT, true),
    ];

    let beads = BeadsClient::new(ScriptedBd::empty());
    let builder = ContextBuilder::new(beads.clone());
    let orchestrator =
        RoundOrchestrator::new(SessionManager::new(), ContextBuilder::new(beads.clone()), beads);

    let token = CancellationToken::new();
    let mut plan_ctx = builder
        .build("resilience", &agents_file(tmp.path()), 1, true)
        .await;

    let result = orchestrator
        .run_round(&token, &agents, &mut plan_ctx)
        .await
        .unwrap();

    assert_eq!(result.failed_count, 1);
    assert!(result.agent_results[0].error.is_some());
    assert!(result.agent_results[1].error.is_none());
}

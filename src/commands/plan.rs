// The `plan` command: round-based multi-agent planning

use std::sync::Mutex;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;

use crate::agents::{Agent, Detector};
use crate::beads::BeadsClient;
use crate::notes::NotesSaver;
use crate::planning::orchestrator::{AgentResult, ProgressReporter};
use crate::planning::{ContextBuilder, ConvergenceDetector, RoundOrchestrator};
use crate::session::SessionManager;
use crate::utils::lock_mutex_recover;

/// Safety limit for --until-converged runs.
const MAX_CONVERGENCE_ROUNDS: u32 = 100;

#[derive(Args)]
pub struct PlanArgs {
    /// The planning prompt
    pub prompt: String,

    /// Number of planning rounds
    #[arg(short, long, default_value_t = 3)]
    pub rounds: u32,

    /// Path to the AGENTS.md file agents read first
    #[arg(short = 'a', long)]
    pub agents_path: String,

    /// Specific agents to use (default: all available)
    #[arg(long = "agents", value_delimiter = ',')]
    pub agents: Vec<String>,

    /// Run until all agents report no changes
    #[arg(long)]
    pub until_converged: bool,

    /// Save agent perspectives to the given bead id
    #[arg(long)]
    pub save: Option<String>,

    /// Show detailed progress with agent timing and beads diff
    #[arg(short, long)]
    pub verbose: bool,
}

/// ProgressReporter that prints agent timing and beads diffs.
struct TerminalProgressReporter {
    started: Mutex<Instant>,
}

impl TerminalProgressReporter {
    fn new() -> Self {
        Self {
            started: Mutex::new(Instant::now()),
        }
    }
}

impl ProgressReporter for TerminalProgressReporter {
    fn on_agent_start(&self, round: u32, agent_index: usize, total_agents: usize, agent: &Agent) {
        *lock_mutex_recover(&self.started) = Instant::now();
        println!(
            "\n  [Round {}] Agent {}/{}: {} - STARTED",
            round, agent_index, total_agents, agent.name
        );
    }

    fn on_agent_complete(
        &self,
        round: u32,
        agent_index: usize,
        total_agents: usize,
        result: &AgentResult,
        beads_diff: &str,
    ) {
        let elapsed = lock_mutex_recover(&self.started).elapsed();
        let status = match (&result.error, result.skipped) {
            (Some(e), _) => format!("FAILED: {}", e),
            (None, true) => "SKIPPED".to_string(),
            (None, false) => "COMPLETED".to_string(),
        };
        println!(
            "  [Round {}] Agent {}/{}: {} - {} ({:.1}s)",
            round,
            agent_index,
            total_agents,
            result.agent.name,
            status,
            elapsed.as_secs_f64()
        );

        if !beads_diff.is_empty() && beads_diff != "(no changes)" && !result.skipped {
            println!("  Beads diff:");
            for line in beads_diff.lines() {
                if !line.is_empty() {
                    println!("    {}", line);
                }
            }
        }
    }
}

pub async fn run(args: PlanArgs, token: CancellationToken) -> Result<()> {
    println!("Planning: {}", args.prompt);
    println!("Rounds: {}, Agents path: {}", args.rounds, args.agents_path);

    let detector = Detector::new();
    let mut agents = detector.detect_all();
    if !args.agents.is_empty() {
        agents.retain(|a| args.agents.contains(&a.name));
    }
    let auth_agents: Vec<Agent> = agents.into_iter().filter(|a| a.authenticated).collect();

    if auth_agents.is_empty() {
        println!("No authenticated agents available");
        return Ok(());
    }

    let names: Vec<&str> = auth_agents.iter().map(|a| a.name.as_str()).collect();
    println!("Using {} agent(s): {}", auth_agents.len(), names.join(", "));

    let beads = BeadsClient::system();
    let mut orchestrator = RoundOrchestrator::new(
        SessionManager::new(),
        ContextBuilder::new(beads.clone()),
        beads.clone(),
    );
    if args.verbose {
        orchestrator.set_progress_reporter(Box::new(TerminalProgressReporter::new()));
    }

    let mut convergence = ConvergenceDetector::new();

    let saver = args.save.as_deref().map(|bead_id| {
        println!("Saving perspectives to: {}", bead_id);
        NotesSaver::new(beads.clone())
    });

    let builder = ContextBuilder::new(beads);
    let mut plan_ctx = builder.build(&args.prompt, &args.agents_path, 1, true).await;

    let max_rounds = if args.until_converged {
        MAX_CONVERGENCE_ROUNDS
    } else {
        args.rounds
    };

    for round in 1..=max_rounds {
        if token.is_cancelled() {
            println!("\nCancelled.");
            break;
        }

        println!("\n=== Round {} ===", round);
        plan_ctx.round = round;
        plan_ctx.is_first_turn = round == 1;

        let result = orchestrator
            .run_round(&token, &auth_agents, &mut plan_ctx)
            .await
            .with_context(|| format!("round {} failed", round))?;

        println!(
            "Changes: {}, Failed: {}, Skipped: {}",
            result.total_changes, result.failed_count, result.skipped_count
        );

        if let (Some(saver), Some(bead_id)) = (&saver, args.save.as_deref()) {
            match saver.save_round_results(bead_id, &result).await {
                Ok(()) => println!("Saved round {} perspectives to {}", round, bead_id),
                Err(e) => println!("Warning: failed to save perspectives: {:#}", e),
            }
        }

        if args.until_converged && convergence.check_convergence(&result) {
            println!("\nConverged after {} round(s)", round);
            break;
        }

        if !args.until_converged && round >= args.rounds {
            println!("\nCompleted {} round(s)", args.rounds);
            break;
        }
    }

    println!("\nPlanning complete.");
    Ok(())
}

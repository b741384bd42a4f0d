// The `feedback` command: single-agent comment-only review
//
// The selected agent may only add comments to existing beads. This gives a
// safe way to collect perspectives without letting an agent rewrite the
// plan.

use anyhow::{anyhow, ensure, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;

use crate::beads::BeadsClient;
use crate::planning::ContextBuilder;
use crate::session::{Session, SessionManager};
use crate::Detector;

#[derive(Args)]
pub struct FeedbackArgs {
    /// Agent to run in feedback mode
    #[arg(long)]
    pub agent: String,

    /// Path to the AGENTS.md file the agent reads first
    #[arg(short = 'a', long)]
    pub agents_path: String,
}

pub async fn run(args: FeedbackArgs, token: CancellationToken) -> Result<()> {
    println!("Feedback mode: {}", args.agent);

    let detector = Detector::new();
    let target = detector
        .detect_all()
        .into_iter()
        .find(|a| a.name == args.agent)
        .ok_or_else(|| anyhow!("agent {:?} not found", args.agent))?;
    ensure!(
        target.authenticated,
        "agent {:?} is not authenticated",
        args.agent
    );

    println!("Using agent: {}", target.name);

    let builder = ContextBuilder::new(BeadsClient::system());
    let mut ctx = builder.build("", &args.agents_path, 1, true).await;
    ctx.feedback_mode = true;
    ctx.agent_name = target.name.clone();

    let manager = SessionManager::new();
    let session = manager.create_session(target.clone())?;

    session.start(&token, args.agents_path.as_ref()).await?;

    let prompt = builder.format_feedback(&ctx);
    println!("Sending feedback prompt to {}...", target.name);

    let response = session.send(&token, &prompt).await;
    let _ = session.close().await;
    let response = response?;

    println!("\n=== {} Response ===", target.name);
    println!("{}", response.output);

    println!("\nFeedback complete.");
    Ok(())
}

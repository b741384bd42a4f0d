// The `ask` command: one prompt, every agent, in parallel
//
// Each agent runs a single one-shot invocation; responses come back in a
// deterministic order and render in the chosen output format.

use std::time::{Duration, Instant};

use anyhow::Result;
use clap::{Args, ValueEnum};
use tokio_util::sync::CancellationToken;

use crate::agents::Agent;
use crate::dispatch::DispatchResult;
use crate::presentation::{AgentReport, Formatter, OutputFormat};
use crate::session::{run_one_shot, Response};
use crate::Detector;

#[derive(Args)]
pub struct AskArgs {
    /// The prompt to send to every agent
    pub prompt: String,

    /// Output format
    #[arg(long, value_enum, default_value = "terminal")]
    pub format: FormatArg,

    /// Specific agents to use (default: all available)
    #[arg(long = "agents", value_delimiter = ',')]
    pub agents: Vec<String>,

    /// Per-run timeout in seconds
    #[arg(long, default_value_t = 300)]
    pub timeout: u64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FormatArg {
    Terminal,
    Json,
    Markdown,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Terminal => OutputFormat::Terminal,
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Markdown => OutputFormat::Markdown,
        }
    }
}

pub async fn run(args: AskArgs, token: CancellationToken) -> Result<()> {
    let detector = Detector::new();
    let mut agents = detector.detect_all();
    if !args.agents.is_empty() {
        agents.retain(|a| args.agents.contains(&a.name));
    }
    let agents: Vec<Agent> = agents.into_iter().filter(|a| a.authenticated).collect();

    if agents.is_empty() {
        println!("No authenticated agents available");
        return Ok(());
    }

    // A child token carries both the ctrl-c signal and the deadline
    let deadline = token.child_token();
    let timer = deadline.clone();
    let timeout = args.timeout;
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(timeout)).await;
        timer.cancel();
    });

    let mut handles = Vec::with_capacity(agents.len());
    for agent in agents {
        let token = deadline.clone();
        let prompt = args.prompt.clone();
        handles.push(tokio::spawn(async move {
            let started = Instant::now();
            let result = run_one_shot(&token, &agent, &prompt).await;
            AgentReport {
                result: DispatchResult {
                    agent,
                    response: Response {
                        output: result.output,
                        context_usage: 0.0,
                    },
                    error: result.error,
                },
                duration: started.elapsed(),
            }
        }));
    }

    let mut reports = Vec::with_capacity(handles.len());
    for handle in handles {
        if let Ok(report) = handle.await {
            reports.push(report);
        }
    }
    reports.sort_by(|a, b| a.result.agent.name.cmp(&b.result.agent.name));

    let formatter = Formatter::new();
    print!("{}", formatter.format(&reports, args.format.into()));

    Ok(())
}

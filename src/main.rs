use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use volley::commands::{self, Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    // Ctrl-C cancels in-flight agent work instead of orphaning children
    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupt received, cancelling agent work");
            signal_token.cancel();
        }
    });

    match cli.command {
        Command::Plan(args) => commands::plan::run(args, token).await,
        Command::Feedback(args) => commands::feedback::run(args, token).await,
        Command::Agents => commands::agents::run(),
        Command::Ask(args) => commands::ask::run(args, token).await,
    }
}

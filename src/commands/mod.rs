// CLI command definitions and dispatch

pub mod agents;
pub mod ask;
pub mod feedback;
pub mod plan;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "volley",
    version,
    about = "Multi-agent planning protocol for AI coding assistants",
    long_about = "Volley orchestrates multiple AI coding agents (Claude Code, Codex, Cursor, \
                  and others) to collaboratively plan and refine development tasks using \
                  beads (bd) for issue tracking.\n\nEach planning round, all available agents \
                  analyze the current plan and suggest improvements until the team converges \
                  on a complete solution."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the multi-agent planning protocol
    Plan(plan::PlanArgs),
    /// Run single-agent feedback mode (comment-only)
    Feedback(feedback::FeedbackArgs),
    /// List available AI coding agents
    Agents,
    /// Send one prompt to every agent in parallel and collect responses
    Ask(ask::AskArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_plan() {
        let cli = Cli::try_parse_from([
            "volley",
            "plan",
            "add caching",
            "--rounds",
            "5",
            "--agents-path",
            "/tmp/AGENTS.md",
            "--until-converged",
            "--verbose",
        ])
        .unwrap();

        match cli.command {
            Command::Plan(args) => {
                assert_eq!(args.prompt, "add caching");
                assert_eq!(args.rounds, 5);
                assert_eq!(args.agents_path, "/tmp/AGENTS.md");
                assert!(args.until_converged);
                assert!(args.verbose);
                assert!(args.save.is_none());
            }
            _ => panic!("expected plan command"),
        }
    }

    #[test]
    fn test_cli_plan_defaults() {
        let cli = Cli::try_parse_from(["volley", "plan", "p", "-a", "/tmp/AGENTS.md"]).unwrap();
        match cli.command {
            Command::Plan(args) => {
                assert_eq!(args.rounds, 3);
                assert!(!args.until_converged);
                assert!(args.agents.is_empty());
            }
            _ => panic!("expected plan command"),
        }
    }

    #[test]
    fn test_cli_feedback_requires_agent() {
        let result = Cli::try_parse_from(["volley", "feedback", "-a", "/tmp/AGENTS.md"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_agents_subcommand() {
        let cli = Cli::try_parse_from(["volley", "agents"]).unwrap();
        assert!(matches!(cli.command, Command::Agents));
    }

    #[test]
    fn test_cli_ask_with_format() {
        let cli =
            Cli::try_parse_from(["volley", "ask", "what changed?", "--format", "json"]).unwrap();
        match cli.command {
            Command::Ask(args) => {
                assert_eq!(args.prompt, "what changed?");
                assert!(matches!(args.format, ask::FormatArg::Json));
            }
            _ => panic!("expected ask command"),
        }
    }
}

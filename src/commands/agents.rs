// The `agents` command: list detected agents and their status

use anyhow::Result;

use crate::agents::known_agents;
use crate::Detector;

pub fn run() -> Result<()> {
    println!("Detecting available agents...\n");

    let detector = Detector::new();
    let agents = detector.detect_all();

    if agents.is_empty() {
        println!("No agents found.");
        println!("\nSupported agents:");
        for pattern in known_agents() {
            println!("  - {}", pattern.binary);
        }
        return Ok(());
    }

    println!("Found {} agent(s):\n", agents.len());
    for agent in &agents {
        let status = if agent.authenticated {
            "✓ ready"
        } else {
            "✗ not authenticated"
        };

        println!("  {}", agent.name);
        println!("    Path: {}", agent.path.display());
        println!("    Version: {}", agent.version);
        println!("    Status: {}", status);
        println!();
    }

    Ok(())
}

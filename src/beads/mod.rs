// Beads issue-tracker integration - shared state via the `bd` CLI
//
// The tracker is the only shared mutable store between agent turns. This
// module is the single place that shells out to `bd`; everything else goes
// through BeadsClient so tests can substitute a mock runner.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

/// Runs an external command and captures its stdout.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[&str]) -> Result<String>;
}

/// CommandRunner that executes real processes.
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<String> {
        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .with_context(|| format!("failed to run {} {}", program, args.join(" ")))?;

        if !output.status.success() {
            bail!(
                "{} {} exited with {}: {}",
                program,
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Client for the `bd` issue tracker.
#[derive(Clone)]
pub struct BeadsClient {
    runner: Arc<dyn CommandRunner>,
}

impl BeadsClient {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Client backed by the real `bd` binary.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemRunner))
    }

    /// Returns the line-oriented bead listing (`bd list`).
    pub async fn list(&self) -> Result<String> {
        self.runner.run("bd", &["list"]).await
    }

    /// Returns the JSON bead listing (`bd list --json`). The payload is
    /// opaque to the engine; it is only used for snapshot diffing.
    pub async fn list_json(&self) -> Result<String> {
        self.runner.run("bd", &["list", "--json"]).await
    }

    /// Returns the detail view for one bead (`bd show <id>`).
    pub async fn show(&self, id: &str) -> Result<String> {
        self.runner.run("bd", &["show", id]).await
    }

    /// Writes notes onto a bead (`bd update <id> --notes <text>`).
    pub async fn update_notes(&self, id: &str, notes: &str) -> Result<String> {
        self.runner.run("bd", &["update", id, "--notes", notes]).await
    }
}

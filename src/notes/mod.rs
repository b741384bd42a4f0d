// Persisting agent perspectives to bead notes

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::beads::BeadsClient;
use crate::planning::orchestrator::RoundResult;

/// Saves agent round results to a bead's notes.
pub struct NotesSaver {
    beads: BeadsClient,
}

impl NotesSaver {
    pub fn new(beads: BeadsClient) -> Self {
        Self { beads }
    }

    /// Saves all agent results from a round to a bead's notes. A round
    /// with no agent results is a no-op.
    pub async fn save_round_results(&self, bead_id: &str, result: &RoundResult) -> Result<()> {
        if result.agent_results.is_empty() {
            return Ok(());
        }

        let notes = format_round_notes(result, Utc::now());
        self.beads
            .update_notes(bead_id, &notes)
            .await
            .with_context(|| format!("failed to save notes to bead {}", bead_id))?;

        Ok(())
    }
}

/// Formats a single agent's response as a note entry.
pub fn format_note(agent_name: &str, response: &str, timestamp: DateTime<Utc>) -> String {
    let header = format!("### {} @ {}", agent_name, timestamp.format("%Y-%m-%d %H:%M:%S"));

    if response.is_empty() {
        return format!("{}\n(no response)", header);
    }
    format!("{}\n{}", header, response)
}

/// Formats all agent results from a round as notes.
pub fn format_round_notes(result: &RoundResult, timestamp: DateTime<Utc>) -> String {
    let mut notes = format!("## Round {}\n\n", result.round);

    for (i, agent_result) in result.agent_results.iter().enumerate() {
        if i > 0 {
            notes.push_str("\n---\n\n");
        }

        let response = match &agent_result.error {
            Some(e) => format!("[ERROR: {}]", e),
            None => agent_result.response.output.clone(),
        };

        notes.push_str(&format_note(&agent_result.agent.name, &response, timestamp));
        notes.push('\n');
    }

    notes
}

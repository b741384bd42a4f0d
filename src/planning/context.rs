// Planning context capture and prompt rendering
//
// A PlanningContext bundles everything one turn's prompt needs: the
// operator's prompt, the AGENTS.md path, and a snapshot of the beads
// tracker. The snapshot is refreshed between turns and between rounds so
// each agent sees its predecessors' effects.

use crate::beads::BeadsClient;

/// Placeholder used when the tracker cannot be read. Missing beads state
/// must never block planning.
const NO_BEADS_PLACEHOLDER: &str = "(no beads state available)";

/// The context rendered into one turn's prompt.
#[derive(Debug, Clone, Default)]
pub struct PlanningContext {
    /// The user's original planning prompt
    pub prompt: String,
    /// Path to AGENTS.md for the agent to read
    pub agents_path: String,
    /// Current state of beads (bd list + bd show per id)
    pub beads_state: String,
    /// Current round number, 1-based
    pub round: u32,
    /// Whether this is the first turn of the protocol
    pub is_first_turn: bool,
    /// Comment-only feedback mode
    pub feedback_mode: bool,
    /// Agent name, used by the feedback rendering
    pub agent_name: String,
}

/// Builds planning contexts and renders them into prompts.
pub struct ContextBuilder {
    beads: BeadsClient,
}

impl ContextBuilder {
    pub fn new(beads: BeadsClient) -> Self {
        Self { beads }
    }

    /// Assembles a planning context with a fresh beads snapshot. Tracker
    /// failures degrade to a placeholder rather than an error.
    pub async fn build(
        &self,
        prompt: &str,
        agents_path: &str,
        round: u32,
        is_first_turn: bool,
    ) -> PlanningContext {
        let mut ctx = PlanningContext {
            prompt: prompt.to_string(),
            agents_path: agents_path.to_string(),
            round,
            is_first_turn,
            ..Default::default()
        };
        self.refresh_beads_state(&mut ctx).await;
        ctx
    }

    /// Re-reads the tracker into the context's beads snapshot.
    pub async fn refresh_beads_state(&self, ctx: &mut PlanningContext) {
        match self.capture_beads_state().await {
            Ok(state) => ctx.beads_state = state,
            Err(e) => {
                log::warn!("[ContextBuilder] Failed to read beads state: {:#}", e);
                ctx.beads_state = NO_BEADS_PLACEHOLDER.to_string();
            }
        }
    }

    /// Captures `bd list` plus `bd show` for every listed id.
    async fn capture_beads_state(&self) -> anyhow::Result<String> {
        let listing = self.beads.list().await?;

        let mut state = String::from("=== Beads List ===\n");
        state.push_str(&listing);

        let ids = extract_bead_ids(&listing);
        if !ids.is_empty() {
            state.push_str("\n=== Bead Details ===\n");
            for id in ids {
                let detail = self.beads.show(&id).await?;
                state.push_str(&detail);
                state.push('\n');
            }
        }

        Ok(state)
    }

    /// Renders the normal per-turn prompt.
    pub fn format(&self, ctx: &PlanningContext) -> String {
        let mut out = String::new();

        if ctx.is_first_turn {
            out.push_str(&format!("please read and apply {}\n\n", ctx.agents_path));
        }

        if ctx.round > 1 {
            out.push_str(&format!("## Round {}\n\n", ctx.round));
        }

        out.push_str(&format!("Prompt: {}\n\n", ctx.prompt));
        out.push_str(&format!("AGENTS.md: {}\n\n", ctx.agents_path));
        out.push_str(&format!("Current Beads:\n{}\n\n", ctx.beads_state));

        out.push_str(
            "Instructions:\n\
             - Review the prompt against the current beads.\n\
             - Create, update, or close beads as needed using `bd create`, `bd update`, or `bd close`.\n\
             - Report which beads you changed and whether the plan is now complete.\n",
        );

        out
    }

    /// Renders the comment-only feedback variant of the prompt.
    pub fn format_feedback(&self, ctx: &PlanningContext) -> String {
        let mut out = String::new();

        if ctx.is_first_turn {
            out.push_str(&format!("please read and apply {}\n\n", ctx.agents_path));
        }

        out.push_str("## Feedback Mode (Comment-Only)\n\n");
        out.push_str(&format!(
            "You are {}. Review the beads below and give feedback as comments.\n\n",
            ctx.agent_name
        ));
        out.push_str(&format!(
            "Rules:\n\
             - Add comments only. Do not create beads or modify descriptions or status.\n\
             - Use `bd comment <id> \"<text>\" --author {}` to leave feedback.\n\
             - Read the existing comments on each bead first and do not repeat feedback that is already there.\n\n",
            ctx.agent_name
        ));
        out.push_str(&format!("Current Beads:\n{}\n", ctx.beads_state));

        out
    }
}

/// Extracts candidate bead ids from `bd list` output: the first
/// whitespace-delimited token of each non-empty line, kept only when it
/// contains a hyphen.
fn extract_bead_ids(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter(|token| token.contains('-'))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beads::testing::MockRunner;
    use std::sync::Arc;

    fn builder_with(responses: Vec<Result<String, String>>) -> ContextBuilder {
        ContextBuilder::new(BeadsClient::new(Arc::new(MockRunner::new(responses))))
    }

    #[test]
    fn test_extract_bead_ids() {
        let listing = "vly-1 [P1] [task] open - First task\n\
                       vly-2 [P2] [bug] open - Second task\n\
                       \n\
                       Total: 2 beads\n";
        assert_eq!(extract_bead_ids(listing), vec!["vly-1", "vly-2"]);
    }

    #[test]
    fn test_extract_bead_ids_requires_hyphen() {
        assert!(extract_bead_ids("Total: 3\nnothing here\n").is_empty());
        assert!(extract_bead_ids("").is_empty());
    }

    #[tokio::test]
    async fn test_build_populates_fields() {
        let builder = builder_with(vec![Ok(String::new())]);
        let ctx = builder
            .build("Review authentication logic", "/path/to/AGENTS.md", 1, true)
            .await;

        assert_eq!(ctx.prompt, "Review authentication logic");
        assert_eq!(ctx.agents_path, "/path/to/AGENTS.md");
        assert_eq!(ctx.round, 1);
        assert!(ctx.is_first_turn);
        assert!(!ctx.feedback_mode);
    }

    #[tokio::test]
    async fn test_build_includes_list_and_show_output() {
        let builder = builder_with(vec![
            Ok("vly-1 [P1] [task] open - Auth fails\n".to_string()),
            Ok("Status: open\nPriority: P1\nType: task\nCreated: 2026-08-01\nDescription: Auth fails\n".to_string()),
        ]);

        let ctx = builder.build("test prompt", "/agents.md", 1, true).await;

        assert!(ctx.beads_state.contains("=== Beads List ==="));
        assert!(ctx.beads_state.contains("vly-1 [P1]"));
        assert!(ctx.beads_state.contains("=== Bead Details ==="));
        assert!(ctx.beads_state.contains("Status:"));
        assert!(ctx.beads_state.contains("Description:"));
    }

    #[tokio::test]
    async fn test_build_degrades_to_placeholder_when_tracker_missing() {
        let builder = builder_with(vec![Err("bd: command not found".to_string())]);
        let ctx = builder.build("prompt", "/agents.md", 1, true).await;

        assert_eq!(ctx.prompt, "prompt");
        assert_eq!(ctx.beads_state, NO_BEADS_PLACEHOLDER);
    }

    #[tokio::test]
    async fn test_refresh_replaces_stale_state() {
        let builder = builder_with(vec![Ok("vly-9 [P1] [task] open - Fresh\n".to_string()), Ok(
            "Status: open\n".to_string(),
        )]);

        let mut ctx = PlanningContext {
            beads_state: "old state".to_string(),
            ..Default::default()
        };
        builder.refresh_beads_state(&mut ctx).await;

        assert_ne!(ctx.beads_state, "old state");
        assert!(ctx.beads_state.contains("vly-9"));
    }

    #[test]
    fn test_format_includes_sections() {
        let builder = builder_with(vec![]);
        let ctx = PlanningContext {
            prompt: "Fix the bug in auth".to_string(),
            agents_path: "/path/to/AGENTS.md".to_string(),
            beads_state: "test-123 [P1] [bug] open - Auth fails".to_string(),
            round: 1,
            is_first_turn: true,
            ..Default::default()
        };

        let output = builder.format(&ctx);

        for section in ["Prompt:", "AGENTS.md:", "Current Beads:"] {
            assert!(output.contains(section), "missing section {}", section);
        }
        assert!(output.contains("Fix the bug in auth"));
        assert!(output.contains("/path/to/AGENTS.md"));
        assert!(output.contains("test-123 [P1] [bug] open - Auth fails"));
    }

    #[test]
    fn test_format_first_turn_has_agents_guidance() {
        let builder = builder_with(vec![]);
        let ctx = PlanningContext {
            prompt: "Review beads".to_string(),
            agents_path: "/agents.md".to_string(),
            round: 1,
            is_first_turn: true,
            ..Default::default()
        };

        let output = builder.format(&ctx);
        assert!(output.starts_with("please read and apply /agents.md"));
    }

    #[test]
    fn test_format_later_rounds_name_the_round() {
        let builder = builder_with(vec![]);
        let ctx = PlanningContext {
            prompt: "Continue review".to_string(),
            agents_path: "/agents.md".to_string(),
            round: 3,
            is_first_turn: false,
            ..Default::default()
        };

        let output = builder.format(&ctx);
        assert!(output.contains("## Round 3"));
        assert!(!output.contains("please read and apply"));
    }

    #[test]
    fn test_format_lists_allowed_bd_commands() {
        let builder = builder_with(vec![]);
        let ctx = PlanningContext {
            round: 1,
            is_first_turn: true,
            ..Default::default()
        };

        let output = builder.format(&ctx);
        assert!(output.contains("bd create"));
        assert!(output.contains("bd update"));
        assert!(output.contains("bd close"));
    }

    #[test]
    fn test_format_has_blank_line_separation() {
        let builder = builder_with(vec![]);
        let ctx = PlanningContext {
            prompt: "Test prompt".to_string(),
            agents_path: "/agents.md".to_string(),
            beads_state: "bead-123 [P1] [task] open - Test".to_string(),
            round: 1,
            is_first_turn: true,
            ..Default::default()
        };

        let output = builder.format(&ctx);
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines.len() >= 5);
        assert!(lines.iter().any(|line| line.trim().is_empty()));
    }

    #[test]
    fn test_format_feedback_is_comment_only() {
        let builder = builder_with(vec![]);
        let ctx = PlanningContext {
            agents_path: "/agents.md".to_string(),
            beads_state: "vly-1 [P1] [task] open - Task".to_string(),
            round: 1,
            is_first_turn: true,
            feedback_mode: true,
            agent_name: "claude".to_string(),
            ..Default::default()
        };

        let output = builder.format_feedback(&ctx);
        assert!(output.contains("## Feedback Mode (Comment-Only)"));
        assert!(output.contains("bd comment <id> \"<text>\" --author claude"));
        assert!(output.contains("Do not create beads"));
        assert!(output.contains("existing comments"));
        assert!(output.contains("vly-1 [P1]"));
        assert!(output.starts_with("please read and apply /agents.md"));
    }
}

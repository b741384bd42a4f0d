// Static catalog of agent CLI invocation patterns
//
// The table below is the single source of truth for flag names. Downstream
// components (sessions, one-shot runner, detector) build argument vectors
// from these patterns and never hardcode flag strings themselves.

/// Invocation pattern for one AI agent CLI family.
#[derive(Debug, Clone)]
pub struct CliPattern {
    /// Executable name
    pub binary: &'static str,
    /// Arguments to check version/installation
    pub version_args: &'static [&'static str],
    /// Arguments to verify authentication (empty means: use the version args)
    pub auth_check_args: &'static [&'static str],
    /// Base args for non-interactive mode
    pub non_interactive_args: &'static [&'static str],
    /// Args to enable JSON output
    pub json_output_args: &'static [&'static str],
    /// Args to skip permission prompts
    pub skip_approvals_args: &'static [&'static str],
    /// Flag for setting a system prompt, where supported
    pub system_prompt_arg: Option<&'static str>,
    /// Flag for setting the working directory, where supported
    pub workspace_dir_arg: Option<&'static str>,
    /// Flag for resuming a session, where supported
    pub resume_session_arg: Option<&'static str>,
}

static KNOWN_AGENTS: [CliPattern; 6] = [
    CliPattern {
        binary: "claude",
        version_args: &["--version"],
        // Auth is only checked on the first real command
        auth_check_args: &["--version"],
        non_interactive_args: &["-p"],
        json_output_args: &["--output-format", "stream-json", "--verbose"],
        skip_approvals_args: &["--dangerously-skip-permissions"],
        system_prompt_arg: Some("--append-system-prompt"),
        workspace_dir_arg: None,
        resume_session_arg: Some("--resume"),
    },
    CliPattern {
        binary: "codex",
        version_args: &["--version"],
        auth_check_args: &["--version"],
        non_interactive_args: &["exec"],
        json_output_args: &["--json"],
        skip_approvals_args: &["--dangerously-bypass-approvals-and-sandbox"],
        system_prompt_arg: None,
        workspace_dir_arg: Some("--cd"),
        resume_session_arg: None,
    },
    CliPattern {
        binary: "cursor-agent",
        version_args: &["--version"],
        auth_check_args: &["status"],
        non_interactive_args: &["-p"],
        json_output_args: &["--output-format", "stream-json"],
        skip_approvals_args: &["--force"],
        system_prompt_arg: None,
        workspace_dir_arg: Some("--workspace"),
        resume_session_arg: Some("--resume"),
    },
    CliPattern {
        binary: "auggie",
        version_args: &["--version"],
        auth_check_args: &["--version"],
        non_interactive_args: &["--print"],
        json_output_args: &["--output-format", "json"],
        // Auggie only supports per-tool permissions
        skip_approvals_args: &[],
        system_prompt_arg: Some("--rules"),
        workspace_dir_arg: Some("--workspace-root"),
        resume_session_arg: Some("--resume"),
    },
    CliPattern {
        binary: "gemini",
        version_args: &["--version"],
        auth_check_args: &["--version"],
        // Positional prompt is one-shot by default
        non_interactive_args: &[],
        json_output_args: &["--output-format", "stream-json"],
        skip_approvals_args: &["--yolo"],
        system_prompt_arg: None,
        workspace_dir_arg: None,
        resume_session_arg: Some("--resume"),
    },
    CliPattern {
        binary: "amp",
        version_args: &["--version"],
        auth_check_args: &["--version"],
        non_interactive_args: &["--execute"],
        json_output_args: &["--stream-json"],
        skip_approvals_args: &["--dangerously-allow-all"],
        system_prompt_arg: None,
        workspace_dir_arg: None,
        // Amp resumes via `amp threads continue`
        resume_session_arg: None,
    },
];

/// Returns the invocation patterns for all supported agents.
pub fn known_agents() -> &'static [CliPattern] {
    &KNOWN_AGENTS
}

/// Looks up the invocation pattern for an agent by name.
pub fn pattern_for(name: &str) -> Option<&'static CliPattern> {
    KNOWN_AGENTS.iter().find(|p| p.binary == name)
}

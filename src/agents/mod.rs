// Agent detection and invocation modeling

pub mod catalog;
pub mod detector;
pub mod parsers;

pub use catalog::{known_agents, pattern_for, CliPattern};
pub use detector::Detector;
pub use parsers::{parser_for, OutputParser};

use std::path::PathBuf;

/// A detected AI coding agent CLI tool.
///
/// Immutable after detection: the detector fills every field, and downstream
/// components only read them.
#[derive(Debug, Clone)]
pub struct Agent {
    /// Stable short identifier, e.g. "claude", "codex", "cursor-agent"
    pub name: String,
    /// Absolute path to the binary
    pub path: PathBuf,
    /// Whether the agent is authenticated
    pub authenticated: bool,
    /// Agent version if available
    pub version: String,
    /// CLI invocation pattern for this agent
    pub pattern: CliPattern,
    /// Output parser for this agent's JSON dialect
    pub parser: OutputParser,
}

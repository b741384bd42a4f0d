// Agent-specific output parsers
//
// Each agent CLI streams its own JSON event dialect. These parsers reduce a
// raw capture (possibly multi-line, possibly line-delimited JSON) to the
// human-readable text inside it. All parsers are total functions: malformed
// JSON, truncation and plain text degrade to returning the input unchanged,
// never an error.

mod auggie;
mod codex;
mod gemini;
mod stream_json;

/// Which output dialect an agent speaks.
///
/// Claude, Cursor and Amp share the Claude Code stream-json format, so they
/// map to a single variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputParser {
    /// Claude Code-compatible stream-json (claude, cursor-agent, amp)
    StreamJson,
    /// Codex JSONL item/aggregated-output events
    Codex,
    /// Auggie single JSON result object
    Auggie,
    /// Gemini assistant delta messages
    Gemini,
    /// Pass output through unchanged
    #[default]
    Noop,
}

impl OutputParser {
    /// Transforms raw agent output into clean displayable text.
    pub fn parse(&self, output: &str) -> String {
        match self {
            OutputParser::StreamJson => stream_json::parse(output),
            OutputParser::Codex => codex::parse(output),
            OutputParser::Auggie => auggie::parse(output),
            OutputParser::Gemini => gemini::parse(output),
            OutputParser::Noop => output.to_string(),
        }
    }
}

/// Returns the parser for an agent name, falling back to Noop for unknown
/// names so callers never deal with a missing parser.
pub fn parser_for(name: &str) -> OutputParser {
    match name {
        "claude" | "cursor-agent" | "amp" => OutputParser::StreamJson,
        "codex" => OutputParser::Codex,
        "auggie" => OutputParser::Auggie,
        "gemini" => OutputParser::Gemini,
        _ => OutputParser::Noop,
    }
}

// Formatting dispatch results for display

use std::time::Duration;

use serde::Serialize;

use crate::dispatch::DispatchResult;

/// Output format for agent results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Bordered sections for terminal display
    Terminal,
    /// Structured JSON for piping
    Json,
    /// Markdown for saving
    Markdown,
}

/// A dispatch result annotated with how long the agent took.
#[derive(Debug)]
pub struct AgentReport {
    pub result: DispatchResult,
    pub duration: Duration,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    agent: &'a str,
    response: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    duration: String,
    duration_ms: u128,
}

/// Renders agent reports in a chosen output format.
pub struct Formatter {
    max_response_length: usize,
}

impl Formatter {
    pub fn new() -> Self {
        Self {
            max_response_length: 1000,
        }
    }

    /// Sets the maximum response length before truncation. Zero disables
    /// truncation.
    pub fn set_max_response_length(&mut self, length: usize) {
        self.max_response_length = length;
    }

    pub fn format(&self, reports: &[AgentReport], format: OutputFormat) -> String {
        if reports.is_empty() {
            return match format {
                OutputFormat::Json => "[]".to_string(),
                _ => String::new(),
            };
        }

        match format {
            OutputFormat::Terminal => self.format_terminal(reports),
            OutputFormat::Json => self.format_json(reports),
            OutputFormat::Markdown => self.format_markdown(reports),
        }
    }

    fn format_terminal(&self, reports: &[AgentReport]) -> String {
        let mut out = String::new();
        let mut succeeded = 0;
        let mut failed = 0;

        for (i, report) in reports.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }

            let duration = format_duration(report.duration);
            let title = match &report.result.error {
                Some(_) => {
                    failed += 1;
                    format!("{} [ERROR]", report.result.agent.name)
                }
                None => {
                    succeeded += 1;
                    report.result.agent.name.clone()
                }
            };

            out.push_str(
                "┌──────────────────────────────────────────────────────────────────────────────┐\n",
            );
            out.push_str(&format!("│ {:<40} {:>33} │\n", title, duration));
            out.push_str(
                "├──────────────────────────────────────────────────────────────────────────────┤\n",
            );

            match &report.result.error {
                Some(e) => {
                    out.push_str(&format!("│ Error: {:<68} │\n", e.to_string()));
                }
                None => {
                    let output = &report.result.response.output;
                    let mut response: String = if self.max_response_length > 0
                        && output.chars().count() > self.max_response_length
                    {
                        output.chars().take(self.max_response_length).collect()
                    } else {
                        output.clone()
                    };
                    if response.len() < output.len() {
                        response.push_str("... [truncated]");
                    }
                    for line in wrap_text(&response, 76) {
                        out.push_str(&format!("│ {:<76} │\n", line));
                    }
                }
            }

            out.push_str(
                "└──────────────────────────────────────────────────────────────────────────────┘\n",
            );
        }

        out.push_str(&format!(
            "\nSummary: {} agents, {} succeeded, {} failed\n",
            reports.len(),
            succeeded,
            failed
        ));

        out
    }

    fn format_json(&self, reports: &[AgentReport]) -> String {
        let json_reports: Vec<JsonReport> = reports
            .iter()
            .map(|report| JsonReport {
                agent: &report.result.agent.name,
                response: &report.result.response.output,
                error: report.result.error.as_ref().map(|e| e.to_string()),
                duration: format_duration(report.duration),
                duration_ms: report.duration.as_millis(),
            })
            .collect();

        serde_json::to_string_pretty(&json_reports).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_markdown(&self, reports: &[AgentReport]) -> String {
        let mut out = String::from("# Agent Responses\n\n");

        for report in reports {
            out.push_str(&format!("## {}\n\n", report.result.agent.name));
            out.push_str(&format!(
                "**Duration:** {}\n\n",
                format_duration(report.duration)
            ));

            match &report.result.error {
                Some(e) => out.push_str(&format!("**Error:** {}\n\n", e)),
                None => {
                    out.push_str(&report.result.response.output);
                    out.push_str("\n\n");
                }
            }

            out.push_str("---\n\n");
        }

        out
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Formats a duration for display: milliseconds under a second, otherwise
/// tenths of seconds.
fn format_duration(d: Duration) -> String {
    if d < Duration::from_secs(1) {
        format!("{}ms", d.as_millis())
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}

/// Wraps text on word boundaries to fit within a given width.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if text.is_empty() {
        return vec![String::new()];
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current = words[0].to_string();
        for word in &words[1..] {
            if current.len() + 1 + word.len() <= width {
                current.push(' ');
                current.push_str(word);
            } else {
                lines.push(current);
                current = word.to_string();
            }
        }
        lines.push(current);
    }

    lines
}

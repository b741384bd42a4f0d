// Convergence detection across planning rounds
//
// The protocol stops early once the group stops changing the tracker. A
// round converges when no successful agent reported changed beads; the
// detector tracks how many such rounds have happened in a row.

use crate::planning::orchestrator::RoundResult;

/// Phrases that signal an agent believes there is nothing left to do.
const NO_CHANGE_SIGNALS: [&str; 5] = [
    "no changes",
    "nothing to do",
    "all tasks are done",
    "everything is complete",
    "complete",
];

/// Tracks consecutive no-change rounds against a threshold.
pub struct ConvergenceDetector {
    threshold: u32,
    consecutive_no_change: u32,
}

impl ConvergenceDetector {
    /// Creates a detector that converges after one round of no changes.
    pub fn new() -> Self {
        Self {
            threshold: 1,
            consecutive_no_change: 0,
        }
    }

    /// Returns true if the round indicates convergence: ignoring skipped
    /// and errored agents, no one reported changed beads and the round's
    /// total change count is zero. An empty round is converged.
    pub fn is_converged(&self, result: &RoundResult) -> bool {
        if result.total_changes > 0 {
            return false;
        }

        result
            .agent_results
            .iter()
            .filter(|r| !r.skipped && r.error.is_none())
            .all(|r| r.beads_changed.is_empty())
    }

    /// Folds a round into the streak. Returns true once the threshold of
    /// consecutive no-change rounds has been met.
    pub fn check_convergence(&mut self, result: &RoundResult) -> bool {
        if self.is_converged(result) {
            self.consecutive_no_change += 1;
        } else {
            self.consecutive_no_change = 0;
        }
        self.consecutive_no_change >= self.threshold
    }

    /// Clears the streak.
    pub fn reset(&mut self) {
        self.consecutive_no_change = 0;
    }

    /// Current count of consecutive no-change rounds.
    pub fn consecutive_no_change_rounds(&self) -> u32 {
        self.consecutive_no_change
    }

    /// Sets how many consecutive no-change rounds declare convergence.
    /// Clamped to at least 1.
    pub fn set_threshold(&mut self, n: u32) {
        self.threshold = n.max(1);
    }
}

impl Default for ConvergenceDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Heuristic: does the agent's own text claim there was nothing to change?
/// The detector itself never consults text; this is for callers that want
/// a cheap secondary signal.
pub fn parse_no_change_signal(output: &str) -> bool {
    if output.is_empty() {
        return false;
    }
    let lower = output.to_lowercase();
    NO_CHANGE_SIGNALS.iter().any(|signal| lower.contains(signal))
}

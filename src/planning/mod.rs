// Multi-agent planning protocol

pub mod context;
pub mod convergence;
pub mod orchestrator;

pub use context::{ContextBuilder, PlanningContext};
pub use convergence::{parse_no_change_signal, ConvergenceDetector};
pub use orchestrator::{AgentResult, ProgressReporter, RoundOrchestrator, RoundResult};

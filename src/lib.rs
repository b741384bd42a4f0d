// Module declarations
pub mod agents;
pub mod beads;
pub mod commands;
pub mod dispatch;
pub mod notes;
pub mod planning;
pub mod presentation;
pub mod session;
mod utils;

// Re-export the core types for library consumers
pub use agents::{Agent, Detector};
pub use dispatch::{dispatch, DispatchResult};
pub use planning::{
    ContextBuilder, ConvergenceDetector, PlanningContext, RoundOrchestrator, RoundResult,
};
pub use session::{Response, Session, SessionManager};

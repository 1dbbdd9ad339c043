mod graph;
mod scheduler;

pub use graph::Stage;
pub use scheduler::Orchestrator;

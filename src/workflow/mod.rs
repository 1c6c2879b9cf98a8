pub mod decision;
pub mod engine;
pub mod nodes;
pub mod state;

pub use decision::{DecisionError, ValidationDecision};
pub use engine::PipelineEngine;
pub use state::{AnalysisStep, ApprovalStatus, StepQueue, WorkflowState};

use crate::jobs::CompletedJob;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One planned unit of work: a single app invocation within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisStep {
    pub index: usize,
    pub name: String,
    pub app_id: String,
    pub description: String,
    #[serde(default)]
    pub expect_new_object: bool,
    #[serde(default)]
    pub input_objects: Vec<String>,
    #[serde(default)]
    pub output_objects: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Approved,
    Rejected,
    Cancelled,
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Explicit FIFO over the remaining plan. Revision semantics (`replace_head`
/// vs `replace_all`) are queue operations rather than list slicing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepQueue {
    steps: VecDeque<AnalysisStep>,
}

impl StepQueue {
    pub fn from_steps(steps: Vec<AnalysisStep>) -> Self {
        Self {
            steps: steps.into(),
        }
    }

    pub fn pop_front(&mut self) -> Option<AnalysisStep> {
        self.steps.pop_front()
    }

    pub fn front(&self) -> Option<&AnalysisStep> {
        self.steps.front()
    }

    pub fn replace_head(&mut self, step: AnalysisStep) {
        match self.steps.front_mut() {
            Some(head) => *head = step,
            None => self.steps.push_back(step),
        }
    }

    pub fn replace_all(&mut self, steps: Vec<AnalysisStep>) {
        self.steps = steps.into();
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnalysisStep> {
        self.steps.iter()
    }
}

/// The record threaded through every node. Nodes never mutate a state in
/// place: each transition clones and updates, so intermediate states stay
/// inspectable and a caller can persist one and resume later in another
/// process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub description: String,
    pub narrative_id: i64,
    #[serde(default)]
    pub reads_id: Option<String>,
    #[serde(default)]
    pub steps_to_run: StepQueue,
    #[serde(default)]
    pub completed_steps: Vec<AnalysisStep>,
    #[serde(default)]
    pub last_executed_step: Option<AnalysisStep>,
    #[serde(default)]
    pub step_result: Option<CompletedJob>,
    #[serde(default)]
    pub input_object_upa: Option<String>,
    #[serde(default)]
    pub last_data_object_upa: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub results: Option<String>,
    #[serde(default)]
    pub human_approval_status: Option<ApprovalStatus>,
    #[serde(default)]
    pub awaiting_approval: bool,
    #[serde(default)]
    pub human_feedback: Option<String>,
}

impl WorkflowState {
    pub fn new(description: impl Into<String>, narrative_id: i64, reads_id: Option<String>) -> Self {
        Self {
            description: description.into(),
            narrative_id,
            reads_id,
            steps_to_run: StepQueue::default(),
            completed_steps: Vec::new(),
            last_executed_step: None,
            step_result: None,
            input_object_upa: None,
            last_data_object_upa: None,
            error: None,
            results: None,
            human_approval_status: None,
            awaiting_approval: false,
            human_feedback: None,
        }
    }

    /// An error always clears the approval gate; a gated state with an error
    /// set would be unreachable by any caller.
    pub fn with_error(&self, message: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.error = Some(message.into());
        next.awaiting_approval = false;
        next
    }

    pub fn is_terminal(&self) -> bool {
        self.error.is_some() || self.results.is_some()
    }
}

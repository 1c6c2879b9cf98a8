use crate::workflow::state::AnalysisStep;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The validator's structured verdict on the remaining plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationDecision {
    pub continue_as_planned: bool,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub input_object_upa: Option<String>,
    #[serde(default)]
    pub modified_next_steps: Vec<AnalysisStep>,
}

#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    #[error("validator returned an unparsable decision: {0}")]
    Malformed(String),
}

/// Schema boundary for validator output. A payload that does not match the
/// decision schema becomes a typed error here, never a silent heuristic.
pub fn parse_validation_decision(raw: &Value) -> Result<ValidationDecision, DecisionError> {
    serde_json::from_value(raw.clone()).map_err(|err| DecisionError::Malformed(err.to_string()))
}

/// The recovery policy for a malformed decision: continue as planned, with
/// the low-confidence reasoning recorded so the fallback is an explicit,
/// logged choice.
pub fn fallback_decision(error: &DecisionError) -> ValidationDecision {
    ValidationDecision {
        continue_as_planned: true,
        reasoning: format!("low-confidence fallback: {error}; continuing as planned"),
        input_object_upa: None,
        modified_next_steps: Vec::new(),
    }
}

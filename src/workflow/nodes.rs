use crate::appspec::mapping::RunContext;
use crate::appspec::model::AppSpec;
use crate::jobs::{remote_execution_error, JobRunner};
use crate::services::{
    AppCatalog, ExecutionService, ObjectStore, Planner, ReportService, ValidationRequest, Validator,
};
use crate::shared::logging::append_engine_log_line;
use crate::workflow::decision::{fallback_decision, parse_validation_decision};
use crate::workflow::state::{AnalysisStep, ApprovalStatus, WorkflowState};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;

pub const COMPLETION_MESSAGE: &str =
    "All planned analysis steps completed. Results are available in the narrative.";
pub const CANCELLATION_MESSAGE: &str =
    "The analysis run was cancelled before execution; no steps were run.";
pub const REJECTION_RESULTS: &str =
    "The analysis plan was rejected. Revise the request and start a new planning run.";

/// Shared collaborator handles for the node functions. Collaborators are
/// injected interfaces, swappable per caller and per test.
pub struct NodeContext<'a> {
    pub planner: &'a dyn Planner,
    pub validator: &'a dyn Validator,
    pub catalog: &'a dyn AppCatalog,
    pub execution: &'a dyn ExecutionService,
    pub object_store: &'a dyn ObjectStore,
    pub reports: &'a dyn ReportService,
    pub app_tag: String,
    pub poll_interval: Duration,
    pub log_root: Option<PathBuf>,
}

impl NodeContext<'_> {
    fn log(&self, narrative_id: i64, line: &str) {
        if let Some(root) = &self.log_root {
            // Logging never aborts a run.
            let _ = append_engine_log_line(root, &format!("narrative_id={narrative_id} {line}"));
        }
    }
}

/// Planning: ask the planner for a step sequence and gate it for approval.
pub fn plan_node(ctx: &NodeContext<'_>, state: &WorkflowState) -> WorkflowState {
    match ctx.planner.plan(&state.description) {
        Ok(steps) => {
            ctx.log(
                state.narrative_id,
                &format!("node=planning steps_planned={}", steps.len()),
            );
            let mut next = state.clone();
            next.steps_to_run.replace_all(steps);
            next.awaiting_approval = true;
            next.human_approval_status = None;
            next
        }
        Err(err) => {
            ctx.log(state.narrative_id, &format!("node=planning error={err}"));
            state.with_error(format!("planning failed: {err}"))
        }
    }
}

/// Non-blocking approval gate. With the gate up and no decision recorded the
/// node is a no-op; the caller persists the state and resumes once a human
/// has acted. Rejection is a normal terminal outcome, not a crash.
pub fn approval_node(state: &WorkflowState) -> WorkflowState {
    if !state.awaiting_approval {
        return state.clone();
    }
    match state.human_approval_status {
        None => state.clone(),
        Some(ApprovalStatus::Approved) => {
            let mut next = state.clone();
            next.awaiting_approval = false;
            next
        }
        Some(ApprovalStatus::Rejected) => {
            let feedback = state
                .human_feedback
                .as_deref()
                .unwrap_or("no feedback provided");
            let mut next = state.with_error(format!("analysis plan rejected by user: {feedback}"));
            next.results = Some(REJECTION_RESULTS.to_string());
            next
        }
        Some(ApprovalStatus::Cancelled) => {
            let mut next = state.clone();
            next.awaiting_approval = false;
            next.results = Some(CANCELLATION_MESSAGE.to_string());
            next
        }
    }
}

/// Executing: pop the head of the queue, run the app end to end, fold the
/// result in. A job-level error routes exactly like an engine-level error.
pub fn execute_node(ctx: &NodeContext<'_>, state: &WorkflowState) -> WorkflowState {
    let mut next = state.clone();
    let Some(step) = next.steps_to_run.pop_front() else {
        return next;
    };
    ctx.log(
        state.narrative_id,
        &format!("node=executing step={} app_id={}", step.index, step.app_id),
    );

    let spec = match ctx.catalog.get_app_spec(&step.app_id, &ctx.app_tag) {
        Ok(spec) => spec,
        Err(err) => {
            return state.with_error(format!(
                "failed to load app spec `{}`: {err}",
                step.app_id
            ))
        }
    };
    let user_params = derive_step_params(&spec, &step, state.input_object_upa.as_deref());
    let runner = JobRunner::new(ctx.execution, ctx.object_store, ctx.reports)
        .with_poll_interval(ctx.poll_interval);
    let run_ctx = RunContext {
        workspace_id: state.narrative_id,
        app_tag: ctx.app_tag.clone(),
    };

    match runner.run_app(&spec, &user_params, &run_ctx) {
        Ok(job) => {
            ctx.log(
                state.narrative_id,
                &format!(
                    "node=executing step={} job_id={} status={} created={}",
                    step.index,
                    job.job_id,
                    job.job_status,
                    job.created_objects.len()
                ),
            );
            if let Some(created) = job.created_objects.iter().next() {
                next.last_data_object_upa = Some(created.object_upa.clone());
            }
            // Terminal status decides failure, not the message: a terminated
            // job may carry no error text at all.
            if let Some(job_error) = remote_execution_error(&job) {
                next.error = Some(job_error.to_string());
                next.awaiting_approval = false;
            }
            next.completed_steps.push(step.clone());
            next.last_executed_step = Some(step);
            next.step_result = Some(job);
            next
        }
        Err(err) => state.with_error(err.to_string()),
    }
}

/// Validating: End when nothing remains; otherwise ask the validator whether
/// the remaining plan still makes sense given the last result.
pub fn validate_node(ctx: &NodeContext<'_>, state: &WorkflowState) -> WorkflowState {
    if state.steps_to_run.is_empty() {
        return end_node(state);
    }
    let (Some(last_step), Some(last_result), Some(next_step)) = (
        state.last_executed_step.as_ref(),
        state.step_result.as_ref(),
        state.steps_to_run.front(),
    ) else {
        // Nothing has run yet; there is nothing to validate.
        return state.clone();
    };

    let request = ValidationRequest {
        last_step,
        last_result,
        next_step,
        narrative_id: state.narrative_id,
        input_object_upa: state.input_object_upa.as_deref(),
        last_data_object_upa: state.last_data_object_upa.as_deref(),
        reads_id: state.reads_id.as_deref(),
    };
    let raw = match ctx.validator.validate(&request) {
        Ok(raw) => raw,
        Err(err) => return state.with_error(format!("validation failed: {err}")),
    };
    let decision = match parse_validation_decision(&raw) {
        Ok(decision) => decision,
        Err(err) => {
            ctx.log(
                state.narrative_id,
                &format!("node=validating decision=fallback reason={err}"),
            );
            fallback_decision(&err)
        }
    };
    ctx.log(
        state.narrative_id,
        &format!(
            "node=validating continue={} modified_steps={}",
            decision.continue_as_planned,
            decision.modified_next_steps.len()
        ),
    );

    let mut next = state.clone();
    next.input_object_upa = decision
        .input_object_upa
        .clone()
        .or_else(|| state.input_object_upa.clone());
    if !decision.continue_as_planned {
        let mut steps = decision.modified_next_steps;
        match steps.len() {
            // Explicit no-op revision: the remaining queue stays untouched.
            0 => {}
            1 => {
                if let Some(step) = steps.pop() {
                    next.steps_to_run.replace_head(step);
                }
            }
            _ => next.steps_to_run.replace_all(steps),
        }
    }
    next
}

/// Terminal: fold the error into a human-readable results string.
pub fn handle_error_node(state: &WorkflowState) -> WorkflowState {
    let mut next = state.clone();
    next.awaiting_approval = false;
    let message = next.error.as_deref().unwrap_or("unknown error");
    next.results = Some(format!(
        "The analysis run stopped due to an error: {message}"
    ));
    next
}

/// Terminal: the fixed completion message.
pub fn end_node(state: &WorkflowState) -> WorkflowState {
    let mut next = state.clone();
    next.results = Some(COMPLETION_MESSAGE.to_string());
    next
}

/// Fills the step's concrete parameter values: the current input reference
/// feeds data-object inputs and declared output names (or a derived fallback)
/// feed output-name fields. Everything else falls back to spec defaults
/// during mapping.
fn derive_step_params(
    spec: &AppSpec,
    step: &AnalysisStep,
    input_object_upa: Option<&str>,
) -> Map<String, Value> {
    let mut params = Map::new();
    let inputs: Vec<String> = if step.input_objects.is_empty() {
        input_object_upa.map(|upa| upa.to_string()).into_iter().collect()
    } else {
        step.input_objects.clone()
    };
    let mut outputs = step.output_objects.iter();

    for param in &spec.parameters {
        if param.is_output_name() {
            let name = outputs
                .next()
                .cloned()
                .unwrap_or_else(|| format!("{}_{}", param.id, step.index));
            params.insert(param.id.clone(), Value::String(name));
        } else if param.is_object_field() {
            if param.allow_multiple && !inputs.is_empty() {
                params.insert(
                    param.id.clone(),
                    Value::Array(inputs.iter().cloned().map(Value::String).collect()),
                );
            } else if let Some(first) = inputs.first() {
                params.insert(param.id.clone(), Value::String(first.clone()));
            }
        }
    }
    params
}

use crate::config::Settings;
use crate::jobs::DEFAULT_POLL_INTERVAL;
use crate::services::{
    AppCatalog, ExecutionService, ObjectStore, Planner, ReportService, Validator,
};
use crate::workflow::nodes::{
    approval_node, execute_node, handle_error_node, plan_node, validate_node, NodeContext,
};
use crate::workflow::state::WorkflowState;
use std::path::PathBuf;
use std::time::Duration;

// Guard against a validator that keeps refilling the queue forever.
const MAX_ENGINE_CYCLES: u32 = 10_000;

const DEFAULT_APP_TAG: &str = "release";

/// The five-node control loop. One machine, two entry points: a planning-only
/// invocation that stops at the approval gate, and a full-execution
/// invocation that starts at validation on a pre-approved state. Every
/// transition returns a fresh, serializable state, so a caller may persist
/// it at the gate and resume arbitrarily later from another process.
pub struct PipelineEngine<'a> {
    planner: &'a dyn Planner,
    validator: &'a dyn Validator,
    catalog: &'a dyn AppCatalog,
    execution: &'a dyn ExecutionService,
    object_store: &'a dyn ObjectStore,
    reports: &'a dyn ReportService,
    app_tag: String,
    poll_interval: Duration,
    log_root: Option<PathBuf>,
}

impl<'a> PipelineEngine<'a> {
    pub fn new(
        planner: &'a dyn Planner,
        validator: &'a dyn Validator,
        catalog: &'a dyn AppCatalog,
        execution: &'a dyn ExecutionService,
        object_store: &'a dyn ObjectStore,
        reports: &'a dyn ReportService,
    ) -> Self {
        Self {
            planner,
            validator,
            catalog,
            execution,
            object_store,
            reports,
            app_tag: DEFAULT_APP_TAG.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            log_root: None,
        }
    }

    pub fn with_app_tag(mut self, app_tag: impl Into<String>) -> Self {
        self.app_tag = app_tag.into();
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_log_root(mut self, log_root: PathBuf) -> Self {
        self.log_root = Some(log_root);
        self
    }

    /// Applies the deployment settings in one step: app tag, poll interval,
    /// and the optional engine-log root.
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.app_tag = settings.app_tag.clone();
        self.poll_interval = settings.poll_interval();
        self.log_root = settings.log_root.clone();
        self
    }

    fn node_context(&self) -> NodeContext<'a> {
        NodeContext {
            planner: self.planner,
            validator: self.validator,
            catalog: self.catalog,
            execution: self.execution,
            object_store: self.object_store,
            reports: self.reports,
            app_tag: self.app_tag.clone(),
            poll_interval: self.poll_interval,
            log_root: self.log_root.clone(),
        }
    }

    /// Planning-only entry: Planning then the approval gate, then return so
    /// the caller can show the plan before committing resources.
    pub fn run_planning(
        &self,
        description: impl Into<String>,
        narrative_id: i64,
        reads_id: Option<String>,
    ) -> WorkflowState {
        let ctx = self.node_context();
        let state = WorkflowState::new(description, narrative_id, reads_id);
        let planned = plan_node(&ctx, &state);
        if planned.error.is_some() {
            return handle_error_node(&planned);
        }
        approval_node(&planned)
    }

    /// Re-applies the approval gate on a persisted state; if the gate clears,
    /// continues straight into execution.
    pub fn resume(&self, state: &WorkflowState) -> WorkflowState {
        let gated = approval_node(state);
        // Rejection and cancellation are terminal outcomes with their results
        // already written; only an error without results needs folding.
        if gated.results.is_some() {
            return gated;
        }
        if gated.error.is_some() {
            return handle_error_node(&gated);
        }
        if gated.awaiting_approval {
            return gated;
        }
        self.run_execution(&gated)
    }

    /// Full-execution entry: start at Validating on a pre-approved state and
    /// loop Execute/Validate to a terminal node.
    pub fn run_execution(&self, state: &WorkflowState) -> WorkflowState {
        let ctx = self.node_context();
        let mut current = state.clone();
        let mut cycles = 0u32;
        loop {
            if current.results.is_some() {
                return current;
            }
            if current.error.is_some() {
                return handle_error_node(&current);
            }
            if cycles >= MAX_ENGINE_CYCLES {
                return handle_error_node(
                    &current.with_error("engine exceeded maximum execution cycles"),
                );
            }
            current = validate_node(&ctx, &current);
            if current.results.is_some() {
                return current;
            }
            if current.error.is_some() {
                return handle_error_node(&current);
            }
            current = execute_node(&ctx, &current);
            cycles = cycles.saturating_add(1);
        }
    }
}

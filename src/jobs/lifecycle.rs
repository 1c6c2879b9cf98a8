use crate::appspec::mapping::{build_submission, split_property_path, RunContext};
use crate::appspec::model::AppSpec;
use crate::appspec::MappingError;
use crate::jobs::types::{CompletedJob, CreatedObject, JobState, JobStatus, JobSubmission};
use crate::services::{ExecutionService, ObjectStore, ReportService, ServiceError};
use crate::shared::refs::{is_ref, is_upa_path};
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("job `{job_id}` finished with terminal status `{status}`: {message}")]
    RemoteExecution {
        job_id: String,
        status: JobStatus,
        message: String,
    },
    #[error("job summary requires a terminal job state, got `{status}`")]
    Precondition { status: JobStatus },
    #[error("parameter mapping failed: {0}")]
    Mapping(#[from] MappingError),
    #[error("service call failed: {0}")]
    Service(#[from] ServiceError),
}

/// Drives one remote job from submission through its terminal state and folds
/// the job's side effects into a `CompletedJob`.
pub struct JobRunner<'a> {
    execution: &'a dyn ExecutionService,
    object_store: &'a dyn ObjectStore,
    reports: &'a dyn ReportService,
    poll_interval: Duration,
}

impl<'a> JobRunner<'a> {
    pub fn new(
        execution: &'a dyn ExecutionService,
        object_store: &'a dyn ObjectStore,
        reports: &'a dyn ReportService,
    ) -> Self {
        Self {
            execution,
            object_store,
            reports,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn submit(
        &self,
        spec: &AppSpec,
        user_params: &serde_json::Map<String, Value>,
        ctx: &RunContext,
    ) -> Result<String, JobError> {
        let submission = build_submission(spec, user_params, ctx, self.object_store)?;
        Ok(self.execution.submit(&submission)?)
    }

    /// Re-checks on a fixed interval until the job reaches a terminal status.
    /// There is deliberately no timeout and no cancellation hook; the poll
    /// runs until the remote job finishes or the process is killed.
    pub fn poll(&self, job_id: &str) -> Result<JobState, JobError> {
        loop {
            let state = self.execution.check(job_id)?;
            if state.status.is_terminal() {
                return Ok(state);
            }
            std::thread::sleep(self.poll_interval);
        }
    }

    /// Reconciles created objects from two independent channels: the report's
    /// objects-created list and a scan of the spec's output-name parameters
    /// against the actual job-input values. Report authorship is inconsistent
    /// across apps, so neither channel alone is authoritative.
    pub fn summarize(
        &self,
        spec: &AppSpec,
        job: &JobState,
        narrative_id: i64,
    ) -> Result<CompletedJob, JobError> {
        if !job.status.is_terminal() {
            return Err(JobError::Precondition { status: job.status });
        }

        let mut created_objects = BTreeSet::new();
        if let Some(report_upa) = &job.report_upa {
            let report = self.reports.get_report(report_upa)?;
            for object in &report.objects_created {
                let resolved = self.object_store.resolve(&object.reference)?;
                created_objects.insert(CreatedObject {
                    object_upa: resolved.upa,
                    object_name: resolved.name,
                });
            }
        }
        if let Some(job_input) = &job.job_input {
            self.scan_output_parameters(spec, job_input, &mut created_objects);
        }

        Ok(CompletedJob {
            job_id: job.job_id.clone(),
            job_status: job.status,
            job_error: job.error.clone(),
            report_upa: job.report_upa.clone(),
            created_objects,
            narrative_id,
        })
    }

    pub fn run_app(
        &self,
        spec: &AppSpec,
        user_params: &serde_json::Map<String, Value>,
        ctx: &RunContext,
    ) -> Result<CompletedJob, JobError> {
        let job_id = self.submit(spec, user_params, ctx)?;
        let terminal = self.poll(&job_id)?;
        self.summarize(spec, &terminal, ctx.workspace_id)
    }

    /// Channel two: each output-name parameter is read back out of the job's
    /// actual input and resolved within the job's workspace. Names that fail
    /// to resolve are skipped; the step may have failed before creating them.
    fn scan_output_parameters(
        &self,
        spec: &AppSpec,
        job_input: &JobSubmission,
        created_objects: &mut BTreeSet<CreatedObject>,
    ) {
        for param in &spec.parameters {
            if !param.is_output_name() {
                continue;
            }
            let Some(entry) = spec.behavior.input_mapping_for(&param.id) else {
                continue;
            };
            let Some(value) = lookup_mapped_value(job_input, entry.target_argument_position, entry.target_property.as_deref()) else {
                continue;
            };
            for name in output_name_strings(&value) {
                let reference = if is_ref(&name) || is_upa_path(&name) {
                    name
                } else {
                    format!("{}/{}", job_input.wsid, name)
                };
                if let Ok(resolved) = self.object_store.resolve(&reference) {
                    created_objects.insert(CreatedObject {
                        object_upa: resolved.upa,
                        object_name: resolved.name,
                    });
                }
            }
        }
    }
}

/// Builds the uniform error for a job that ended in `error` or `terminated`.
pub fn remote_execution_error(job: &CompletedJob) -> Option<JobError> {
    match job.job_status {
        JobStatus::Error | JobStatus::Terminated => Some(JobError::RemoteExecution {
            job_id: job.job_id.clone(),
            status: job.job_status,
            message: job
                .job_error
                .clone()
                .unwrap_or_else(|| "no error message reported".to_string()),
        }),
        _ => None,
    }
}

fn lookup_mapped_value(
    job_input: &JobSubmission,
    position: usize,
    property: Option<&str>,
) -> Option<Value> {
    let mut value = job_input.params.get(position)?;
    if let Some(path) = property {
        for segment in split_property_path(path) {
            value = value.get(segment.as_str())?;
        }
    }
    if value.is_null() {
        None
    } else {
        Some(value.clone())
    }
}

fn output_name_strings(value: &Value) -> Vec<String> {
    match value {
        Value::String(raw) if !raw.trim().is_empty() => vec![raw.trim().to_string()],
        Value::Array(items) => items.iter().flat_map(output_name_strings).collect(),
        _ => Vec::new(),
    }
}

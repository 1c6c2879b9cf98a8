use crate::appspec::AppSpec;
use crate::jobs::{CompletedJob, JobState, JobSubmission};
use crate::workflow::AnalysisStep;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod rpc;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{service} call `{method}` failed: {reason}")]
    Rpc {
        service: String,
        method: String,
        reason: String,
    },
    #[error("{service} returned a malformed response for `{method}`: {reason}")]
    MalformedResponse {
        service: String,
        method: String,
        reason: String,
    },
    #[error("object `{reference}` was not found")]
    NotFound { reference: String },
}

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A reference resolved by the object store: the fully-qualified UPA, the
/// object name, and the full reference path when the object was reached
/// through one or more intermediate references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedObject {
    pub upa: String,
    pub name: String,
    #[serde(default)]
    pub path: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(default)]
    pub objects_created: Vec<ReportObject>,
    #[serde(default)]
    pub text_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportObject {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Context handed to the validator alongside the executed/planned steps.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationRequest<'a> {
    pub last_step: &'a AnalysisStep,
    pub last_result: &'a CompletedJob,
    pub next_step: &'a AnalysisStep,
    pub narrative_id: i64,
    pub input_object_upa: Option<&'a str>,
    pub last_data_object_upa: Option<&'a str>,
    pub reads_id: Option<&'a str>,
}

pub trait Planner {
    fn plan(&self, description: &str) -> Result<Vec<AnalysisStep>, ServiceError>;
}

/// Returns the validator's raw structured output. Schema validation happens at
/// the decision boundary in `workflow::decision`, so a malformed payload
/// becomes a typed error there instead of failing inside the collaborator.
pub trait Validator {
    fn validate(&self, request: &ValidationRequest<'_>) -> Result<Value, ServiceError>;
}

pub trait ExecutionService {
    fn submit(&self, submission: &JobSubmission) -> Result<String, ServiceError>;
    fn check(&self, job_id: &str) -> Result<JobState, ServiceError>;
}

pub trait ObjectStore {
    fn resolve(&self, reference: &str) -> Result<ResolvedObject, ServiceError>;
    fn get_objects(&self, references: &[String]) -> Result<Vec<Value>, ServiceError>;
    fn workspace_name(&self, workspace_id: i64) -> Result<String, ServiceError>;
}

pub trait ReportService {
    fn get_report(&self, report_upa: &str) -> Result<Report, ServiceError>;
}

pub trait AppCatalog {
    fn get_app_spec(&self, app_id: &str, tag: &str) -> Result<AppSpec, ServiceError>;
}

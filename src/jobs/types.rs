use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// The materialized submission sent to the execution service. Field names are
/// the remote wire shape; serialize as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSubmission {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_ver: Option<String>,
    pub params: Vec<Value>,
    pub app_id: String,
    pub wsid: i64,
    pub meta: JobMeta,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_ws_objects: Vec<String>,
}

/// Opaque correlation identifiers, generated fresh per submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMeta {
    pub cell_id: String,
    pub run_id: String,
    pub tag: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Error,
    Terminated,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Terminated)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Terminated => "terminated",
        };
        f.write_str(label)
    }
}

/// A point-in-time view of a remote job as reported by the execution service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub job_input: Option<JobSubmission>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub report_upa: Option<String>,
}

/// Value type: two objects with the same UPA are the same object no matter
/// which channel reported them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CreatedObject {
    pub object_upa: String,
    pub object_name: String,
}

/// The normalized outcome of one step, produced once by the lifecycle manager
/// and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedJob {
    pub job_id: String,
    pub job_status: JobStatus,
    #[serde(default)]
    pub job_error: Option<String>,
    #[serde(default)]
    pub report_upa: Option<String>,
    #[serde(default)]
    pub created_objects: BTreeSet<CreatedObject>,
    pub narrative_id: i64,
}

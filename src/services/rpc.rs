use crate::appspec::AppSpec;
use crate::config::Settings;
use crate::jobs::{JobState, JobSubmission};
use crate::services::{
    AppCatalog, ExecutionService, ObjectStore, Report, ReportService, ResolvedObject, ServiceError,
};
use serde_json::{json, Value};

/// JSON-RPC client for the remote pipeline services. One call per request,
/// params wrapped in a single-element array, result unwrapped the same way.
#[derive(Debug, Clone)]
pub struct RpcClient {
    endpoint: String,
    service: String,
    token: Option<String>,
}

impl RpcClient {
    pub fn new(
        endpoint: impl Into<String>,
        service: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            service: service.into(),
            token,
        }
    }

    fn rpc_error(&self, method: &str, reason: impl Into<String>) -> ServiceError {
        ServiceError::Rpc {
            service: self.service.clone(),
            method: method.to_string(),
            reason: reason.into(),
        }
    }

    fn malformed(&self, method: &str, reason: impl Into<String>) -> ServiceError {
        ServiceError::MalformedResponse {
            service: self.service.clone(),
            method: method.to_string(),
            reason: reason.into(),
        }
    }

    pub fn call(&self, method: &str, params: Value) -> Result<Value, ServiceError> {
        let body = json!({
            "version": "1.1",
            "id": uuid::Uuid::new_v4().to_string(),
            "method": format!("{}.{}", self.service, method),
            "params": [params],
        });

        let mut request = ureq::post(&self.endpoint);
        if let Some(token) = &self.token {
            request = request.set("Authorization", token);
        }
        let response = request
            .send_json(body)
            .map_err(|err| self.rpc_error(method, err.to_string()))?;
        let envelope: Value = response
            .into_json()
            .map_err(|err| self.malformed(method, err.to_string()))?;

        if let Some(error) = envelope.get("error").filter(|value| !value.is_null()) {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown remote error");
            return Err(self.rpc_error(method, message));
        }
        envelope
            .get("result")
            .and_then(|result| result.get(0))
            .cloned()
            .ok_or_else(|| self.malformed(method, "missing result payload"))
    }

    fn parse<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        value: Value,
    ) -> Result<T, ServiceError> {
        serde_json::from_value(value).map_err(|err| self.malformed(method, err.to_string()))
    }
}

/// The remote-service clients a deployment needs, built from one settings
/// file. Report objects live in the object store, so the report client shares
/// its endpoint.
#[derive(Debug, Clone)]
pub struct RemoteServices {
    pub execution: ExecutionRpcClient,
    pub object_store: ObjectStoreRpcClient,
    pub reports: ReportRpcClient,
    pub catalog: CatalogRpcClient,
}

impl RemoteServices {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            execution: ExecutionRpcClient::new(
                settings.execution_url.clone(),
                settings.auth_token.clone(),
            ),
            object_store: ObjectStoreRpcClient::new(
                settings.object_store_url.clone(),
                settings.auth_token.clone(),
            ),
            reports: ReportRpcClient::new(
                settings.object_store_url.clone(),
                settings.auth_token.clone(),
            ),
            catalog: CatalogRpcClient::new(
                settings.catalog_url.clone(),
                settings.auth_token.clone(),
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionRpcClient {
    client: RpcClient,
}

impl ExecutionRpcClient {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: RpcClient::new(endpoint, "Execution", token),
        }
    }
}

impl ExecutionService for ExecutionRpcClient {
    fn submit(&self, submission: &JobSubmission) -> Result<String, ServiceError> {
        let payload = serde_json::to_value(submission)
            .map_err(|err| self.client.malformed("run_job", err.to_string()))?;
        let result = self.client.call("run_job", payload)?;
        result
            .get("job_id")
            .and_then(Value::as_str)
            .map(|job_id| job_id.to_string())
            .ok_or_else(|| self.client.malformed("run_job", "missing job_id"))
    }

    fn check(&self, job_id: &str) -> Result<JobState, ServiceError> {
        let result = self.client.call("check_job", json!({ "job_id": job_id }))?;
        self.client.parse("check_job", result)
    }
}

#[derive(Debug, Clone)]
pub struct ObjectStoreRpcClient {
    client: RpcClient,
}

impl ObjectStoreRpcClient {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: RpcClient::new(endpoint, "ObjectStore", token),
        }
    }
}

impl ObjectStore for ObjectStoreRpcClient {
    fn resolve(&self, reference: &str) -> Result<ResolvedObject, ServiceError> {
        let result = self
            .client
            .call("resolve_references", json!({ "refs": [reference] }))?;
        let resolved = result
            .get("resolved")
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .cloned()
            .ok_or_else(|| ServiceError::NotFound {
                reference: reference.to_string(),
            })?;
        if resolved.is_null() {
            return Err(ServiceError::NotFound {
                reference: reference.to_string(),
            });
        }
        self.client.parse("resolve_references", resolved)
    }

    fn get_objects(&self, references: &[String]) -> Result<Vec<Value>, ServiceError> {
        let result = self
            .client
            .call("get_objects", json!({ "refs": references }))?;
        result
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| self.client.malformed("get_objects", "missing data array"))
    }

    fn workspace_name(&self, workspace_id: i64) -> Result<String, ServiceError> {
        let result = self
            .client
            .call("get_workspace_info", json!({ "id": workspace_id }))?;
        result
            .get("name")
            .and_then(Value::as_str)
            .map(|name| name.to_string())
            .ok_or_else(|| self.client.malformed("get_workspace_info", "missing name"))
    }
}

/// Reports are plain objects in the store; this client reads one and projects
/// the report fields out of the object data payload.
#[derive(Debug, Clone)]
pub struct ReportRpcClient {
    client: RpcClient,
}

impl ReportRpcClient {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: RpcClient::new(endpoint, "ObjectStore", token),
        }
    }
}

impl ReportService for ReportRpcClient {
    fn get_report(&self, report_upa: &str) -> Result<Report, ServiceError> {
        let result = self
            .client
            .call("get_objects", json!({ "refs": [report_upa] }))?;
        let data = result
            .get("data")
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .and_then(|item| item.get("data"))
            .cloned()
            .ok_or_else(|| ServiceError::NotFound {
                reference: report_upa.to_string(),
            })?;
        self.client.parse("get_objects", data)
    }
}

#[derive(Debug, Clone)]
pub struct CatalogRpcClient {
    client: RpcClient,
}

impl CatalogRpcClient {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: RpcClient::new(endpoint, "Catalog", token),
        }
    }
}

impl AppCatalog for CatalogRpcClient {
    fn get_app_spec(&self, app_id: &str, tag: &str) -> Result<AppSpec, ServiceError> {
        let result = self
            .client
            .call("get_app_spec", json!({ "app_id": app_id, "tag": tag }))?;
        self.client.parse("get_app_spec", result)
    }
}

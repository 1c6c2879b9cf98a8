use crate::services::ServiceError;

#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("parameter `{parameter_id}` is required but resolved to null")]
    SpecValidation { parameter_id: String },
    #[error("app spec `{app_id}` is invalid: {reason}")]
    InvalidSpec { app_id: String, reason: String },
    #[error("failed to resolve object reference `{reference}`: {reason}")]
    ReferenceResolution { reference: String, reason: String },
    #[error("generated value is invalid: {reason}")]
    Generation { reason: String },
    #[error("unsupported parameter transform `{transform}`")]
    UnsupportedTransform { transform: String },
    #[error("cannot coerce value `{value}` into {target}")]
    Coercion { value: String, target: String },
    #[error("collaborator call failed: {0}")]
    Service(#[from] ServiceError),
}

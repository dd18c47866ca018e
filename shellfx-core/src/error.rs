//! Error taxonomy shared by both effect controllers.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FxError {
    /// Unbound shader/mesh or an out-of-range parameter. Raised at activation
    /// or when a configuration edit is rejected.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A transient or long-lived host resource could not be allocated.
    #[error("resource allocation failed: {0}")]
    ResourceAllocation(String),
    /// Lifecycle method called in the wrong state (e.g. activate twice).
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
    /// A handle did not resolve to a live host resource.
    #[error("missing resource: {0}")]
    MissingResource(String),
    #[error("shader '{shader}' failed in pass {pass}: {reason}")]
    Shader { shader: String, pass: u32, reason: String },
}

impl FxError {
    pub fn config(msg: impl Into<String>) -> Self { FxError::Configuration(msg.into()) }
    pub fn alloc(msg: impl Into<String>) -> Self { FxError::ResourceAllocation(msg.into()) }

    pub fn is_configuration(&self) -> bool { matches!(self, FxError::Configuration(_)) }
    pub fn is_resource_allocation(&self) -> bool { matches!(self, FxError::ResourceAllocation(_)) }
}

pub type FxResult<T> = Result<T, FxError>;

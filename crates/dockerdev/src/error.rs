//! Error types for the dockerdev platform.

use resource_framework::{ErrorCode, ManagerError, ResourceError};
use thiserror::Error;

/// Failures reported by a [`ContainerEngine`](crate::engine::ContainerEngine).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    /// The engine answered 404 for the requested object.
    #[error("not found: {0}")]
    NotFound(String),

    /// The engine could not be reached at all.
    #[error("unable to connect to container engine: {0}")]
    Connection(String),

    /// Any other engine-side failure.
    #[error("container engine error: {0}")]
    Api(String),
}

impl EngineError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound(_))
    }
}

impl From<bollard::errors::Error> for EngineError {
    fn from(err: bollard::errors::Error) -> Self {
        match err {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404,
                message,
            } => EngineError::NotFound(message),
            other => EngineError::Api(other.to_string()),
        }
    }
}

/// Malformed values in the platform configuration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("invalid port field {0:?}")]
    InvalidPortField(String),

    #[error("invalid port/protocol format {0:?}")]
    InvalidProtoField(String),

    #[error("invalid port number {0:?}")]
    InvalidPortNumber(String),

    #[error("invalid memory size {value:?}: {reason}")]
    InvalidMemory { value: String, reason: String },

    #[error("invalid cpu shares {0:?}")]
    InvalidCpu(String),
}

impl From<ParseError> for ResourceError {
    fn from(err: ParseError) -> Self {
        ResourceError::invalid_argument(err.to_string())
    }
}

/// Errors surfaced by [`Platform`](crate::platform::Platform) entry points.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("invalid platform configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("unable to create container engine client: {0}")]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Manager(#[from] ManagerError),

    #[error("{0}")]
    Internal(String),
}

impl PlatformError {
    pub fn code(&self) -> ErrorCode {
        match self {
            PlatformError::Config(_) => ErrorCode::InvalidArgument,
            PlatformError::Engine(_) => ErrorCode::FailedPrecondition,
            PlatformError::Manager(e) => e.code(),
            PlatformError::Internal(_) => ErrorCode::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docker_404_maps_to_not_found() {
        let err: EngineError = bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message: "No such container: abc".into(),
        }
        .into();
        assert!(err.is_not_found());

        let err: EngineError = bollard::errors::Error::DockerResponseServerError {
            status_code: 500,
            message: "boom".into(),
        }
        .into();
        assert!(!err.is_not_found());
    }

    #[test]
    fn parse_errors_are_invalid_arguments() {
        let err: ResourceError = ParseError::InvalidPortField("a:b:c".into()).into();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }
}

//! # Framework Errors
//!
//! Two layers of errors live here. [`ResourceError`] is what a single lifecycle
//! hook returns; [`ManagerError`] is what the [`ResourceManager`](crate::ResourceManager)
//! returns, wrapping hook failures with the name of the resource that failed.

use std::fmt;

/// Coarse classification surfaced to callers of a deployment operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    FailedPrecondition,
    InvalidArgument,
    Internal,
}

/// Errors returned by a resource's lifecycle hooks.
///
/// The variants follow the classification the deployment surface reports to
/// its callers: a precondition the remote engine did not meet, a malformed
/// input, or an internal inconsistency.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResourceError {
    /// The remote engine was unreachable or refused the operation.
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    /// An input (port spec, resource limit, image name) could not be parsed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// State or data was inconsistent in a way that retrying cannot fix.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ResourceError {
    pub fn precondition(msg: impl Into<String>) -> Self {
        ResourceError::FailedPrecondition(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        ResourceError::InvalidArgument(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ResourceError::Internal(msg.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ResourceError::FailedPrecondition(_) => ErrorCode::FailedPrecondition,
            ResourceError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            ResourceError::Internal(_) => ErrorCode::Internal,
        }
    }
}

/// Errors returned by the resource manager.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("resource {name:?} failed to create: {source}")]
    Create {
        name: String,
        #[source]
        source: ResourceError,
    },

    #[error("{0}")]
    Destroy(DestroyFailures),

    #[error("resource {name:?} failed to report status: {source}")]
    Status {
        name: String,
        #[source]
        source: ResourceError,
    },

    #[error("resource {0:?} is not registered with this manager")]
    UnknownResource(String),

    #[error("resource {0:?} is already registered")]
    DuplicateResource(String),

    #[error("state for resource {name:?} has shape {found:?}, expected {expected:?}")]
    StateMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("failed to encode state of resource {name:?}: {source}")]
    Encode {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode state of resource {name:?}: {source}")]
    Decode {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ManagerError {
    /// Hook failures keep the hook's classification; everything else is internal.
    pub fn code(&self) -> ErrorCode {
        match self {
            ManagerError::Create { source, .. } | ManagerError::Status { source, .. } => source.code(),
            ManagerError::Destroy(failures) => failures
                .failures
                .first()
                .map(|(_, e)| e.code())
                .unwrap_or(ErrorCode::Internal),
            _ => ErrorCode::Internal,
        }
    }
}

/// Every destroy failure collected during a best-effort teardown.
#[derive(Debug, Default)]
pub struct DestroyFailures {
    pub failures: Vec<(String, ResourceError)>,
}

impl DestroyFailures {
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn push(&mut self, name: impl Into<String>, error: ResourceError) {
        self.failures.push((name.into(), error));
    }
}

impl fmt::Display for DestroyFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to destroy {} resource(s)", self.failures.len())?;
        for (name, error) in &self.failures {
            write!(f, "; {name}: {error}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destroy_failures_lists_every_resource() {
        let mut failures = DestroyFailures::default();
        failures.push("container", ResourceError::precondition("engine down"));
        failures.push("volume", ResourceError::internal("no id"));

        let msg = ManagerError::Destroy(failures).to_string();
        assert_eq!(
            msg,
            "failed to destroy 2 resource(s); container: failed precondition: engine down; \
             volume: internal error: no id"
        );
    }

    #[test]
    fn hook_failures_keep_their_code() {
        let err = ManagerError::Create {
            name: "container".into(),
            source: ResourceError::invalid_argument("bad port"),
        };
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert_eq!(
            ManagerError::UnknownResource("volume".into()).code(),
            ErrorCode::Internal
        );
    }
}

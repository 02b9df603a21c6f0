//! Error types for the RBAC engine

use thiserror::Error;

use crate::pattern::PatternError;

/// Message used when a permission check is requested without any pattern
pub(crate) const INVALID_CHECK_PARAMS: &str = "invalid check params";

/// RBAC engine errors
#[derive(Debug, Error)]
pub enum RbacError {
    /// Permission constructed with an empty name
    #[error("empty permission name")]
    EmptyPermissionName,

    /// Permission name contains a wildcard
    #[error("invalid permission name: {0}")]
    InvalidPermissionName(String),

    /// Resource permission without a resource type
    #[error("invalid resource type")]
    InvalidResourceType,

    /// Owning permissions can only be registered for a resource type
    #[error("resource type required")]
    ResourceTypeRequired,

    /// Option applied to an object which does not support it
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// Option parameter is not valid for the target
    #[error("invalid option param: {0}")]
    InvalidOptionParam(String),

    /// Pattern syntax error
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// External role loader failure
    #[error("role loader error: {0}")]
    Loader(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl RbacError {
    /// Wrap an error returned by an external role source
    pub fn loader<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Loader(err.into())
    }
}

/// Result type for RBAC operations
pub type Result<T> = std::result::Result<T, RbacError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(RbacError::EmptyPermissionName.to_string(), "empty permission name");
        assert_eq!(RbacError::ResourceTypeRequired.to_string(), "resource type required");
        assert_eq!(
            RbacError::InvalidOption("with_child_roles".into()).to_string(),
            "invalid option: with_child_roles"
        );
    }

    #[test]
    fn test_loader_error_keeps_source() {
        let err = RbacError::loader("backend unavailable");
        assert!(matches!(err, RbacError::Loader(_)));
        assert_eq!(err.to_string(), "role loader error: backend unavailable");
        assert!(std::error::Error::source(&err).is_some());
    }
}

//! Permissions bound to a resource type

use crate::error::{RbacError, Result};
use crate::options::Opt;
use crate::pattern::match_resource_pattern;
use crate::resource::{ResourceRef, ResourceType};

use super::PermissionData;

/// Permission scoped to a resource type
///
/// Its qualified name is `<resource name>.<name>`. Requests may use either
/// the qualified name or the local one; both are resolved against the
/// resource name.
#[derive(Clone, Debug)]
pub struct ResourcePermission {
    pub(super) data: PermissionData,
    resource_type: ResourceType,
    qualified_name: String,
}

impl ResourcePermission {
    /// Creates a permission for the resource type
    ///
    /// # Errors
    ///
    /// Returns [`RbacError::InvalidResourceType`] if no type is given.
    pub fn new(
        name: impl Into<String>,
        resource_type: Option<ResourceType>,
        options: impl IntoIterator<Item = Opt>,
    ) -> Result<Self> {
        let name = name.into();
        super::validate_permission_name(&name)?;
        let resource_type = resource_type.ok_or(RbacError::InvalidResourceType)?;
        let data = PermissionData::build(name, Some(&resource_type), options)?;
        let qualified_name = format!("{}.{}", resource_type.name(), data.name);
        Ok(Self {
            data,
            resource_type,
            qualified_name,
        })
    }

    /// Qualified name
    pub fn name(&self) -> &str {
        &self.qualified_name
    }

    pub fn resource_name(&self) -> &str {
        self.resource_type.name()
    }

    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    /// Returns true if the resource is exactly of the bound type
    pub fn check_type(&self, resource: ResourceRef<'_>) -> bool {
        self.resource_type.accepts(resource)
    }

    pub(super) fn matches_request(&self, resource: ResourceRef<'_>, patterns: &[&str]) -> bool {
        match_resource_pattern(self.resource_type.name(), &self.data.name, patterns)
            && self.check_type(resource)
    }
}

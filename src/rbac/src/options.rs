//! Construction options for permissions and roles
//!
//! Options are applied in order when a [`Permission`] or [`Role`] is built.
//! Each one is validated against its target; applying an option to an
//! object which does not support it fails with
//! [`RbacError::InvalidOption`].
//!
//! ```
//! use cretoai_rbac::options::{with_description, with_permissions};
//! use cretoai_rbac::{Permission, Role};
//!
//! let role = Role::new("viewer", [
//!     with_description("Read only access"),
//!     with_permissions([Permission::must_simple("report.view", [])]),
//! ]).unwrap();
//! assert_eq!(role.description(), "Read only access");
//! ```

use crate::check::CustomCheck;
use crate::context::ExtData;
use crate::error::{RbacError, Result};
use crate::permission::{Permission, PermissionData};
use crate::resource::ResourceType;
use crate::role::Role;

/// Permission given to [`with_permissions`]
#[derive(Clone, Debug)]
pub enum PermissionEntry {
    /// Resolved permission
    Permission(Permission),
    /// Pattern resolved against the manager's permissions when a role is
    /// prepared
    Pattern(String),
}

impl From<Permission> for PermissionEntry {
    fn from(perm: Permission) -> Self {
        Self::Permission(perm)
    }
}

impl From<&str> for PermissionEntry {
    fn from(pattern: &str) -> Self {
        Self::Pattern(pattern.to_string())
    }
}

impl From<String> for PermissionEntry {
    fn from(pattern: String) -> Self {
        Self::Pattern(pattern)
    }
}

/// Construction option
#[derive(Clone, Debug)]
pub enum Opt {
    Description(String),
    ChildRoles(Vec<Role>),
    Permissions(Vec<PermissionEntry>),
    CustomCheck {
        check: CustomCheck,
        ext_data: Option<ExtData>,
    },
    WithoutCustomCheck,
    ExtData(ExtData),
}

/// Sets the description of a role or permission
pub fn with_description(description: impl Into<String>) -> Opt {
    Opt::Description(description.into())
}

/// Sets the child roles of a role
pub fn with_child_roles(roles: impl IntoIterator<Item = Role>) -> Opt {
    Opt::ChildRoles(roles.into_iter().collect())
}

/// Sets child permissions
///
/// Roles additionally accept patterns which are resolved when the role is
/// prepared by the manager.
pub fn with_permissions<I, P>(entries: I) -> Opt
where
    I: IntoIterator<Item = P>,
    P: Into<PermissionEntry>,
{
    Opt::Permissions(entries.into_iter().map(Into::into).collect())
}

/// Sets a custom check together with its user data
///
/// The data replaces anything attached earlier; `None` removes it.
pub fn with_custom_check(check: CustomCheck, ext_data: Option<ExtData>) -> Opt {
    Opt::CustomCheck { check, ext_data }
}

/// Removes a custom check, e.g. one inherited from a registered object
pub fn without_custom_check() -> Opt {
    Opt::WithoutCustomCheck
}

/// Attaches user data
pub fn with_ext_data(data: ExtData) -> Opt {
    Opt::ExtData(data)
}

impl Opt {
    /// Name of the option, used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            Self::Description(_) => "with_description",
            Self::ChildRoles(_) => "with_child_roles",
            Self::Permissions(_) => "with_permissions",
            Self::CustomCheck { .. } => "with_custom_check",
            Self::WithoutCustomCheck => "without_custom_check",
            Self::ExtData(_) => "with_ext_data",
        }
    }

    pub(crate) fn apply_to_permission(
        self,
        data: &mut PermissionData,
        resource_type: Option<&ResourceType>,
    ) -> Result<()> {
        let name = self.name();
        match self {
            Self::Description(description) => data.description = description,
            Self::Permissions(entries) => {
                let mut children = Vec::with_capacity(entries.len());
                for entry in entries {
                    match entry {
                        PermissionEntry::Permission(perm) => children.push(perm),
                        PermissionEntry::Pattern(pattern) => {
                            return Err(RbacError::InvalidOptionParam(format!(
                                "{name}: preload pattern `{pattern}` not allowed for permissions"
                            )))
                        }
                    }
                }
                data.children = children;
            }
            Self::CustomCheck { check, ext_data } => {
                if let (Some(bound), Some(declared)) = (resource_type, check.resource_type()) {
                    if bound != declared {
                        return Err(RbacError::InvalidOptionParam(format!(
                            "{name}: check declared for {declared} but permission is bound to {bound}"
                        )));
                    }
                }
                data.check = Some(check);
                data.ext_data = ext_data;
            }
            Self::WithoutCustomCheck => data.check = None,
            Self::ExtData(ext_data) => data.ext_data = Some(ext_data),
            Self::ChildRoles(_) => return Err(RbacError::InvalidOption(name.to_string())),
        }
        Ok(())
    }

    pub(crate) fn apply_to_role(self, role: &mut Role) -> Result<()> {
        let name = self.name();
        match self {
            Self::Description(description) => role.description = description,
            Self::ChildRoles(roles) => role.roles = roles,
            Self::Permissions(entries) => {
                let mut permissions = Vec::new();
                let mut patterns = Vec::new();
                for entry in entries {
                    match entry {
                        PermissionEntry::Permission(perm) => permissions.push(perm),
                        PermissionEntry::Pattern(pattern) => patterns.push(pattern),
                    }
                }
                role.permissions.clear();
                role.add_permissions(permissions);
                role.preload_patterns = patterns;
            }
            Self::ExtData(ext_data) => role.ext_data = Some(ext_data),
            Self::CustomCheck { .. } | Self::WithoutCustomCheck => {
                return Err(RbacError::InvalidOption(name.to_string()))
            }
        }
        Ok(())
    }
}

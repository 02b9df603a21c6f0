//! Permissions
//!
//! A permission is a named capability which may carry child permissions,
//! a custom check and opaque user data. It comes in two variants:
//!
//! - [`SimplePermission`]: a flat name matched as is
//! - [`ResourcePermission`]: a name scoped to a [`Resource`] type, exposed as
//!   `<resource name>.<name>` and only satisfied by instances of that type
//!
//! # Example
//!
//! ```
//! use cretoai_rbac::{Context, Permission, Resource};
//!
//! struct User;
//! impl Resource for User {}
//!
//! let view = Permission::must_resource_of::<User>("view", []);
//! assert!(view.name().ends_with("User.view"));
//! assert!(view.check_permissions(&Context::new(), &User, &["view"]));
//! ```
//!
//! [`Resource`]: crate::resource::Resource

mod resource;
mod simple;


pub use self::resource::ResourcePermission;
pub use self::simple::SimplePermission;

use std::fmt;

use crate::check::CustomCheck;
use crate::context::{Context, ExtData};
use crate::error::{RbacError, Result, INVALID_CHECK_PARAMS};
use crate::options::Opt;
use crate::resource::{Resource, ResourceRef, ResourceType};

/// Fields shared by both permission variants
#[derive(Clone, Debug, Default)]
pub(crate) struct PermissionData {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) ext_data: Option<ExtData>,
    pub(crate) check: Option<CustomCheck>,
    pub(crate) children: Vec<Permission>,
}

impl PermissionData {
    /// Validates the name and applies the options in order
    pub(crate) fn build(
        name: String,
        resource_type: Option<&ResourceType>,
        options: impl IntoIterator<Item = Opt>,
    ) -> Result<Self> {
        validate_permission_name(&name)?;
        let mut data = Self {
            name,
            ..Default::default()
        };
        for opt in options {
            opt.apply_to_permission(&mut data, resource_type)?;
        }
        Ok(data)
    }
}

/// Permission with its variant
#[derive(Clone, Debug)]
pub enum Permission {
    /// Flat permission
    Simple(SimplePermission),
    /// Permission bound to a resource type
    Resource(ResourcePermission),
}

impl Permission {
    /// Creates a simple permission
    ///
    /// # Errors
    ///
    /// Fails on an empty name, a name containing `*`, or an option that
    /// cannot be applied to a permission.
    pub fn simple(name: impl Into<String>, options: impl IntoIterator<Item = Opt>) -> Result<Self> {
        SimplePermission::new(name, options).map(Self::Simple)
    }

    /// Creates a simple permission, panicking on error
    pub fn must_simple(name: impl Into<String>, options: impl IntoIterator<Item = Opt>) -> Self {
        Self::simple(name, options).unwrap_or_else(|err| panic!("{err}"))
    }

    /// Creates a permission bound to a resource type
    ///
    /// # Errors
    ///
    /// Fails with [`RbacError::InvalidResourceType`] when no type is given,
    /// otherwise as [`Permission::simple`]. A typed custom check declared
    /// for another resource type is rejected.
    pub fn resource(
        name: impl Into<String>,
        resource_type: Option<ResourceType>,
        options: impl IntoIterator<Item = Opt>,
    ) -> Result<Self> {
        ResourcePermission::new(name, resource_type, options).map(Self::Resource)
    }

    /// Creates a permission bound to `R`
    pub fn resource_of<R: Resource>(
        name: impl Into<String>,
        options: impl IntoIterator<Item = Opt>,
    ) -> Result<Self> {
        Self::resource(name, Some(ResourceType::of::<R>()), options)
    }

    /// Creates a permission bound to `R`, panicking on error
    pub fn must_resource_of<R: Resource>(
        name: impl Into<String>,
        options: impl IntoIterator<Item = Opt>,
    ) -> Self {
        Self::resource_of::<R>(name, options).unwrap_or_else(|err| panic!("{err}"))
    }

    fn data(&self) -> &PermissionData {
        match self {
            Self::Simple(p) => &p.data,
            Self::Resource(p) => &p.data,
        }
    }

    /// Fully qualified name
    pub fn name(&self) -> &str {
        match self {
            Self::Simple(p) => p.name(),
            Self::Resource(p) => p.name(),
        }
    }

    /// Name without the resource prefix
    pub fn local_name(&self) -> &str {
        &self.data().name
    }

    pub fn description(&self) -> &str {
        &self.data().description
    }

    /// User data attached at construction
    pub fn ext(&self) -> Option<&ExtData> {
        self.data().ext_data.as_ref()
    }

    pub fn custom_check(&self) -> Option<&CustomCheck> {
        self.data().check.as_ref()
    }

    pub fn child_permissions(&self) -> &[Permission] {
        &self.data().children
    }

    /// Bound resource type, `None` for simple permissions
    pub fn resource_type(&self) -> Option<&ResourceType> {
        match self {
            Self::Simple(_) => None,
            Self::Resource(p) => Some(p.resource_type()),
        }
    }

    /// Returns true if the resource is an acceptable subject
    ///
    /// Simple permissions accept any resource.
    pub fn check_type(&self, resource: ResourceRef<'_>) -> bool {
        match self {
            Self::Simple(_) => true,
            Self::Resource(p) => p.check_type(resource),
        }
    }

    /// Checks whether this permission or one of its children grants any of
    /// the patterns for the resource
    ///
    /// # Panics
    ///
    /// Panics if `patterns` is empty.
    pub fn check_permissions<'r>(
        &self,
        ctx: &Context,
        resource: impl Into<ResourceRef<'r>>,
        patterns: &[&str],
    ) -> bool {
        assert!(!patterns.is_empty(), "{INVALID_CHECK_PARAMS}");
        self.checked(ctx, resource.into(), patterns).is_some()
    }

    /// Returns the permission node which granted the request
    pub fn checked_permissions<'r>(
        &self,
        ctx: &Context,
        resource: impl Into<ResourceRef<'r>>,
        patterns: &[&str],
    ) -> Option<&Permission> {
        if patterns.is_empty() {
            return None;
        }
        self.checked(ctx, resource.into(), patterns)
    }

    pub(crate) fn checked(
        &self,
        ctx: &Context,
        resource: ResourceRef<'_>,
        patterns: &[&str],
    ) -> Option<&Permission> {
        let matched = match self {
            Self::Simple(p) => p.matches_request(patterns),
            // Resource permissions never grant without a resource
            Self::Resource(_) if resource.is_none() => return None,
            Self::Resource(p) => p.matches_request(resource, patterns),
        };
        if matched && self.call_check(ctx, resource) {
            return Some(self);
        }
        self.child_permissions()
            .iter()
            .find_map(|child| child.checked(ctx, resource, patterns))
    }

    fn call_check(&self, ctx: &Context, resource: ResourceRef<'_>) -> bool {
        self.custom_check()
            .map_or(true, |check| check.call(ctx, resource, self))
    }

    /// Returns true if the qualified name matches any of the patterns
    pub fn match_permission_pattern(&self, patterns: &[&str]) -> bool {
        crate::pattern::match_any(self.name(), patterns)
    }

    /// Finds this permission or a descendant by qualified name
    pub fn permission(&self, name: &str) -> Option<&Permission> {
        if self.name() == name {
            return Some(self);
        }
        self.child_permissions()
            .iter()
            .find_map(|child| child.permission(name))
    }

    /// Lists this permission and its descendants matching the patterns
    ///
    /// This is a static listing; custom checks are not evaluated.
    pub fn permissions(&self, patterns: &[&str]) -> Vec<&Permission> {
        let mut found = Vec::new();
        if !patterns.is_empty() {
            self.collect_matching(patterns, &mut found);
        }
        found
    }

    fn collect_matching<'a>(&'a self, patterns: &[&str], found: &mut Vec<&'a Permission>) {
        if self.match_permission_pattern(patterns) {
            found.push(self);
        }
        for child in self.child_permissions() {
            child.collect_matching(patterns, found);
        }
    }

    /// Visits this permission and all descendants in pre-order
    pub(crate) fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Permission)) {
        visit(self);
        for child in self.child_permissions() {
            child.walk(visit);
        }
    }

    /// Returns true if this permission or a descendant matches the patterns
    pub fn has_permission(&self, patterns: &[&str]) -> bool {
        self.match_permission_pattern(patterns) || !self.permissions(patterns).is_empty()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) fn validate_permission_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(RbacError::EmptyPermissionName);
    }
    if name.contains('*') {
        return Err(RbacError::InvalidPermissionName(format!(
            "permission name contains wildcard * -> {name}"
        )));
    }
    Ok(())
}

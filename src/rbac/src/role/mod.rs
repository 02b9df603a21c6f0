//! Roles
//!
//! A role groups permissions and child roles. Checking a role checks its
//! own permissions first and then recurses into child roles in the order
//! they were given; the first grant wins.
//!
//! Roles may also declare permission patterns (`app.*.view.*`) instead of
//! concrete permissions. Those are resolved once against a
//! [`PermissionReader`] by [`Role::prepare`]; the manager hands out only
//! prepared roles.
//!
//! # Example
//!
//! ```
//! use cretoai_rbac::options::{with_child_roles, with_permissions};
//! use cretoai_rbac::{Context, Permission, ResourceRef, Role};
//!
//! let viewer = Role::must_new("viewer", [
//!     with_permissions([Permission::must_simple("svc.obj.view", [])]),
//! ]);
//! let admin = Role::must_new("admin", [with_child_roles([viewer])]);
//!
//! let ctx = Context::new();
//! assert!(admin.has_role("viewer"));
//! assert!(admin.check_permissions(&ctx, ResourceRef::none(), &["svc.*.view"]));
//! assert!(!admin.check_permissions(&ctx, ResourceRef::none(), &["view"]));
//! ```


use std::collections::HashSet;
use std::fmt;

use tracing::debug;

use crate::context::{Context, ExtData};
use crate::error::{Result, INVALID_CHECK_PARAMS};
use crate::options::Opt;
use crate::permission::Permission;
use crate::resource::ResourceRef;

/// Source of registered permissions used to resolve preload patterns
pub trait PermissionReader {
    /// Registered permissions matching any of the patterns
    fn permissions(&self, patterns: &[&str]) -> Vec<Permission>;
}

/// Named set of permissions and child roles
#[derive(Clone, Default)]
pub struct Role {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) permissions: Vec<Permission>,
    pub(crate) roles: Vec<Role>,
    pub(crate) preload_patterns: Vec<String>,
    pub(crate) ext_data: Option<ExtData>,
}

impl Role {
    /// Creates a role
    ///
    /// # Errors
    ///
    /// Fails if an option cannot be applied to a role.
    pub fn new(name: impl Into<String>, options: impl IntoIterator<Item = Opt>) -> Result<Self> {
        let mut role = Self {
            name: name.into(),
            ..Default::default()
        };
        for opt in options {
            opt.apply_to_role(&mut role)?;
        }
        Ok(role)
    }

    /// Creates a role, panicking on error
    pub fn must_new(name: impl Into<String>, options: impl IntoIterator<Item = Opt>) -> Self {
        Self::new(name, options).unwrap_or_else(|err| panic!("{err}"))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn ext(&self) -> Option<&ExtData> {
        self.ext_data.as_ref()
    }

    pub fn child_roles(&self) -> &[Role] {
        &self.roles
    }

    /// Permissions owned directly by this role
    pub fn child_permissions(&self) -> &[Permission] {
        &self.permissions
    }

    /// Patterns still waiting to be resolved
    pub fn preload_patterns(&self) -> &[String] {
        &self.preload_patterns
    }

    /// Checks whether the role grants any of the patterns for the resource
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

    /// Returns the permission which granted the request
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

    fn checked(&self, ctx: &Context, resource: ResourceRef<'_>, patterns: &[&str]) -> Option<&Permission> {
        self.permissions
            .iter()
            .find_map(|perm| perm.checked(ctx, resource, patterns))
            .or_else(|| {
                self.roles
                    .iter()
                    .find_map(|role| role.checked(ctx, resource, patterns))
            })
    }

    /// Roles are containers, never grantable capabilities
    pub fn match_permission_pattern(&self, _patterns: &[&str]) -> bool {
        false
    }

    /// Lists all permissions of the role and its child roles
    ///
    /// An empty pattern list or `*` returns everything. Permissions are
    /// listed once per name, first occurrence first.
    pub fn permissions(&self, patterns: &[&str]) -> Vec<&Permission> {
        let everything = patterns.is_empty() || patterns == ["*"];
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        self.walk_permissions(&mut |perm| {
            if (everything || perm.match_permission_pattern(patterns)) && seen.insert(perm.name()) {
                found.push(perm);
            }
        });
        found
    }

    fn walk_permissions<'a>(&'a self, visit: &mut impl FnMut(&'a Permission)) {
        for perm in &self.permissions {
            perm.walk(visit);
        }
        for role in &self.roles {
            role.walk_permissions(visit);
        }
    }

    /// Returns true if any permission in the hierarchy matches the patterns
    pub fn has_permission(&self, patterns: &[&str]) -> bool {
        self.match_permission_pattern(patterns) || !self.permissions(patterns).is_empty()
    }

    /// Finds a permission by qualified name anywhere in the hierarchy
    pub fn permission(&self, name: &str) -> Option<&Permission> {
        self.permissions
            .iter()
            .find_map(|perm| perm.permission(name))
            .or_else(|| self.roles.iter().find_map(|role| role.permission(name)))
    }

    /// Finds this role or a descendant by name
    pub fn role(&self, name: &str) -> Option<&Role> {
        if self.name == name {
            return Some(self);
        }
        self.roles.iter().find_map(|role| role.role(name))
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.role(name).is_some()
    }

    /// Adds permissions, skipping names already present
    pub fn add_permissions(&mut self, permissions: impl IntoIterator<Item = Permission>) {
        let mut seen: HashSet<String> = self
            .permissions
            .iter()
            .map(|perm| perm.name().to_string())
            .collect();
        for perm in permissions {
            if seen.insert(perm.name().to_string()) {
                self.permissions.push(perm);
            }
        }
    }

    /// Returns true when no preload pattern is pending in the hierarchy
    pub fn is_prepared(&self) -> bool {
        self.preload_patterns.is_empty() && self.roles.iter().all(Role::is_prepared)
    }

    /// Resolves pending preload patterns against the reader
    ///
    /// Resolved permissions are merged after the existing ones. Calling it
    /// again is a no-op.
    pub fn prepare<R: PermissionReader + ?Sized>(&mut self, reader: &R) {
        if !self.preload_patterns.is_empty() {
            let patterns = std::mem::take(&mut self.preload_patterns);
            let patterns: Vec<&str> = patterns.iter().map(String::as_str).collect();
            let resolved = reader.permissions(&patterns);
            debug!(
                role = %self.name,
                patterns = ?patterns,
                resolved = resolved.len(),
                "role preload permissions resolved"
            );
            self.add_permissions(resolved);
        }
        for role in &mut self.roles {
            role.prepare(reader);
        }
    }

    /// Returns true if every permission listed by `other` is granted by
    /// this role, compared by name
    pub fn includes(&self, other: &Role) -> bool {
        let own: HashSet<&str> = self.permissions(&[]).into_iter().map(Permission::name).collect();
        other
            .permissions(&[])
            .into_iter()
            .all(|perm| own.contains(perm.name()))
    }
}

impl fmt::Debug for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Role")
            .field("name", &self.name)
            .field("permissions", &self.permissions.iter().map(Permission::name).collect::<Vec<_>>())
            .field("roles", &self.roles)
            .field("preload_patterns", &self.preload_patterns)
            .finish()
    }
}

//! Registry of permissions, roles and resource types
//!
//! The [`Manager`] owns the global permission table, the locally registered
//! roles and the resource types known to the engine. It is constructed
//! explicitly and shared by reference; every method takes `&self`.
//!
//! Roles may additionally come from an external [`RoleAccessors`] source,
//! usually a [`CachedRoleLoader`]. Those roles are prepared (their preload
//! patterns resolved against the permission table) before they are handed
//! out, so callers only ever see prepared roles.
//!
//! # Example
//!
//! ```
//! use cretoai_rbac::options::with_permissions;
//! use cretoai_rbac::{Context, Manager, Resource, ResourceType, Role};
//!
//! struct Invoice;
//! impl Resource for Invoice {
//!     fn resource_name() -> String {
//!         "billing.Invoice".to_string()
//!     }
//! }
//!
//! let manager = Manager::new();
//! manager.register_object_of::<Invoice>(None);
//! manager
//!     .register_new_owning_permissions(Some(&ResourceType::of::<Invoice>()), &["view"], [])
//!     .unwrap();
//! manager.register_role([Role::must_new("auditor", [with_permissions(["billing.*.view.*"])])]);
//!
//! let ctx = Context::new();
//! let auditor = manager.role(&ctx, "auditor").unwrap().unwrap();
//! assert_eq!(auditor.child_permissions().len(), 3);
//! assert!(auditor.check_permissions(&ctx, &Invoice, &["view.all"]));
//! ```

mod loader;

pub use self::loader::{CachedRoleLoader, LoaderStats, RoleAccessors, RoleLoader};

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::check::CustomCheck;
use crate::config::ManagerConfig;
use crate::context::Context;
use crate::error::{RbacError, Result};
use crate::options::{with_custom_check, Opt};
use crate::permission::Permission;
use crate::resource::{Resource, ResourceRef, ResourceType};
use crate::role::{PermissionReader, Role};

/// The owner of the object (creator or assigned owner)
pub const OWN_OWNER: &str = "owner";
/// The owner of the account the object belongs to
pub const OWN_ACCOUNT: &str = "account";
/// Any object of the type
pub const OWN_ALL: &str = "all";

/// Suffixes appended by [`Manager::register_new_owning_permissions`]
pub const OWNING_SUFFIXES: [&str; 3] = [OWN_OWNER, OWN_ACCOUNT, OWN_ALL];

/// Registered resource type
#[derive(Clone, Debug)]
struct ObjectItem {
    resource_type: ResourceType,
    /// Default check for permissions registered for the type
    check: Option<CustomCheck>,
}

#[derive(Default)]
struct Registry {
    roles: BTreeMap<String, Arc<Role>>,
    permissions: BTreeMap<String, Permission>,
    /// Keyed by resource name
    objects: HashMap<String, ObjectItem>,
}

impl Registry {
    fn object(&self, resource_name: &str, resource_type: &ResourceType) -> Option<&ObjectItem> {
        self.objects
            .get(resource_name)
            .filter(|item| item.resource_type == *resource_type)
    }
}

/// Prepared copy of an externally sourced role
struct PreparedRole {
    /// Snapshot entry the copy was made from
    source: Weak<Role>,
    role: Arc<Role>,
}

/// Registry of roles and permissions
pub struct Manager {
    accessors: Option<Arc<dyn RoleAccessors>>,
    registry: RwLock<Registry>,
    /// Prepared external roles by name, valid while `source` is the live
    /// snapshot entry
    prepared: DashMap<String, PreparedRole>,
}

impl Manager {
    /// Creates a manager with locally registered roles only
    pub fn new() -> Self {
        Self {
            accessors: None,
            registry: RwLock::new(Registry::default()),
            prepared: DashMap::new(),
        }
    }

    /// Creates a manager reading roles from an external source first
    pub fn with_accessors(accessors: Arc<dyn RoleAccessors>) -> Self {
        Self {
            accessors: Some(accessors),
            ..Self::new()
        }
    }

    /// Creates a manager over a loader cached for `ttl`
    pub fn with_loader(loader: Arc<dyn RoleLoader>, ttl: Duration) -> Self {
        Self::with_accessors(Arc::new(CachedRoleLoader::new(loader, ttl)))
    }

    /// Creates a manager over a loader cached as configured
    pub fn from_config(config: &ManagerConfig, loader: Arc<dyn RoleLoader>) -> Self {
        Self::with_loader(loader, config.role_cache_ttl())
    }

    // ------------------------------------------------------------------
    // Resource types
    // ------------------------------------------------------------------

    /// Registers a resource type with an optional default check
    ///
    /// The check is attached to every permission later registered for the
    /// type through [`Manager::register_new_permissions`], unless the
    /// caller's options replace or remove it.
    pub fn register_object(&self, resource_type: ResourceType, check: Option<CustomCheck>) -> &Self {
        debug!(
            resource = %resource_type,
            default_check = check.is_some(),
            "object registered"
        );
        self.registry.write().objects.insert(
            resource_type.name().to_string(),
            ObjectItem {
                resource_type,
                check,
            },
        );
        self
    }

    /// Registers `R` with an optional default check
    pub fn register_object_of<R: Resource>(&self, check: Option<CustomCheck>) -> &Self {
        self.register_object(ResourceType::of::<R>(), check)
    }

    /// Looks up a registered resource type by its resource name
    pub fn object_by_name(&self, name: &str) -> Option<ResourceType> {
        self.registry
            .read()
            .objects
            .get(name)
            .map(|item| item.resource_type.clone())
    }

    // ------------------------------------------------------------------
    // Permissions
    // ------------------------------------------------------------------

    /// Inserts permissions into the table, replacing equal names
    pub fn register_permission(&self, permissions: impl IntoIterator<Item = Permission>) -> &Self {
        let mut registry = self.registry.write();
        for perm in permissions {
            registry.permissions.insert(perm.name().to_string(), perm);
        }
        self
    }

    /// Builds and registers one permission
    ///
    /// See [`Manager::register_new_permissions`].
    pub fn register_new_permission(
        &self,
        resource_type: Option<&ResourceType>,
        name: &str,
        options: impl IntoIterator<Item = Opt>,
    ) -> Result<()> {
        self.register_new_permissions(resource_type, &[name], options)
    }

    /// Builds and registers a permission per name
    ///
    /// Without a resource type simple permissions are built. With one,
    /// resource permissions are built and the type's default check, if
    /// registered, is applied before the given options. Nothing is
    /// registered if any permission fails to build.
    ///
    /// # Errors
    ///
    /// Fails if a name is invalid or an option cannot be applied.
    pub fn register_new_permissions(
        &self,
        resource_type: Option<&ResourceType>,
        names: &[&str],
        options: impl IntoIterator<Item = Opt>,
    ) -> Result<()> {
        let mut options: Vec<Opt> = options.into_iter().collect();

        let permissions = match resource_type {
            None => names
                .iter()
                .map(|name| Permission::simple(*name, options.clone()))
                .collect::<Result<Vec<_>>>()?,
            Some(resource_type) => {
                if let Some(check) = self.default_check(resource_type) {
                    options.insert(0, with_custom_check(check, None));
                }
                names
                    .iter()
                    .map(|name| Permission::resource(*name, Some(resource_type.clone()), options.clone()))
                    .collect::<Result<Vec<_>>>()?
            }
        };

        debug!(
            resource = resource_type.map(ResourceType::name).unwrap_or_default(),
            count = permissions.len(),
            "permissions registered"
        );
        self.register_permission(permissions);
        Ok(())
    }

    /// Registers `<name>.owner`, `<name>.account` and `<name>.all` for each
    /// name
    ///
    /// # Errors
    ///
    /// Returns [`RbacError::ResourceTypeRequired`] without a resource type,
    /// otherwise as [`Manager::register_new_permissions`].
    pub fn register_new_owning_permissions(
        &self,
        resource_type: Option<&ResourceType>,
        names: &[&str],
        options: impl IntoIterator<Item = Opt>,
    ) -> Result<()> {
        let resource_type = resource_type.ok_or(RbacError::ResourceTypeRequired)?;
        let expanded: Vec<String> = names
            .iter()
            .flat_map(|name| OWNING_SUFFIXES.iter().map(move |own| format!("{name}.{own}")))
            .collect();
        let expanded: Vec<&str> = expanded.iter().map(String::as_str).collect();
        self.register_new_permissions(Some(resource_type), &expanded, options)
    }

    fn default_check(&self, resource_type: &ResourceType) -> Option<CustomCheck> {
        self.registry
            .read()
            .object(resource_type.name(), resource_type)
            .and_then(|item| item.check.clone())
    }

    /// Looks up a permission by qualified name
    pub fn permission(&self, name: &str) -> Option<Permission> {
        self.registry.read().permissions.get(name).cloned()
    }

    /// Lists registered permissions ordered by name
    ///
    /// An empty pattern list or `*` returns every permission.
    pub fn permissions(&self, patterns: &[&str]) -> Vec<Permission> {
        let everything = patterns.is_empty() || patterns == ["*"];
        self.registry
            .read()
            .permissions
            .values()
            .filter(|perm| everything || perm.match_permission_pattern(patterns))
            .cloned()
            .collect()
    }

    /// Lists the permissions of a resource's type
    ///
    /// Patterns are relative to the resource name (`view.*`); none or `*`
    /// lists all of them. Returns nothing for a missing resource or an
    /// unregistered type.
    pub fn object_permissions<'r>(
        &self,
        resource: impl Into<ResourceRef<'r>>,
        patterns: &[&str],
    ) -> Vec<Permission> {
        let resource = resource.into();
        let (Some(type_id), name) = (resource.type_id(), resource.name()) else {
            return Vec::new();
        };
        let registered = self
            .registry
            .read()
            .objects
            .get(&name)
            .is_some_and(|item| item.resource_type.id() == type_id);
        if !registered {
            return Vec::new();
        }
        self.scoped_permissions(&name, patterns)
    }

    /// Lists the permissions of a registered resource type
    ///
    /// Same as [`Manager::object_permissions`] without an instance.
    pub fn object_type_permissions(&self, resource_type: &ResourceType, patterns: &[&str]) -> Vec<Permission> {
        let registered = self
            .registry
            .read()
            .object(resource_type.name(), resource_type)
            .is_some();
        if !registered {
            return Vec::new();
        }
        self.scoped_permissions(resource_type.name(), patterns)
    }

    fn scoped_permissions(&self, resource_name: &str, patterns: &[&str]) -> Vec<Permission> {
        let scoped: Vec<String> = if patterns.is_empty() || patterns == ["*"] {
            vec![format!("{resource_name}.**")]
        } else {
            patterns
                .iter()
                .map(|pattern| format!("{resource_name}.{pattern}"))
                .collect()
        };
        let scoped: Vec<&str> = scoped.iter().map(String::as_str).collect();
        self.permissions(&scoped)
    }

    // ------------------------------------------------------------------
    // Roles
    // ------------------------------------------------------------------

    /// Prepares and stores roles, replacing equal names
    pub fn register_role(&self, roles: impl IntoIterator<Item = Role>) -> &Self {
        let prepared: Vec<Role> = roles
            .into_iter()
            .map(|mut role| {
                role.prepare(self);
                role
            })
            .collect();

        let mut registry = self.registry.write();
        for role in prepared {
            debug!(role = %role.name(), permissions = role.child_permissions().len(), "role registered");
            registry.roles.insert(role.name().to_string(), Arc::new(role));
        }
        self
    }

    /// Looks up a prepared role
    ///
    /// The external source is asked first; locally registered roles are the
    /// fallback.
    ///
    /// # Errors
    ///
    /// Propagates failures of the external source.
    pub fn role(&self, ctx: &Context, name: &str) -> Result<Option<Arc<Role>>> {
        if let Some(accessors) = &self.accessors {
            if let Some(role) = accessors.role(ctx, name)? {
                return Ok(Some(self.prepare_shared(role)));
            }
        }
        Ok(self.registry.read().roles.get(name).cloned())
    }

    /// Looks up prepared roles by name, skipping unknown ones
    ///
    /// Without names, returns every external role followed by the local
    /// roles whose names the external source does not define.
    ///
    /// # Errors
    ///
    /// Propagates failures of the external source.
    pub fn roles(&self, ctx: &Context, names: &[&str]) -> Result<Vec<Arc<Role>>> {
        if !names.is_empty() {
            let mut roles = Vec::with_capacity(names.len());
            for name in names {
                if let Some(role) = self.role(ctx, name)? {
                    roles.push(role);
                }
            }
            return Ok(roles);
        }

        let mut roles: Vec<Arc<Role>> = match &self.accessors {
            Some(accessors) => {
                let sources = accessors.roles(ctx, &[])?;
                self.prune_prepared();
                sources.into_iter().map(|role| self.prepare_shared(role)).collect()
            }
            None => Vec::new(),
        };
        let local: Vec<Arc<Role>> = self
            .registry
            .read()
            .roles
            .values()
            .filter(|role| roles.iter().all(|known| known.name() != role.name()))
            .cloned()
            .collect();
        roles.extend(local);
        Ok(roles)
    }

    /// Returns every role accepted by the filter
    ///
    /// # Errors
    ///
    /// Propagates failures of the external source.
    pub fn roles_by_filter<F>(&self, ctx: &Context, filter: F) -> Result<Vec<Arc<Role>>>
    where
        F: Fn(&Context, &Role) -> bool,
    {
        Ok(self
            .roles(ctx, &[])?
            .into_iter()
            .filter(|role| filter(ctx, role))
            .collect())
    }

    /// Returns a prepared version of an external role
    ///
    /// The source is never mutated; a prepared copy is memoised for as long
    /// as the source entry stays in the external snapshot.
    fn prepare_shared(&self, source: Arc<Role>) -> Arc<Role> {
        if source.is_prepared() {
            return source;
        }

        if let Some(entry) = self.prepared.get(source.name()) {
            if entry.source.as_ptr() == Arc::as_ptr(&source) {
                return Arc::clone(&entry.role);
            }
        }

        self.prune_prepared();
        let mut role = Role::clone(&source);
        role.prepare(self);
        let role = Arc::new(role);
        self.prepared.insert(
            source.name().to_string(),
            PreparedRole {
                source: Arc::downgrade(&source),
                role: Arc::clone(&role),
            },
        );
        role
    }

    /// Drops memoised roles whose source left the external snapshot
    fn prune_prepared(&self) {
        let before = self.prepared.len();
        self.prepared.retain(|_, entry| entry.source.strong_count() > 0);
        let pruned = before.saturating_sub(self.prepared.len());
        if pruned > 0 {
            debug!(pruned, "stale prepared roles dropped");
        }
    }

    /// Clear the prepared external roles
    ///
    /// Roles are prepared again on their next lookup.
    pub fn clear_prepared(&self) {
        self.prepared.clear();
    }
}

impl PermissionReader for Manager {
    fn permissions(&self, patterns: &[&str]) -> Vec<Permission> {
        Manager::permissions(self, patterns)
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.read();
        f.debug_struct("Manager")
            .field("roles", &registry.roles.keys().collect::<Vec<_>>())
            .field("permissions", &registry.permissions.len())
            .field("objects", &registry.objects.keys().collect::<Vec<_>>())
            .field("external_roles", &self.accessors.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{with_description, with_permissions, without_custom_check};
    use parking_lot::Mutex;

    struct Doc;
    impl Resource for Doc {
        fn resource_name() -> String {
            "app.Doc".to_string()
        }
    }

    /// Accessor serving whatever role list it currently holds
    #[derive(Default)]
    struct SwappableSource {
        roles: Mutex<Vec<Arc<Role>>>,
    }

    impl SwappableSource {
        fn set(&self, roles: Vec<Role>) {
            *self.roles.lock() = roles.into_iter().map(Arc::new).collect();
        }
    }

    impl RoleAccessors for SwappableSource {
        fn role(&self, _ctx: &Context, name: &str) -> Result<Option<Arc<Role>>> {
            Ok(self.roles.lock().iter().find(|role| role.name() == name).cloned())
        }

        fn roles(&self, _ctx: &Context, names: &[&str]) -> Result<Vec<Arc<Role>>> {
            Ok(self
                .roles
                .lock()
                .iter()
                .filter(|role| names.is_empty() || names.contains(&role.name()))
                .cloned()
                .collect())
        }
    }

    fn doc_type() -> ResourceType {
        ResourceType::of::<Doc>()
    }

    #[test]
    fn test_default_check_is_applied() {
        let manager = Manager::new();
        let check = CustomCheck::new(|_: &Context, _: ResourceRef<'_>, perm: &Permission| {
            perm.name().ends_with(".all")
        });
        manager.register_object(doc_type(), Some(check));
        manager
            .register_new_owning_permissions(Some(&doc_type()), &["view"], [])
            .unwrap();
        manager
            .register_new_permission(Some(&doc_type()), "export", [without_custom_check()])
            .unwrap();

        let ctx = Context::new();
        let perms = manager.object_permissions(&Doc, &[]);
        assert_eq!(perms.len(), 4);
        let granted: Vec<_> = perms
            .iter()
            .filter(|perm| perm.check_permissions(&ctx, &Doc, &["*"]))
            .map(Permission::name)
            .collect();
        assert_eq!(granted, ["app.Doc.export", "app.Doc.view.all"]);
    }

    #[test]
    fn test_failed_registration_is_atomic() {
        let manager = Manager::new();
        let err = manager
            .register_new_permissions(None, &["good", "bad.*"], [])
            .unwrap_err();
        assert!(matches!(err, RbacError::InvalidPermissionName(_)));
        assert!(manager.permissions(&[]).is_empty());
    }

    #[test]
    fn test_owning_requires_resource_type() {
        let manager = Manager::new();
        let err = manager
            .register_new_owning_permissions(None, &["view"], [])
            .unwrap_err();
        assert!(matches!(err, RbacError::ResourceTypeRequired));
    }

    #[test]
    fn test_reregistration_overwrites() {
        let manager = Manager::new();
        manager.register_new_permission(None, "doc.view", [with_description("one")]).unwrap();
        manager.register_new_permission(None, "doc.view", [with_description("two")]).unwrap();
        assert_eq!(manager.permissions(&["*"]).len(), 1);
        assert_eq!(manager.permission("doc.view").unwrap().description(), "two");
    }

    #[test]
    fn test_external_roles_prepared_once_per_snapshot() {
        let source = Arc::new(SwappableSource::default());
        let manager = Manager::with_accessors(source.clone());
        manager.register_new_permissions(None, &["doc.view", "doc.edit"], []).unwrap();

        source.set(vec![Role::must_new("viewer", [with_permissions(["doc.view"])])]);
        let ctx = Context::new();

        let first = manager.role(&ctx, "viewer").unwrap().unwrap();
        let second = manager.role(&ctx, "viewer").unwrap().unwrap();
        assert!(first.is_prepared());
        assert!(first.has_permission(&["doc.view"]));
        assert!(Arc::ptr_eq(&first, &second));

        // The source role itself is left untouched
        let raw = source.role(&ctx, "viewer").unwrap().unwrap();
        assert!(!raw.is_prepared());

        // A new snapshot entry is prepared again
        source.set(vec![Role::must_new("viewer", [with_permissions(["doc.*"])])]);
        let third = manager.role(&ctx, "viewer").unwrap().unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.child_permissions().len(), 2);
    }

    #[test]
    fn test_prepared_roles_dropped_with_their_source() {
        let source = Arc::new(SwappableSource::default());
        let manager = Manager::with_accessors(source.clone());
        manager.register_new_permissions(None, &["doc.view"], []).unwrap();
        let ctx = Context::new();

        source.set(
            (0..50)
                .map(|i| Role::must_new(format!("tenant{i}"), [with_permissions(["doc.*"])]))
                .collect(),
        );
        for i in 0..50 {
            assert!(manager.role(&ctx, &format!("tenant{i}")).unwrap().is_some());
        }
        assert_eq!(manager.prepared.len(), 50);

        source.set(vec![Role::must_new("viewer", [with_permissions(["doc.*"])])]);
        assert!(manager.role(&ctx, "viewer").unwrap().is_some());
        assert_eq!(manager.prepared.len(), 1);

        source.set(vec![]);
        assert!(manager.roles(&ctx, &[]).unwrap().is_empty());
        assert_eq!(manager.prepared.len(), 0);
    }

    #[test]
    fn test_clear_prepared() {
        let source = Arc::new(SwappableSource::default());
        source.set(vec![Role::must_new("viewer", [with_permissions(["doc.*"])])]);
        let manager = Manager::with_accessors(source);
        manager.register_new_permissions(None, &["doc.view"], []).unwrap();
        let ctx = Context::new();

        let first = manager.role(&ctx, "viewer").unwrap().unwrap();
        manager.clear_prepared();
        assert_eq!(manager.prepared.len(), 0);

        let second = manager.role(&ctx, "viewer").unwrap().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(second.has_permission(&["doc.view"]));
        assert_eq!(manager.prepared.len(), 1);
    }

    #[test]
    fn test_external_roles_shadow_local_ones() {
        let source = Arc::new(SwappableSource::default());
        source.set(vec![Role::must_new("viewer", [with_description("external")])]);
        let manager = Manager::with_accessors(source);
        manager.register_role([
            Role::must_new("viewer", [with_description("local")]),
            Role::must_new("admin", []),
        ]);

        let ctx = Context::new();
        let roles = manager.roles(&ctx, &[]).unwrap();
        let names: Vec<_> = roles.iter().map(|role| role.name()).collect();
        assert_eq!(names, ["viewer", "admin"]);
        assert_eq!(roles[0].description(), "external");
        assert_eq!(manager.role(&ctx, "viewer").unwrap().unwrap().description(), "external");
    }

    #[test]
    fn test_unregistered_object_has_no_permissions() {
        let manager = Manager::new();
        manager.register_new_permissions(Some(&doc_type()), &["view"], []).unwrap();
        assert!(manager.object_permissions(&Doc, &[]).is_empty());
        assert!(manager.object_type_permissions(&doc_type(), &[]).is_empty());
        assert!(manager.object_permissions(ResourceRef::none(), &[]).is_empty());
        assert!(manager.object_by_name("app.Doc").is_none());

        manager.register_object_of::<Doc>(None);
        assert_eq!(manager.object_type_permissions(&doc_type(), &["view"]).len(), 1);
        assert_eq!(manager.object_by_name("app.Doc"), Some(doc_type()));
    }
}

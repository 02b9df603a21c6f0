//! Resource identity
//!
//! Every resource permission is bound to a concrete Rust type. The type
//! provides a qualified name which namespaces its permissions
//! (`<module>.<Type>.<permission>`), and its [`TypeId`] decides whether an
//! instance passed to a check is an acceptable subject.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A type which permissions can be bound to
///
/// The default name is derived from the type path: the last module segment
/// and the type name, e.g. `models.User` for `my_app::models::User`.
/// Override [`Resource::resource_name`] to use a fixed name instead.
///
/// ```
/// use cretoai_rbac::Resource;
///
/// struct Invoice;
/// impl Resource for Invoice {
///     fn resource_name() -> String {
///         "billing.Invoice".to_string()
///     }
/// }
///
/// assert_eq!(Invoice::resource_name(), "billing.Invoice");
/// ```
pub trait Resource: Any + Send + Sync {
    /// Qualified name used as the permission namespace
    fn resource_name() -> String {
        derive_resource_name(type_name::<Self>())
    }
}

/// Object-safe view of a [`Resource`] instance
pub trait AnyResource: Any + Send + Sync {
    /// Identity of the concrete type
    fn resource_type_id(&self) -> TypeId;

    /// Qualified resource name of the concrete type
    fn resource_type_name(&self) -> String;

    /// Access for downcasting
    fn as_any(&self) -> &dyn Any;
}

impl<R: Resource> AnyResource for R {
    fn resource_type_id(&self) -> TypeId {
        TypeId::of::<R>()
    }

    fn resource_type_name(&self) -> String {
        <R as Resource>::resource_name()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Identity token of a resource type
///
/// Two resource types are equal only when they are the same Rust type.
#[derive(Clone)]
pub struct ResourceType {
    id: TypeId,
    name: String,
}

impl ResourceType {
    /// Returns the identity of `R`
    pub fn of<R: Resource>() -> Self {
        Self {
            id: TypeId::of::<R>(),
            name: <R as Resource>::resource_name(),
        }
    }

    /// Type identifier
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Qualified resource name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if the resource is an instance of this type
    pub fn accepts(&self, resource: ResourceRef<'_>) -> bool {
        resource.type_id() == Some(self.id)
    }
}

impl PartialEq for ResourceType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ResourceType {}

impl Hash for ResourceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResourceType").field(&self.name).finish()
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Optional borrowed resource passed to permission checks
#[derive(Clone, Copy, Default)]
pub struct ResourceRef<'a>(Option<&'a dyn AnyResource>);

impl<'a> ResourceRef<'a> {
    /// No resource
    pub fn none() -> Self {
        Self(None)
    }

    /// Wraps a type-erased resource
    pub fn new(resource: &'a dyn AnyResource) -> Self {
        Self(Some(resource))
    }

    /// Returns true if no resource is present
    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    /// The underlying resource
    pub fn get(&self) -> Option<&'a dyn AnyResource> {
        self.0
    }

    /// Concrete type identity of the resource
    pub fn type_id(&self) -> Option<TypeId> {
        self.0.map(|r| r.resource_type_id())
    }

    /// Qualified name of the resource type, empty when absent
    pub fn name(&self) -> String {
        self.0.map(|r| r.resource_type_name()).unwrap_or_default()
    }

    /// Returns true if the resource is an `R`
    pub fn is<R: Resource>(&self) -> bool {
        self.type_id() == Some(TypeId::of::<R>())
    }

    /// Downcasts to a concrete resource
    pub fn downcast_ref<R: Resource>(&self) -> Option<&'a R> {
        self.0.and_then(|r| r.as_any().downcast_ref::<R>())
    }
}

impl<'a, R: Resource> From<&'a R> for ResourceRef<'a> {
    fn from(resource: &'a R) -> Self {
        Self(Some(resource))
    }
}

impl<'a> From<&'a dyn AnyResource> for ResourceRef<'a> {
    fn from(resource: &'a dyn AnyResource) -> Self {
        Self(Some(resource))
    }
}

impl<'a> From<Option<&'a dyn AnyResource>> for ResourceRef<'a> {
    fn from(resource: Option<&'a dyn AnyResource>) -> Self {
        Self(resource)
    }
}

impl fmt::Debug for ResourceRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(r) => f.debug_tuple("ResourceRef").field(&r.resource_type_name()).finish(),
            None => f.write_str("ResourceRef(None)"),
        }
    }
}

/// Builds `<module>.<Type>` from a Rust type path
///
/// Generic arguments are dropped; a path without modules yields the bare
/// type name.
pub fn derive_resource_name(path: &str) -> String {
    let path = path.split('<').next().unwrap_or(path);
    let mut segments = path.rsplit("::");
    let type_name = segments.next().unwrap_or_default();
    match segments.next() {
        Some(module) => format!("{module}.{type_name}"),
        None => type_name.to_string(),
    }
}

//! Custom check predicates for permissions

use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::permission::Permission;
use crate::resource::{Resource, ResourceRef, ResourceType};

type CheckFn = dyn Fn(&Context, ResourceRef<'_>, &Permission) -> bool + Send + Sync;

/// Predicate evaluated after a permission name has matched
///
/// A check is either untyped, receiving whatever resource was passed, or
/// typed to a [`Resource`]. Typed checks only run for instances of that
/// type and evaluate to `false` for anything else.
///
/// ```
/// use cretoai_rbac::{CustomCheck, Resource};
///
/// struct Doc { owner: u64 }
/// impl Resource for Doc {}
///
/// let check = CustomCheck::for_resource::<Doc, _>(|_ctx, doc, _perm| doc.owner == 7);
/// assert!(check.resource_type().is_some());
/// ```
#[derive(Clone)]
pub struct CustomCheck {
    resource_type: Option<ResourceType>,
    func: Arc<CheckFn>,
}

impl CustomCheck {
    /// Creates a check accepting any resource
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Context, ResourceRef<'_>, &Permission) -> bool + Send + Sync + 'static,
    {
        Self {
            resource_type: None,
            func: Arc::new(func),
        }
    }

    /// Creates a check for resources of type `R`
    pub fn for_resource<R, F>(func: F) -> Self
    where
        R: Resource,
        F: Fn(&Context, &R, &Permission) -> bool + Send + Sync + 'static,
    {
        let check = Self::new(move |ctx, resource, perm| {
            resource
                .downcast_ref::<R>()
                .is_some_and(|resource| func(ctx, resource, perm))
        });
        Self {
            resource_type: Some(ResourceType::of::<R>()),
            ..check
        }
    }

    /// Resource type the check is declared for, `None` for any
    pub fn resource_type(&self) -> Option<&ResourceType> {
        self.resource_type.as_ref()
    }

    /// Returns true if the check can be evaluated for the resource
    pub fn accepts(&self, resource: ResourceRef<'_>) -> bool {
        self.resource_type
            .as_ref()
            .map_or(true, |declared| declared.accepts(resource))
    }

    /// Evaluates the check, short-circuiting to `false` on a type mismatch
    pub fn call(&self, ctx: &Context, resource: ResourceRef<'_>, perm: &Permission) -> bool {
        self.accepts(resource) && (self.func)(ctx, resource, perm)
    }
}

impl fmt::Debug for CustomCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomCheck")
            .field("resource_type", &self.resource_type)
            .finish_non_exhaustive()
    }
}

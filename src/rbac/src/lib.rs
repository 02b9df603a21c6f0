//! # CretoAI RBAC Engine
//!
//! Embeddable role-based access control with hierarchical roles and
//! pattern-matched permission names.
//!
//! ## Features
//!
//! - **Dot-segmented permission names** matched with `*`, trailing `**`,
//!   `{a|b}` alternation, `%r{..}` regular expressions and `?`
//! - **Resource permissions** bound to Rust types, namespaced by the type's
//!   resource name and only granted for instances of that type
//! - **Typed custom checks** evaluated after a name has matched
//! - **Role hierarchies** with preload patterns resolved against a registry
//! - **TTL-cached external role sources**
//!
//! ## Example
//!
//! ```rust
//! use cretoai_rbac::options::{with_child_roles, with_custom_check, with_permissions};
//! use cretoai_rbac::{Context, CustomCheck, Manager, Resource, ResourceType, Role};
//!
//! struct Article {
//!     author: u64,
//! }
//! impl Resource for Article {
//!     fn resource_name() -> String {
//!         "blog.Article".to_string()
//!     }
//! }
//!
//! let manager = Manager::new();
//! let article = ResourceType::of::<Article>();
//! manager.register_object(article.clone(), None);
//! manager.register_new_permissions(Some(&article), &["view"], []).unwrap();
//! manager
//!     .register_new_permissions(
//!         Some(&article),
//!         &["edit.owner"],
//!         [with_custom_check(
//!             CustomCheck::for_resource::<Article, _>(|ctx, article, _| {
//!                 ctx.ext_data_as::<u64>() == Some(&article.author)
//!             }),
//!             None,
//!         )],
//!     )
//!     .unwrap();
//!
//! let reader = Role::must_new("reader", [with_permissions(["blog.Article.view"])]);
//! let writer = Role::must_new("writer", [
//!     with_permissions(["blog.*.edit.*"]),
//!     with_child_roles([reader]),
//! ]);
//! manager.register_role([writer]);
//!
//! let ctx = Context::new().with_ext_data(Some(std::sync::Arc::new(7u64)));
//! let writer = manager.role(&ctx, "writer").unwrap().unwrap();
//! assert!(writer.check_permissions(&ctx, &Article { author: 7 }, &["edit.*"]));
//! assert!(!writer.check_permissions(&ctx, &Article { author: 8 }, &["edit.*"]));
//! assert!(writer.check_permissions(&ctx, &Article { author: 8 }, &["view"]));
//! ```

pub mod check;
pub mod config;
pub mod context;
pub mod error;
pub mod manager;
pub mod options;
pub mod pattern;
pub mod permission;
pub mod resource;
pub mod role;

// Re-export commonly used types
pub use check::CustomCheck;
pub use config::ManagerConfig;
pub use context::{Context, ExtData};
pub use error::{RbacError, Result};
pub use manager::{CachedRoleLoader, LoaderStats, Manager, RoleAccessors, RoleLoader};
pub use options::Opt;
pub use pattern::PatternError;
pub use permission::{Permission, ResourcePermission, SimplePermission};
pub use resource::{AnyResource, Resource, ResourceRef, ResourceType};
pub use role::{PermissionReader, Role};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

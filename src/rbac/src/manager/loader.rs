//! External role sources and the TTL cache in front of them

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::context::Context;
use crate::error::Result;
use crate::role::Role;

/// Source of role definitions, e.g. a database or a config service
///
/// Implemented for closures returning the full role list.
pub trait RoleLoader: Send + Sync {
    /// Loads every role
    fn list_roles(&self, ctx: &Context) -> Result<Vec<Role>>;
}

impl<F> RoleLoader for F
where
    F: Fn(&Context) -> Result<Vec<Role>> + Send + Sync,
{
    fn list_roles(&self, ctx: &Context) -> Result<Vec<Role>> {
        self(ctx)
    }
}

/// Read access to externally defined roles
pub trait RoleAccessors: Send + Sync {
    /// Looks up a role by name
    fn role(&self, ctx: &Context, name: &str) -> Result<Option<Arc<Role>>>;

    /// Looks up roles by name, skipping unknown ones; no names returns all
    fn roles(&self, ctx: &Context, names: &[&str]) -> Result<Vec<Arc<Role>>>;
}

/// Statistics about the role cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderStats {
    /// Reads served from a fresh snapshot
    pub hits: u64,
    /// Reads which waited for a reload performed by another caller
    pub coalesced: u64,
    /// Successful reloads from the underlying loader
    pub refreshes: u64,
    /// Roles in the current snapshot
    pub roles: usize,
}

/// Last successful load
#[derive(Default)]
struct Snapshot {
    roles: Vec<Arc<Role>>,
    index: HashMap<String, usize>,
    /// `None` until the first load and after invalidation
    refreshed_at: Option<Instant>,
}

impl Snapshot {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.refreshed_at.is_some_and(|at| at.elapsed() <= ttl)
    }

    fn replace(&mut self, roles: Vec<Role>) {
        self.index.clear();
        self.roles = Vec::with_capacity(roles.len());
        for role in roles {
            // A later definition replaces an earlier one with the same name
            match self.index.get(role.name()) {
                Some(&pos) => self.roles[pos] = Arc::new(role),
                None => {
                    self.index.insert(role.name().to_string(), self.roles.len());
                    self.roles.push(Arc::new(role));
                }
            }
        }
        self.refreshed_at = Some(Instant::now());
    }

    fn get(&self, name: &str) -> Option<Arc<Role>> {
        self.index.get(name).map(|&pos| Arc::clone(&self.roles[pos]))
    }
}

/// TTL cache over a [`RoleLoader`]
///
/// The cache starts expired, so the first read loads. A read finding the
/// snapshot older than the TTL reloads synchronously under the write lock;
/// concurrent readers wait for that single reload instead of issuing their
/// own. There is no background refresh.
///
/// A failed reload keeps the previous snapshot and its timestamp, so the
/// next read retries. The error is returned to the caller that triggered
/// the reload.
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use cretoai_rbac::{CachedRoleLoader, Context, Role, RoleAccessors};
///
/// let cache = CachedRoleLoader::new(
///     Arc::new(|_: &Context| -> cretoai_rbac::Result<Vec<Role>> {
///         Ok(vec![Role::must_new("viewer", [])])
///     }),
///     Duration::from_secs(300),
/// );
/// let role = cache.role(&Context::new(), "viewer").unwrap();
/// assert!(role.is_some());
/// assert_eq!(cache.stats().refreshes, 1);
/// ```
pub struct CachedRoleLoader {
    loader: Arc<dyn RoleLoader>,
    ttl: Duration,
    snapshot: RwLock<Snapshot>,
    hits: AtomicU64,
    coalesced: AtomicU64,
    refreshes: AtomicU64,
}

impl CachedRoleLoader {
    /// Creates an expired cache over the loader
    pub fn new(loader: Arc<dyn RoleLoader>, ttl: Duration) -> Self {
        Self {
            loader,
            ttl,
            snapshot: RwLock::new(Snapshot::default()),
            hits: AtomicU64::new(0),
            coalesced: AtomicU64::new(0),
            refreshes: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns true if the next read reloads
    pub fn is_expired(&self) -> bool {
        !self.snapshot.read().is_fresh(self.ttl)
    }

    /// Forces the next read to reload
    pub fn invalidate(&self) {
        self.snapshot.write().refreshed_at = None;
        debug!("role cache invalidated");
    }

    pub fn stats(&self) -> LoaderStats {
        LoaderStats {
            hits: self.hits.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            roles: self.snapshot.read().roles.len(),
        }
    }

    /// Returns a read guard over a snapshot no older than the TTL
    fn fresh(&self, ctx: &Context) -> Result<RwLockReadGuard<'_, Snapshot>> {
        {
            let snapshot = self.snapshot.read();
            if snapshot.is_fresh(self.ttl) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(snapshot);
            }
        }

        let mut snapshot = self.snapshot.write();
        // Another caller may have reloaded while we waited for the lock
        if snapshot.is_fresh(self.ttl) {
            self.coalesced.fetch_add(1, Ordering::Relaxed);
        } else {
            let roles = self.loader.list_roles(ctx).map_err(|err| {
                warn!(error = %err, "role loader failed, keeping previous snapshot");
                err
            })?;
            snapshot.replace(roles);
            self.refreshes.fetch_add(1, Ordering::Relaxed);
            info!(
                roles = snapshot.roles.len(),
                ttl_secs = self.ttl.as_secs(),
                "role cache refreshed"
            );
        }

        Ok(RwLockWriteGuard::downgrade(snapshot))
    }
}

impl RoleAccessors for CachedRoleLoader {
    fn role(&self, ctx: &Context, name: &str) -> Result<Option<Arc<Role>>> {
        Ok(self.fresh(ctx)?.get(name))
    }

    fn roles(&self, ctx: &Context, names: &[&str]) -> Result<Vec<Arc<Role>>> {
        let snapshot = self.fresh(ctx)?;
        if names.is_empty() {
            return Ok(snapshot.roles.clone());
        }
        Ok(names.iter().filter_map(|name| snapshot.get(name)).collect())
    }
}

impl std::fmt::Debug for CachedRoleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedRoleLoader")
            .field("ttl", &self.ttl)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

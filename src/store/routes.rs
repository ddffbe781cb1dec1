//! Route storage backends and the caching decorator in front of them.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::cache::TtlCache;
use crate::observability::metrics;
use crate::store::{RouteRecord, StoreError};

/// Read access to persisted routes.
#[async_trait]
pub trait RouteStore: Send + Sync {
    /// Every route with `active = true`, in storage order.
    async fn active_routes(&self) -> Result<Vec<RouteRecord>, StoreError>;

    /// A single route by id, active or not.
    async fn route_by_id(&self, id: &str) -> Result<RouteRecord, StoreError>;
}

/// Layout of the routes file.
#[derive(Debug, Default, Deserialize)]
struct RoutesFile {
    #[serde(default)]
    routes: Vec<RouteRecord>,
}

/// Routes kept in a TOML file of `[[routes]]` tables.
///
/// The file is read on every call; put a [`CachedRouteStore`] in front of it.
#[derive(Debug, Clone)]
pub struct FileRouteStore {
    path: PathBuf,
}

impl FileRouteStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    async fn load(&self) -> Result<Vec<RouteRecord>, StoreError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let file: RoutesFile = toml::from_str(&content)?;
        Ok(file.routes)
    }
}

#[async_trait]
impl RouteStore for FileRouteStore {
    async fn active_routes(&self) -> Result<Vec<RouteRecord>, StoreError> {
        let routes = self.load().await?;
        Ok(routes.into_iter().filter(|r| r.active).collect())
    }

    async fn route_by_id(&self, id: &str) -> Result<RouteRecord, StoreError> {
        self.load()
            .await?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::RouteNotFound(id.to_string()))
    }
}

/// In-memory route storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryRouteStore {
    routes: Arc<RwLock<Vec<RouteRecord>>>,
}

impl MemoryRouteStore {
    pub fn new(routes: Vec<RouteRecord>) -> Self {
        Self {
            routes: Arc::new(RwLock::new(routes)),
        }
    }

    /// Replace the whole route set.
    pub fn replace(&self, routes: Vec<RouteRecord>) {
        *self.routes.write().unwrap_or_else(PoisonError::into_inner) = routes;
    }

    fn snapshot(&self) -> Vec<RouteRecord> {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl RouteStore for MemoryRouteStore {
    async fn active_routes(&self) -> Result<Vec<RouteRecord>, StoreError> {
        Ok(self.snapshot().into_iter().filter(|r| r.active).collect())
    }

    async fn route_by_id(&self, id: &str) -> Result<RouteRecord, StoreError> {
        self.snapshot()
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::RouteNotFound(id.to_string()))
    }
}

/// Values held in the route cache, one variant per key shape.
#[derive(Debug, Clone)]
pub enum CachedRoutes {
    All(Arc<[RouteRecord]>),
    One(Arc<RouteRecord>),
}

const ALL_ROUTES_KEY: &str = "routes.all";

fn route_key(id: &str) -> String {
    format!("routes.id.{id}")
}

/// A [`RouteStore`] that serves repeated lookups from a [`TtlCache`].
pub struct CachedRouteStore {
    inner: Arc<dyn RouteStore>,
    cache: TtlCache<CachedRoutes>,
    ttl: Duration,
}

impl CachedRouteStore {
    /// Lookups are kept for five seconds unless configured otherwise.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(5);

    pub fn new(inner: Arc<dyn RouteStore>, cache: TtlCache<CachedRoutes>, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }

    /// Active routes, cached as a shared slice.
    pub async fn cached_active_routes(&self) -> Result<Arc<[RouteRecord]>, StoreError> {
        if let Some(CachedRoutes::All(routes)) = self.cache.get(ALL_ROUTES_KEY) {
            metrics::record_route_cache("all", true);
            return Ok(routes);
        }
        metrics::record_route_cache("all", false);

        let routes: Arc<[RouteRecord]> = self.inner.active_routes().await?.into();
        self.cache
            .set(ALL_ROUTES_KEY, CachedRoutes::All(Arc::clone(&routes)), self.ttl);
        Ok(routes)
    }

    /// A single route, cached by id.
    pub async fn cached_route_by_id(&self, id: &str) -> Result<Arc<RouteRecord>, StoreError> {
        let key = route_key(id);
        if let Some(CachedRoutes::One(route)) = self.cache.get(&key) {
            metrics::record_route_cache("by_id", true);
            return Ok(route);
        }
        metrics::record_route_cache("by_id", false);

        let route = Arc::new(self.inner.route_by_id(id).await?);
        self.cache
            .set(key, CachedRoutes::One(Arc::clone(&route)), self.ttl);
        Ok(route)
    }
}

#[async_trait]
impl RouteStore for CachedRouteStore {
    async fn active_routes(&self) -> Result<Vec<RouteRecord>, StoreError> {
        Ok(self.cached_active_routes().await?.to_vec())
    }

    async fn route_by_id(&self, id: &str) -> Result<RouteRecord, StoreError> {
        Ok(self.cached_route_by_id(id).await?.as_ref().clone())
    }
}

//! Route provider backed by persisted route records.

use std::sync::Arc;

use async_trait::async_trait;

use crate::routing::route::{ProviderError, Route, RouteProvider};
use crate::store::CachedRouteStore;

/// Serves the active route set from storage through the route cache.
pub struct StoreRouteProvider {
    store: Arc<CachedRouteStore>,
}

impl StoreRouteProvider {
    pub fn new(store: Arc<CachedRouteStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RouteProvider for StoreRouteProvider {
    async fn routes(&self) -> Result<Vec<Route>, ProviderError> {
        let records = self.store.cached_active_routes().await?;
        Ok(records.iter().map(|r| r.to_route()).collect())
    }
}

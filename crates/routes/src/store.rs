use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::route::StoredRoute;

/// Backing storage for the saved route list. The whole list is read and
/// written at once.
#[async_trait]
pub trait RouteStore: Send + Sync {
    async fn load_all(&self) -> Result<Vec<StoredRoute>>;

    async fn save_all(&self, routes: &[StoredRoute]) -> Result<()>;
}

/// Process-local store.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    routes: Arc<Mutex<Vec<StoredRoute>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(routes: Vec<StoredRoute>) -> Self {
        Self { routes: Arc::new(Mutex::new(routes)) }
    }
}

#[async_trait]
impl RouteStore for MemoryStore {
    async fn load_all(&self) -> Result<Vec<StoredRoute>> {
        Ok(self.routes.lock().await.clone())
    }

    async fn save_all(&self, routes: &[StoredRoute]) -> Result<()> {
        *self.routes.lock().await = routes.to_vec();
        Ok(())
    }
}

/// The saved route list, newest first. Every change is written through to
/// the store and only applied once the write succeeds.
#[derive(Debug)]
pub struct RouteBook<S> {
    store: S,
    routes: Vec<StoredRoute>,
}

impl<S: RouteStore> RouteBook<S> {
    /// Load the current list from `store`.
    ///
    /// # Errors
    ///
    /// Returns an error when the store cannot be read.
    pub async fn load(store: S) -> Result<Self> {
        let routes = store.load_all().await.context("loading routes")?;
        debug!(count = routes.len(), "routes loaded");
        Ok(Self { store, routes })
    }

    /// Save a route at the front of the list.
    ///
    /// # Errors
    ///
    /// Returns an error when the store cannot be written.
    pub async fn add(&mut self, route: StoredRoute) -> Result<()> {
        info!(id = %route.id, distance = route.total_distance, "saving route");
        let mut routes = Vec::with_capacity(self.routes.len() + 1);
        routes.push(route);
        routes.extend(self.routes.iter().cloned());
        self.persist(routes).await
    }

    /// Remove the route with `id`. Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns an error when the store cannot be written.
    pub async fn remove(&mut self, id: &str) -> Result<bool> {
        if self.get(id).is_none() {
            return Ok(false);
        }
        let routes = self.routes.iter().filter(|route| route.id != id).cloned().collect();
        self.persist(routes).await?;
        Ok(true)
    }

    /// Remove every route.
    ///
    /// # Errors
    ///
    /// Returns an error when the store cannot be written.
    pub async fn clear(&mut self) -> Result<()> {
        self.persist(Vec::new()).await
    }

    #[must_use]
    pub fn routes(&self) -> &[StoredRoute] {
        &self.routes
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&StoredRoute> {
        self.routes.iter().find(|route| route.id == id)
    }

    async fn persist(&mut self, routes: Vec<StoredRoute>) -> Result<()> {
        self.store.save_all(&routes).await.context("saving routes")?;
        self.routes = routes;
        Ok(())
    }
}

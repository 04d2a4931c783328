//! Shared, persisted registry used by the API server and the admin CLI.

mod refresher;

pub use refresher::StatsRefresher;

use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::clock;
use crate::models::{Client, ClientData, Level, Space, SpacePatch, Ticket};
use crate::registry::{OccupancyStats, Registry, RegistryResult, RegistrySettings};
use crate::storage::{load_registry, save_registry, StateStore, StorageResult};

pub struct ParkingService {
    registry: Mutex<Registry>,
    store: Arc<dyn StateStore>,
    stats: RwLock<OccupancyStats>,
}

impl ParkingService {
    /// Load persisted state, seeding and saving a first level when the store
    /// is empty.
    pub async fn load(store: Arc<dyn StateStore>, settings: RegistrySettings) -> StorageResult<Self> {
        let registry = load_registry(store.as_ref(), settings).await?;
        save_registry(store.as_ref(), &registry).await?;

        let stats = OccupancyStats::compute(&registry, clock::now_millis());
        tracing::info!(
            "Registry loaded: {} levels, {} spaces, {} clients",
            registry.levels().len(),
            registry.spaces().len(),
            registry.clients().len()
        );

        Ok(Self {
            registry: Mutex::new(registry),
            store,
            stats: RwLock::new(stats),
        })
    }

    /// Run a read-only closure against the current registry.
    pub async fn read<T>(&self, f: impl FnOnce(&Registry) -> T) -> T {
        let registry = self.registry.lock().await;
        f(&registry)
    }

    /// Apply a mutation; on success persist and refresh the cached stats.
    ///
    /// Persistence failures are logged and do not roll back the in-memory
    /// change.
    pub async fn mutate<T>(&self, f: impl FnOnce(&mut Registry) -> RegistryResult<T>) -> RegistryResult<T> {
        let mut registry = self.registry.lock().await;
        let value = f(&mut registry)?;
        self.commit(&registry).await;
        Ok(value)
    }

    async fn apply<T>(&self, f: impl FnOnce(&mut Registry) -> T) -> T {
        let mut registry = self.registry.lock().await;
        let value = f(&mut registry);
        self.commit(&registry).await;
        value
    }

    async fn commit(&self, registry: &Registry) {
        if let Err(e) = save_registry(self.store.as_ref(), registry).await {
            tracing::error!("Failed to persist registry: {}", e);
        }
        *self.stats.write().await = OccupancyStats::compute(registry, clock::now_millis());
    }

    pub async fn occupy(&self, space_key: &str, data: ClientData) -> RegistryResult<Client> {
        let now = clock::now_millis();
        self.mutate(|r| r.occupy(space_key, data, now)).await
    }

    pub async fn release(&self, space_key: &str) -> Option<Client> {
        self.apply(|r| r.release(space_key)).await
    }

    pub async fn set_hold(&self, space_key: &str, hold: bool) -> RegistryResult<()> {
        self.mutate(|r| r.set_hold(space_key, hold)).await
    }

    pub async fn add_level(&self) -> RegistryResult<Level> {
        self.mutate(Registry::add_level).await
    }

    pub async fn rename_level(&self, id: &str, label: &str) -> RegistryResult<()> {
        self.mutate(|r| r.rename_level(id, label)).await
    }

    pub async fn delete_level(&self, id: &str) -> RegistryResult<()> {
        self.mutate(|r| r.delete_level(id)).await
    }

    pub async fn add_spaces(&self, level_id: &str, count: usize) -> RegistryResult<Vec<String>> {
        self.mutate(|r| r.add_spaces(level_id, count)).await
    }

    pub async fn delete_spaces(&self, level_id: &str, count: usize) -> RegistryResult<Vec<String>> {
        self.mutate(|r| r.delete_spaces(level_id, count)).await
    }

    pub async fn delete_space(&self, key: &str) -> RegistryResult<()> {
        self.mutate(|r| r.delete_space(key)).await
    }

    pub async fn edit_space(&self, old_key: &str, new_key: &str, patch: SpacePatch) -> RegistryResult<Space> {
        self.mutate(|r| r.edit_space(old_key, new_key, patch)).await
    }

    pub async fn transfer_space(&self, key: &str, level_id: &str) -> RegistryResult<()> {
        self.mutate(|r| r.transfer_space(key, level_id)).await
    }

    pub async fn reset_occupancy(&self) {
        self.apply(Registry::reset_occupancy).await;
        tracing::info!("All spaces released");
    }

    /// Drop everything and start over from a single seeded level.
    pub async fn clear_all(&self) {
        self.apply(Registry::clear_all).await;
        tracing::warn!("Registry cleared");
    }

    pub async fn ticket(&self, key: &str) -> RegistryResult<Ticket> {
        self.read(|r| r.ticket(key)).await
    }

    /// Cached stats as of the last mutation or refresh.
    pub async fn stats(&self) -> OccupancyStats {
        self.stats.read().await.clone()
    }

    /// Recompute the cached stats against the current clock and return them.
    pub async fn refresh_stats(&self) -> OccupancyStats {
        let stats = self
            .read(|r| OccupancyStats::compute(r, clock::now_millis()))
            .await;
        *self.stats.write().await = stats.clone();
        stats
    }
}

use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::Order;
use crate::store::OrderRepository;
use super::lru::LruCache;

// ============================================================================
// Order Cache - resident set of recently used orders
// ============================================================================
//
// A single reader-writer lock guards the LRU. `get` promotes the entry, so it
// takes the lock exclusively like `set`; only non-promoting inspection
// (`contains`, `len`) shares it. The lock is never held across backing store
// I/O: callers fetch first, then take the lock for the O(1) update.
//
// Values are handed out as `Arc<Order>` clones, never as references into the
// cache, so a later eviction cannot invalidate what a caller holds.
//
// ============================================================================

pub struct OrderCache {
    entries: RwLock<LruCache<Arc<Order>>>,
    capacity: NonZeroUsize,
}

impl OrderCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
            capacity,
        }
    }

    /// Build a cache pre-filled with the `capacity` most recent orders.
    ///
    /// The repository returns newest first, so orders are inserted in reverse
    /// to leave the newest one most recently used. A failed fetch leaves the
    /// cache cold; it fills up again through read misses and saves.
    pub async fn warm(repository: &dyn OrderRepository, capacity: NonZeroUsize) -> Self {
        let cache = Self::new(capacity);

        match repository.get_last_n(capacity.get()).await {
            Ok(orders) => {
                let count = orders.len();
                {
                    let mut entries = cache.entries.write().await;
                    for order in orders.into_iter().rev() {
                        entries.set(order.order_uid.clone(), Arc::new(order));
                    }
                }
                tracing::info!(
                    loaded = count,
                    capacity = capacity.get(),
                    "Order cache warmed from backing store"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    capacity = capacity.get(),
                    "Failed to warm order cache, starting cold"
                );
            }
        }

        cache
    }

    pub async fn get(&self, order_uid: &str) -> Option<Arc<Order>> {
        self.entries.write().await.get(order_uid).cloned()
    }

    /// Returns true if the order was already resident.
    pub async fn set(&self, order: Arc<Order>) -> bool {
        let key = order.order_uid.clone();
        self.entries.write().await.set(key, order)
    }

    #[cfg(test)]
    pub async fn contains(&self, order_uid: &str) -> bool {
        self.entries.read().await.contains(order_uid)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }
}

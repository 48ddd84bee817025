use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::cache::OrderCache;
use crate::metrics::Metrics;
use crate::models::Order;
use super::{OrderRepository, StoreError};

// ============================================================================
// Cache-Aside Order Store
// ============================================================================
//
// Reads:  cache first; on a hit the repository is NOT consulted. On a miss
//         the repository is queried and a successful result is cached.
// Writes: repository first; the cache is updated only after the write is
//         durable, so no reader ever sees an order that is not committed.
//
// With `CacheMode::Disabled` every call goes straight to the repository.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    Disabled,
    Enabled { capacity: NonZeroUsize },
}

pub struct OrderStore {
    repository: Arc<dyn OrderRepository>,
    cache: Option<OrderCache>,
    metrics: Arc<Metrics>,
}

impl OrderStore {
    /// Build the store; with caching enabled this warms the cache from the
    /// most recent orders before returning.
    pub async fn new(
        repository: Arc<dyn OrderRepository>,
        mode: CacheMode,
        metrics: Arc<Metrics>,
    ) -> Self {
        let cache = match mode {
            CacheMode::Disabled => None,
            CacheMode::Enabled { capacity } => {
                Some(OrderCache::warm(repository.as_ref(), capacity).await)
            }
        };

        Self {
            repository,
            cache,
            metrics,
        }
    }

    pub fn mode(&self) -> CacheMode {
        match &self.cache {
            None => CacheMode::Disabled,
            Some(cache) => CacheMode::Enabled {
                capacity: NonZeroUsize::new(cache.capacity()).unwrap_or(NonZeroUsize::MIN),
            },
        }
    }

    /// Number of resident orders; `None` when caching is disabled.
    pub async fn cached_orders(&self) -> Option<usize> {
        match &self.cache {
            Some(cache) => Some(cache.len().await),
            None => None,
        }
    }

    pub async fn save(&self, order: Order) -> Result<(), StoreError> {
        if order.order_uid.is_empty() {
            return Err(StoreError::InvalidOrder("order_uid is empty".to_string()));
        }

        if let Err(e) = self.repository.save(&order).await {
            self.metrics.record_repository_error("save");
            return Err(e.into());
        }

        if let Some(cache) = &self.cache {
            cache.set(Arc::new(order)).await;
        }
        Ok(())
    }

    pub async fn get(&self, order_uid: &str) -> Result<Arc<Order>, StoreError> {
        if let Some(cache) = &self.cache {
            if let Some(order) = cache.get(order_uid).await {
                self.metrics.record_cache_lookup(true);
                tracing::debug!(order_uid = %order_uid, "Order cache hit");
                return Ok(order);
            }
            self.metrics.record_cache_lookup(false);
        }

        let order = match self.repository.get(order_uid).await {
            Ok(order) => Arc::new(order),
            Err(e) => {
                if !e.is_not_found() {
                    self.metrics.record_repository_error("get");
                }
                return Err(e.into());
            }
        };

        if let Some(cache) = &self.cache {
            cache.set(order.clone()).await;
        }
        Ok(order)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

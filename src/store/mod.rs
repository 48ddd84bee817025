// ============================================================================
// Order Store
// ============================================================================
//
// - OrderRepository: contract of the durable backing store
// - OrderStore:      cache-aside composition of a repository and an OrderCache
// - postgres/memory: repository implementations
//
// ============================================================================

mod errors;
mod memory;
mod order_store;
mod postgres;

use async_trait::async_trait;

use crate::models::Order;

pub use errors::{RepositoryError, StoreError};
pub use memory::InMemoryOrderRepository;
pub use order_store::{CacheMode, OrderStore};
pub use postgres::PostgresOrderRepository;

/// Durable storage for orders. Every operation may fail.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Fetch one order by identifier; `RepositoryError::NotFound` when absent.
    async fn get(&self, order_uid: &str) -> Result<Order, RepositoryError>;

    /// The `n` most recently created orders, newest first.
    async fn get_last_n(&self, n: usize) -> Result<Vec<Order>, RepositoryError>;

    async fn get_all(&self) -> Result<Vec<Order>, RepositoryError>;

    /// Persist a new order with its delivery, payment and items atomically.
    async fn save(&self, order: &Order) -> Result<(), RepositoryError>;
}

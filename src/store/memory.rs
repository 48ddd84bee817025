use async_trait::async_trait;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::models::Order;
use super::{OrderRepository, RepositoryError};

#[derive(Default)]
struct Orders {
    by_uid: HashMap<String, Order>,
    /// Identifiers in insertion order.
    insertion: Vec<String>,
}

/// In-process backing store.
///
/// Used when no database is configured. Offers the same contract as the
/// PostgreSQL repository, including `Conflict` on a duplicate identifier.
#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<Orders>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn get(&self, order_uid: &str) -> Result<Order, RepositoryError> {
        self.orders
            .read()
            .await
            .by_uid
            .get(order_uid)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(order_uid.to_string()))
    }

    async fn get_last_n(&self, n: usize) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await;

        // Newest first; among equal timestamps the later insert comes first.
        let mut ranked: Vec<(usize, &Order)> = orders
            .insertion
            .iter()
            .enumerate()
            .filter_map(|(seq, uid)| orders.by_uid.get(uid).map(|o| (seq, o)))
            .collect();
        ranked.sort_by(|(seq_a, a), (seq_b, b)| {
            b.date_created
                .cmp(&a.date_created)
                .then_with(|| seq_b.cmp(seq_a))
        });

        Ok(ranked.into_iter().take(n).map(|(_, o)| o.clone()).collect())
    }

    async fn get_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders
            .insertion
            .iter()
            .filter_map(|uid| orders.by_uid.get(uid).cloned())
            .collect())
    }

    async fn save(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        let orders = &mut *orders;

        match orders.by_uid.entry(order.order_uid.clone()) {
            Entry::Occupied(_) => Err(RepositoryError::Conflict(order.order_uid.clone())),
            Entry::Vacant(slot) => {
                orders.insertion.push(order.order_uid.clone());
                slot.insert(order.clone());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::sample_order;
    use chrono::Duration;

    #[tokio::test]
    async fn test_save_and_get() {
        let repo = InMemoryOrderRepository::new();
        repo.save(&sample_order("a")).await.unwrap();

        assert_eq!(repo.get("a").await.unwrap().order_uid, "a");
        assert!(repo.get("missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_duplicate_save_conflicts() {
        let repo = InMemoryOrderRepository::new();
        repo.save(&sample_order("a")).await.unwrap();

        let err = repo.save(&sample_order("a")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(id) if id == "a"));
        assert_eq!(repo.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_last_n_is_newest_first() {
        let repo = InMemoryOrderRepository::new();
        let base = sample_order("base").date_created;
        for (i, uid) in ["old", "newest", "middle"].iter().enumerate() {
            let mut order = sample_order(uid);
            order.date_created = base + Duration::hours(match i {
                0 => 0,
                1 => 2,
                _ => 1,
            });
            repo.save(&order).await.unwrap();
        }

        let last: Vec<String> = repo
            .get_last_n(2)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.order_uid)
            .collect();
        assert_eq!(last, vec!["newest", "middle"]);
        assert_eq!(repo.get_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_large_volume_keeps_lookups_and_conflicts_exact() {
        let repo = InMemoryOrderRepository::new();
        let uids: Vec<String> = (0..5_000).map(|i| format!("order-{:05}", i)).collect();
        for uid in &uids {
            repo.save(&sample_order(uid)).await.unwrap();
        }

        assert_eq!(repo.get("order-04999").await.unwrap().order_uid, "order-04999");
        assert!(matches!(
            repo.save(&sample_order("order-02500")).await,
            Err(RepositoryError::Conflict(_))
        ));

        let all: Vec<String> = repo
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.order_uid)
            .collect();
        assert_eq!(all, uids);

        // Same timestamp everywhere: ties go to the latest insert.
        let last: Vec<String> = repo
            .get_last_n(2)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.order_uid)
            .collect();
        assert_eq!(last, vec!["order-04999", "order-04998"]);
    }
}

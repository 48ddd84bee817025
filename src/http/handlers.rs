use actix_web::{web, HttpResponse, Responder};
use prometheus::{Encoder, TextEncoder};

use crate::store::StoreError;
use super::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/order/{order_uid}", web::get().to(get_order))
        .route("/health", web::get().to(health_handler))
        .route("/metrics", web::get().to(metrics_handler));
}

async fn get_order(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let order_uid = path.into_inner();

    match state.store.get(&order_uid).await {
        Ok(order) => HttpResponse::Ok().json(order.as_ref()),
        Err(StoreError::NotFound(_)) => HttpResponse::NotFound().json(serde_json::json!({
            "error": "order not found",
            "order_uid": order_uid,
        })),
        Err(e) => {
            tracing::error!(order_uid = %order_uid, error = %e, "Order lookup failed");
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "error": "backing store unavailable",
            }))
        }
    }
}

async fn metrics_handler(state: web::Data<AppState>) -> impl Responder {
    let encoder = TextEncoder::new();
    let metric_families = state.metrics.registry().gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}

async fn health_handler(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "order-cache-service",
        "cached_orders": state.store.cached_orders().await,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metrics;
    use crate::models::{fixtures::sample_order, Order};
    use crate::store::{CacheMode, InMemoryOrderRepository, OrderRepository, OrderStore, RepositoryError};
    use actix_web::{http::StatusCode, test, App};
    use async_trait::async_trait;
    use std::num::NonZeroUsize;
    use std::sync::Arc;

    struct DownRepository;

    #[async_trait]
    impl OrderRepository for DownRepository {
        async fn get(&self, _: &str) -> Result<Order, RepositoryError> {
            Err(RepositoryError::Unavailable("connection refused".into()))
        }
        async fn get_last_n(&self, _: usize) -> Result<Vec<Order>, RepositoryError> {
            Ok(Vec::new())
        }
        async fn get_all(&self) -> Result<Vec<Order>, RepositoryError> {
            Ok(Vec::new())
        }
        async fn save(&self, _: &Order) -> Result<(), RepositoryError> {
            Err(RepositoryError::Unavailable("connection refused".into()))
        }
    }

    async fn state_with(repository: Arc<dyn OrderRepository>) -> web::Data<AppState> {
        let metrics = Arc::new(Metrics::new().unwrap());
        let mode = CacheMode::Enabled {
            capacity: NonZeroUsize::new(8).unwrap(),
        };
        let store = Arc::new(OrderStore::new(repository, mode, metrics.clone()).await);
        web::Data::new(AppState { store, metrics })
    }

    #[actix_web::test]
    async fn test_get_existing_order() {
        let repo = InMemoryOrderRepository::new();
        repo.save(&sample_order("b563feb7b2b84b6test")).await.unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state_with(Arc::new(repo)).await)
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/order/b563feb7b2b84b6test").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let order: Order = test::read_body_json(resp).await;
        assert_eq!(order, sample_order("b563feb7b2b84b6test"));
    }

    #[actix_web::test]
    async fn test_missing_order_is_404() {
        let app = test::init_service(
            App::new()
                .app_data(state_with(Arc::new(InMemoryOrderRepository::new())).await)
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/order/nope").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_backend_failure_is_503() {
        let app = test::init_service(
            App::new()
                .app_data(state_with(Arc::new(DownRepository)).await)
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/order/any").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn test_metrics_and_health() {
        let state = state_with(Arc::new(InMemoryOrderRepository::new())).await;
        state.metrics.record_cache_lookup(false);
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let body = test::call_and_read_body(&app, req).await;
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("order_cache_lookups_total"));

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let health: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(health["cached_orders"], 0);
    }
}

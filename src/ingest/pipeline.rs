use std::sync::Arc;
use std::time::Instant;

use crate::domain::order::validate_order;
use crate::messaging::{DeadLetter, DeadLetterSink};
use crate::metrics::Metrics;
use crate::models::Order;
use crate::store::OrderStore;
use super::{IngestError, Stage};

/// Terminal state of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Accepted { order_uid: String },
    DeadLettered { stage: Stage, retryable: bool },
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Accepted { .. } => "accepted",
            Outcome::DeadLettered { .. } => "dead_lettered",
        }
    }
}

pub struct IngestionPipeline {
    store: Arc<OrderStore>,
    dead_letters: Arc<dyn DeadLetterSink>,
    metrics: Arc<Metrics>,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<OrderStore>,
        dead_letters: Arc<dyn DeadLetterSink>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            store,
            dead_letters,
            metrics,
        }
    }

    pub(crate) fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Drive one raw payload to a terminal state. Never fails: every error is
    /// turned into a dead letter.
    pub async fn handle_message(&self, payload: &[u8]) -> Outcome {
        let started = Instant::now();

        let outcome = match self.process(payload).await {
            Ok(order_uid) => Outcome::Accepted { order_uid },
            Err(e) => {
                let outcome = Outcome::DeadLettered {
                    stage: e.stage(),
                    retryable: e.is_retryable(),
                };
                self.dead_letter(payload, e).await;
                outcome
            }
        };

        match &outcome {
            Outcome::Accepted { order_uid } => {
                tracing::info!(order_uid = %order_uid, "Order accepted");
            }
            Outcome::DeadLettered { stage, retryable } => {
                self.metrics.record_dead_letter(stage.as_str(), *retryable);
            }
        }
        self.metrics
            .record_message(outcome.label(), started.elapsed().as_secs_f64());
        outcome
    }

    async fn process(&self, payload: &[u8]) -> Result<String, IngestError> {
        let order = Order::from_json(payload)?;
        validate_order(&order)?;

        let order_uid = order.order_uid.clone();
        self.store.save(order).await?;
        Ok(order_uid)
    }

    async fn dead_letter(&self, payload: &[u8], error: IngestError) {
        let stage = error.stage();
        let letter = DeadLetter::new(
            payload,
            error.class(),
            error.to_string(),
            error.is_retryable(),
        );

        tracing::error!(
            stage = %stage,
            retryable = letter.retryable,
            error = %letter.error_message,
            "Message dead-lettered"
        );

        if let Err(e) = self.dead_letters.publish(&letter).await {
            tracing::error!(
                error = %e,
                stage = %stage,
                payload_bytes = letter.payload.len(),
                "Failed to publish dead letter"
            );
            self.metrics.record_dead_letter_publish_failure();
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

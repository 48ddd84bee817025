use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::messaging::{MessageSource, StreamError};
use crate::utils::wait_for_shutdown;
use super::IngestionPipeline;

// ============================================================================
// Ingestion Run Loop
// ============================================================================
//
// Reads the stream until shutdown. Per-message failures are handled by the
// pipeline and never reach this loop; only a broken stream does, in which
// case we wait `backoff` and start reading again. Both the blocking read and
// the backoff sleep race the shutdown signal.
//
// Messages are handled one at a time, in delivery order.
//
// ============================================================================

pub async fn run<S: MessageSource>(
    pipeline: &IngestionPipeline,
    mut source: S,
    backoff: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!(backoff_secs = backoff.as_secs_f64(), "Ingestion loop started");

    loop {
        match consume(pipeline, &mut source, &mut shutdown).await {
            Ok(()) => break,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    backoff_secs = backoff.as_secs_f64(),
                    "Stream read failed, restarting after backoff"
                );
                pipeline.metrics().record_stream_reconnect();
            }
        }

        tokio::select! {
            _ = wait_for_shutdown(&mut shutdown) => break,
            _ = tokio::time::sleep(backoff) => {}
        }
    }

    tracing::info!("Ingestion loop stopped");
}

/// Returns `Ok` when shutdown was observed, `Err` when the stream broke.
async fn consume<S: MessageSource>(
    pipeline: &IngestionPipeline,
    source: &mut S,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), StreamError> {
    loop {
        let message = tokio::select! {
            biased;
            _ = wait_for_shutdown(shutdown) => return Ok(()),
            received = source.recv() => received?,
        };

        let key = message
            .key
            .as_deref()
            .map(String::from_utf8_lossy)
            .unwrap_or_default();
        tracing::debug!(key = %key, payload_bytes = message.payload.len(), "Processing message");
        pipeline.handle_message(&message.payload).await;
    }
}

/// The ingestion loop running as a background task.
pub struct IngestionHandle {
    task: JoinHandle<()>,
}

impl IngestionHandle {
    pub fn spawn<S>(
        pipeline: Arc<IngestionPipeline>,
        source: S,
        backoff: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self
    where
        S: MessageSource + 'static,
    {
        let task = tokio::spawn(async move {
            run(&pipeline, source, backoff, shutdown).await;
        });
        Self { task }
    }

    #[cfg(test)]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the loop to exit. Only returns once shutdown has been signalled.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Ingestion task terminated abnormally");
        }
    }
}

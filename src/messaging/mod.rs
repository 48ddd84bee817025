// ============================================================================
// Messaging - stream source and dead-letter sink
// ============================================================================
//
// The ingestion pipeline only sees the two traits below. The Kafka adapters
// in `kafka` implement them with rdkafka; tests plug in channel-backed
// doubles from `testing`.
//
// ============================================================================

mod dead_letter;
mod kafka;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use rdkafka::error::KafkaError;

pub use dead_letter::DeadLetter;
pub use kafka::{KafkaDeadLetterProducer, KafkaOrderConsumer, KafkaSettings};

/// One message read from the ingest stream. The key is carried along for
/// logging only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub key: Option<Vec<u8>>,
    pub payload: Vec<u8>,
}

#[cfg(test)]
impl InboundMessage {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            key: None,
            payload: payload.into(),
        }
    }
}

/// Connection-level failure of the stream itself, as opposed to a bad message.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("kafka consumer error: {0}")]
    Kafka(#[from] KafkaError),

    #[error("stream closed")]
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum DeadLetterError {
    #[error("dead letter publish failed: {0}")]
    Kafka(#[from] KafkaError),
}

#[async_trait]
pub trait MessageSource: Send {
    /// Wait for the next message. An error means the stream is broken and the
    /// caller should back off before reading again.
    async fn recv(&mut self) -> Result<InboundMessage, StreamError>;
}

#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn publish(&self, letter: &DeadLetter) -> Result<(), DeadLetterError>;
}

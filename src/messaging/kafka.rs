use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    consumer::{Consumer, StreamConsumer},
    error::KafkaError,
    message::{Header, Message, OwnedHeaders},
    producer::{FutureProducer, FutureRecord},
    util::Timeout,
};
use std::time::Duration;

use super::{DeadLetter, DeadLetterError, DeadLetterSink, InboundMessage, MessageSource, StreamError};

// ============================================================================
// Kafka adapters
// ============================================================================
//
// KafkaOrderConsumer:      StreamConsumer on the ingest topic. Offsets are
//                          auto-committed, so a message counts as consumed
//                          once it reached a terminal state (or crashed us).
// KafkaDeadLetterProducer: FutureProducer on the dead-letter topic. Value is
//                          the raw bytes, failure metadata goes into
//                          headers.
//
// ============================================================================

const DEAD_LETTER_SEND_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaSettings {
    pub brokers: String,
    pub topic: String,
    pub group_id: String,
    pub dead_letter_topic: String,
}

pub struct KafkaOrderConsumer {
    consumer: StreamConsumer,
}

impl KafkaOrderConsumer {
    pub fn new(settings: &KafkaSettings) -> Result<Self, KafkaError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &settings.brokers)
            .set("group.id", &settings.group_id)
            .set("enable.auto.commit", "true")
            .set("auto.commit.interval.ms", "1000")
            .set("auto.offset.reset", "earliest")
            .create()?;

        consumer.subscribe(&[settings.topic.as_str()])?;

        tracing::info!(
            brokers = %settings.brokers,
            topic = %settings.topic,
            group = %settings.group_id,
            "Kafka consumer subscribed"
        );

        Ok(Self { consumer })
    }
}

#[async_trait]
impl MessageSource for KafkaOrderConsumer {
    async fn recv(&mut self) -> Result<InboundMessage, StreamError> {
        let message = self.consumer.recv().await?;

        tracing::debug!(
            topic = message.topic(),
            partition = message.partition(),
            offset = message.offset(),
            "Received message"
        );

        Ok(InboundMessage {
            key: message.key().map(<[u8]>::to_vec),
            // A tombstone has no value; it goes down the decode-failure path.
            payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        })
    }
}

pub struct KafkaDeadLetterProducer {
    producer: FutureProducer,
    topic: String,
}

impl KafkaDeadLetterProducer {
    pub fn new(settings: &KafkaSettings) -> Result<Self, KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &settings.brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self {
            producer,
            topic: settings.dead_letter_topic.clone(),
        })
    }
}

fn to_kafka_headers(letter: &DeadLetter) -> OwnedHeaders {
    letter
        .headers()
        .iter()
        .fold(OwnedHeaders::new_with_capacity(4), |headers, (key, value)| {
            headers.insert(Header {
                key: *key,
                value: Some(value.as_str()),
            })
        })
}

#[async_trait]
impl DeadLetterSink for KafkaDeadLetterProducer {
    async fn publish(&self, letter: &DeadLetter) -> Result<(), DeadLetterError> {
        let record = FutureRecord::<(), [u8]>::to(&self.topic)
            .payload(letter.payload.as_slice())
            .headers(to_kafka_headers(letter));

        self.producer
            .send(record, Timeout::After(DEAD_LETTER_SEND_TIMEOUT))
            .await
            .map_err(|(e, _)| DeadLetterError::Kafka(e))?;

        tracing::debug!(
            topic = %self.topic,
            error_class = %letter.error_class,
            "Published dead letter"
        );
        Ok(())
    }
}

use async_trait::async_trait;
use rdkafka::error::KafkaError;
use rdkafka::types::RDKafkaErrorCode;
use std::sync::Mutex;
use tokio::sync::mpsc;

use super::{DeadLetter, DeadLetterError, DeadLetterSink, InboundMessage, MessageSource, StreamError};

/// Stream source fed through a channel. A closed channel reads as a broken
/// stream, like a lost broker connection.
pub struct ChannelSource {
    rx: mpsc::UnboundedReceiver<Result<InboundMessage, StreamError>>,
}

impl ChannelSource {
    pub fn new() -> (mpsc::UnboundedSender<Result<InboundMessage, StreamError>>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

#[async_trait]
impl MessageSource for ChannelSource {
    async fn recv(&mut self) -> Result<InboundMessage, StreamError> {
        self.rx.recv().await.unwrap_or(Err(StreamError::Closed))
    }
}

/// Dead-letter sink that keeps everything it is given.
#[derive(Default)]
pub struct RecordingSink {
    letters: Mutex<Vec<DeadLetter>>,
    fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            letters: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn letters(&self) -> Vec<DeadLetter> {
        self.letters.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeadLetterSink for RecordingSink {
    async fn publish(&self, letter: &DeadLetter) -> Result<(), DeadLetterError> {
        if self.fail {
            return Err(DeadLetterError::Kafka(KafkaError::MessageProduction(
                RDKafkaErrorCode::BrokerTransportFailure,
            )));
        }
        self.letters.lock().unwrap().push(letter.clone());
        Ok(())
    }
}

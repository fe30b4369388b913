//! Broker consumer: the asynchronous half of the pipeline.
//!
//! The ingestor owns the inbound AMQP topology (topic exchange, durable
//! sensor queue, `sensor.<queue>` binding), consumes one message at a time
//! (prefetch 1), and runs the per-message analysis pair — singleton anomaly
//! detection plus the streaming efficiency score — dispatching each result
//! through [`ResultDispatcher`].
//!
//! Lifecycle is a one-way state machine: `Connecting` → `Subscribed` →
//! `Degraded`. Startup retries the connection a bounded number of times; a
//! consume-loop failure after subscription parks the ingestor in `Degraded`
//! permanently. There is no mid-stream reconnect — the synchronous API keeps
//! serving, and the health endpoint exposes the degraded state for the
//! orchestrator to act on.

use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions,
    ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Channel, Connection, ConnectionProperties, Consumer, ExchangeKind};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{BrokerConfig, CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY, STALENESS_WINDOW_SECS};
use crate::dispatch::ResultDispatcher;
use crate::engine::AnalyticsEngine;
use crate::types::{AnalysisResult, ResultEnvelope, SensorReading};

/// Ingestor lifecycle state, readable by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestorState {
    /// Startup connection attempts in progress.
    Connecting,
    /// Consuming from the sensor queue.
    Subscribed,
    /// Gave up: startup attempts exhausted or the consume stream failed.
    Degraded,
}

impl IngestorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Subscribed => "subscribed",
            Self::Degraded => "degraded",
        }
    }
}

/// Shared handle onto the ingestor's lifecycle state.
pub type IngestorStatus = Arc<RwLock<IngestorState>>;

/// Per-message handling verdict. Decides the acknowledgement.
enum MessageOutcome {
    /// Analyzed and dispatched. Ack.
    Processed,
    /// Older than the staleness window. Ack and drop.
    Stale,
    /// Undecodable payload. Nack without requeue.
    Rejected,
}

pub struct TelemetryIngestor {
    broker: BrokerConfig,
    engine: AnalyticsEngine,
    dispatcher: Arc<ResultDispatcher>,
    state: IngestorStatus,
    cancel: CancellationToken,
}

impl TelemetryIngestor {
    pub fn new(
        broker: BrokerConfig,
        engine: AnalyticsEngine,
        dispatcher: Arc<ResultDispatcher>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            broker,
            engine,
            dispatcher,
            state: Arc::new(RwLock::new(IngestorState::Connecting)),
            cancel,
        }
    }

    /// Handle for the health endpoint. Cheap to clone.
    pub fn status(&self) -> IngestorStatus {
        Arc::clone(&self.state)
    }

    /// Run the consumer until shutdown or failure. Consumes the ingestor;
    /// the returned future is the whole lifecycle.
    pub async fn run(self) {
        let (_connection, channel, consumer) = match self.connect_with_retry().await {
            Some(parts) => parts,
            None => {
                warn!(
                    attempts = CONNECT_ATTEMPTS,
                    "broker unreachable at startup; ingest path degraded, API still serving"
                );
                self.set_state(IngestorState::Degraded).await;
                return;
            }
        };

        self.set_state(IngestorState::Subscribed).await;
        info!(
            queue = %self.broker.sensor_queue,
            routing_key = %self.broker.sensor_routing_key(),
            "subscribed to sensor queue"
        );

        self.consume(channel, consumer).await;
    }

    /// Bounded startup connection loop. `None` after the last failed attempt.
    async fn connect_with_retry(&self) -> Option<(Connection, Channel, Consumer)> {
        for attempt in 1..=CONNECT_ATTEMPTS {
            if self.cancel.is_cancelled() {
                return None;
            }
            match self.connect_and_subscribe().await {
                Ok(parts) => return Some(parts),
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts = CONNECT_ATTEMPTS,
                        error = %e,
                        "broker connection failed"
                    );
                }
            }
            if attempt < CONNECT_ATTEMPTS {
                tokio::select! {
                    _ = self.cancel.cancelled() => return None,
                    _ = tokio::time::sleep(CONNECT_RETRY_DELAY) => {}
                }
            }
        }
        None
    }

    /// Connect, declare the inbound topology, and open the consumer.
    ///
    /// Exchange and queue are both durable; the binding routes
    /// `sensor.<queueName>` into the queue. Prefetch 1 keeps redelivery
    /// windows to a single message.
    async fn connect_and_subscribe(
        &self,
    ) -> Result<(Connection, Channel, Consumer), lapin::Error> {
        let connection =
            Connection::connect(&self.broker.amqp_uri(), ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;

        channel
            .exchange_declare(
                &self.broker.exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..ExchangeDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;
        channel
            .queue_declare(
                &self.broker.sensor_queue,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;
        channel
            .queue_bind(
                &self.broker.sensor_queue,
                &self.broker.exchange,
                &self.broker.sensor_routing_key(),
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;
        channel.basic_qos(1, BasicQosOptions::default()).await?;

        let consumer = channel
            .basic_consume(
                &self.broker.sensor_queue,
                "gridsense-ingestor",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        Ok((connection, channel, consumer))
    }

    /// The consume loop. Exits on shutdown (clean) or stream failure
    /// (parks in `Degraded`).
    async fn consume(&self, _channel: Channel, mut consumer: Consumer) {
        let mut processed = 0u64;
        let mut dropped_stale = 0u64;

        loop {
            let delivery = tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!(processed, dropped_stale, "ingestor shutting down");
                    return;
                }
                next = consumer.next() => match next {
                    Some(Ok(delivery)) => delivery,
                    Some(Err(e)) => {
                        warn!(error = %e, "consume stream failed; ingest path degraded");
                        break;
                    }
                    None => {
                        warn!("consume stream closed by broker; ingest path degraded");
                        break;
                    }
                },
            };

            let outcome = self.handle_message(&delivery.data).await;
            let ack_result = match outcome {
                MessageOutcome::Processed => {
                    processed += 1;
                    delivery.ack(BasicAckOptions::default()).await
                }
                MessageOutcome::Stale => {
                    dropped_stale += 1;
                    delivery.ack(BasicAckOptions::default()).await
                }
                MessageOutcome::Rejected => {
                    delivery
                        .nack(BasicNackOptions {
                            requeue: false,
                            ..BasicNackOptions::default()
                        })
                        .await
                }
            };

            if let Err(e) = ack_result {
                warn!(error = %e, "acknowledgement failed; ingest path degraded");
                break;
            }
        }

        self.set_state(IngestorState::Degraded).await;
    }

    /// Decode, staleness-check, analyze, and dispatch one message.
    async fn handle_message(&self, payload: &[u8]) -> MessageOutcome {
        let reading: SensorReading = match serde_json::from_slice(payload) {
            Ok(reading) => reading,
            Err(e) => {
                warn!(error = %e, "undecodable sensor message rejected");
                return MessageOutcome::Rejected;
            }
        };

        let now = Utc::now();
        if let Some(age) = reading.age_secs(now) {
            // Exactly at the window boundary still processes.
            if age > STALENESS_WINDOW_SECS {
                debug!(
                    device = %reading.device_id,
                    age_secs = age,
                    "stale reading dropped"
                );
                return MessageOutcome::Stale;
            }
        }

        let sample = reading.into_sample(now);
        let device_id = sample.device_id.clone();
        let batch = [sample];

        let anomalies = self.engine.detect_anomalies(&batch);
        if !anomalies.is_empty() {
            debug!(device = %device_id, count = anomalies.len(), "threshold anomalies raised");
            self.dispatcher
                .dispatch(&ResultEnvelope::new(
                    device_id.clone(),
                    AnalysisResult::Anomalies(anomalies),
                ))
                .await;
        }

        let efficiency = self.engine.streaming_efficiency(&batch);
        self.dispatcher
            .dispatch(&ResultEnvelope::new(
                device_id,
                AnalysisResult::Efficiency(efficiency),
            ))
            .await;

        MessageOutcome::Processed
    }

    async fn set_state(&self, next: IngestorState) {
        let mut state = self.state.write().await;
        *state = next;
    }
}

//! Result dispatch to the two downstream sinks.
//!
//! Every analysis result goes to both a callback HTTP service and a durable
//! results queue on the broker. The sinks are independent: neither send
//! retries, partial failure is accepted, and a failure on one sink never
//! blocks the other.
//!
//! The broker side owns exactly one lazily-established connection + channel
//! pair for the life of the dispatcher, guarded by a single mutex (the
//! channel is not safe for concurrent publishes). On any broker failure the
//! handle is torn down and rebuilt from scratch on the next call — no
//! in-place repair.

use lapin::options::{BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::{BrokerConfig, ServiceConfig, CALLBACK_TIMEOUT};
use crate::types::ResultEnvelope;

/// Persistent delivery mode for published results (survives broker restart).
const DELIVERY_MODE_PERSISTENT: u8 = 2;

/// Dispatch errors. Logged and dropped by the pipeline — results are
/// fire-and-forget.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("callback returned status {0}")]
    CallbackStatus(reqwest::StatusCode),
    #[error("broker error: {0}")]
    Broker(#[from] lapin::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Live connection + channel pair. At most one exists per dispatcher, and at
/// most one publish uses it at a time.
struct BrokerPublisher {
    connection: Connection,
    channel: Channel,
}

impl BrokerPublisher {
    /// Connect and declare the durable results queue.
    async fn connect(broker: &BrokerConfig) -> Result<Self, lapin::Error> {
        let connection =
            Connection::connect(&broker.amqp_uri(), ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        channel
            .queue_declare(
                &broker.results_queue,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;
        debug!(queue = %broker.results_queue, "broker publisher connected");
        Ok(Self {
            connection,
            channel,
        })
    }

    fn is_open(&self) -> bool {
        self.connection.status().connected() && self.channel.status().connected()
    }
}

/// Delivers result envelopes to the callback sink and the results queue.
pub struct ResultDispatcher {
    http: reqwest::Client,
    callback_url: String,
    broker: BrokerConfig,
    publisher: Mutex<Option<BrokerPublisher>>,
}

impl ResultDispatcher {
    /// Build a dispatcher. The broker connection is established lazily on the
    /// first publish, not here — a missing broker must not fail construction.
    /// Only a misconfigured HTTP client does.
    pub fn new(config: &ServiceConfig) -> Result<Self, DispatchError> {
        let http = reqwest::Client::builder()
            .timeout(CALLBACK_TIMEOUT)
            .danger_accept_invalid_certs(!config.tls_verify)
            .build()?;

        Ok(Self {
            http,
            callback_url: config.callback_url.clone(),
            broker: config.broker.clone(),
            publisher: Mutex::new(None),
        })
    }

    /// Send an envelope to both sinks. Failures are logged and dropped; the
    /// sinks are not transactionally coupled.
    pub async fn dispatch(&self, envelope: &ResultEnvelope) {
        match self.send_to_callback(envelope).await {
            Ok(()) => debug!(
                device = %envelope.device_id,
                result_type = %envelope.result_type,
                "callback delivery ok"
            ),
            Err(e) => warn!(
                device = %envelope.device_id,
                result_type = %envelope.result_type,
                error = %e,
                "callback delivery failed; result dropped for this sink"
            ),
        }

        match self.send_to_broker(envelope).await {
            Ok(()) => debug!(
                device = %envelope.device_id,
                result_type = %envelope.result_type,
                "broker publish ok"
            ),
            Err(e) => warn!(
                device = %envelope.device_id,
                result_type = %envelope.result_type,
                error = %e,
                "broker publish failed; handle torn down"
            ),
        }
    }

    /// POST the envelope to the configured callback URL.
    /// Success = 200/201. Never retries.
    pub async fn send_to_callback(&self, envelope: &ResultEnvelope) -> Result<(), DispatchError> {
        let resp = self
            .http
            .post(&self.callback_url)
            .json(envelope)
            .send()
            .await?;

        match resp.status() {
            reqwest::StatusCode::OK | reqwest::StatusCode::CREATED => Ok(()),
            status => Err(DispatchError::CallbackStatus(status)),
        }
    }

    /// Publish the envelope as a persistent message on the results queue,
    /// lazily (re)connecting first. On any failure the connection handle is
    /// reset so the next call starts from scratch.
    pub async fn send_to_broker(&self, envelope: &ResultEnvelope) -> Result<(), DispatchError> {
        let payload = serde_json::to_vec(envelope)?;

        let mut guard = self.publisher.lock().await;
        let result = self.publish_locked(&mut guard, &payload).await;
        if result.is_err() {
            *guard = None;
        }
        result
    }

    async fn publish_locked(
        &self,
        publisher: &mut Option<BrokerPublisher>,
        payload: &[u8],
    ) -> Result<(), DispatchError> {
        if publisher.as_ref().map_or(true, |p| !p.is_open()) {
            *publisher = Some(BrokerPublisher::connect(&self.broker).await?);
        }

        if let Some(live) = publisher.as_ref() {
            let _confirm = live
                .channel
                .basic_publish(
                    "",
                    &self.broker.results_queue,
                    BasicPublishOptions::default(),
                    payload,
                    BasicProperties::default().with_delivery_mode(DELIVERY_MODE_PERSISTENT),
                )
                .await?;
        }
        Ok(())
    }
}

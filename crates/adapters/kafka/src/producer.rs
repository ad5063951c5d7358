//! Kafka Producer

use std::time::Duration;

use async_trait::async_trait;
use commercium_errors::{AppError, AppResult};
use commercium_ports::{EventPublisher, OutboundMessage};
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use tracing::debug;

/// Kafka Producer 配置
#[derive(Debug, Clone)]
pub struct KafkaProducerConfig {
    pub brokers: String,
    pub client_id: String,
    pub request_timeout: Duration,
    /// 等待所有 ISR 确认
    pub acks_all: bool,
}

impl KafkaProducerConfig {
    pub fn new(brokers: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            client_id: "commercium".to_string(),
            request_timeout: Duration::from_secs(5),
            acks_all: true,
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn to_client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.brokers)
            .set("client.id", &self.client_id)
            .set("message.timeout.ms", self.request_timeout.as_millis().to_string())
            .set("enable.idempotence", self.acks_all.to_string())
            .set("acks", if self.acks_all { "all" } else { "1" });
        config
    }
}

/// Kafka Event Publisher
pub struct KafkaEventPublisher {
    producer: FutureProducer,
    timeout: Duration,
}

impl KafkaEventPublisher {
    pub fn new(config: &KafkaProducerConfig) -> AppResult<Self> {
        let producer: FutureProducer = config
            .to_client_config()
            .create()
            .map_err(|e| AppError::internal(format!("Failed to create Kafka producer: {}", e)))?;

        Ok(Self {
            producer,
            timeout: config.request_timeout,
        })
    }

    /// 发送并等待 broker 确认
    pub async fn send(&self, topic: &str, key: &str, payload: &str) -> AppResult<()> {
        let record = FutureRecord::to(topic).payload(payload).key(key);

        let result = self
            .producer
            .send(record, Timeout::After(self.timeout))
            .await
            .map_err(|(e, _)| {
                AppError::external_service(format!("Failed to publish to {}: {}", topic, e))
            });

        commercium_telemetry::metrics::record_kafka_message(topic, "produce", result.is_ok());
        let delivery = result?;

        debug!(
            topic = topic,
            key = key,
            delivery = ?delivery,
            "Message published"
        );

        Ok(())
    }

    /// 关闭前刷新待发送消息
    pub fn flush(&self, timeout: Duration) -> AppResult<()> {
        self.producer
            .flush(Timeout::After(timeout))
            .map_err(|e| AppError::external_service(format!("Kafka flush failed: {}", e)))
    }
}

#[async_trait]
impl EventPublisher for KafkaEventPublisher {
    async fn publish(&self, message: &OutboundMessage) -> AppResult<()> {
        self.send(&message.topic, &message.key, &message.payload)
            .await
    }
}

//! Kafka Consumer
//!
//! 手动提交 offset；处理失败按退避重试，仍失败则写入 `{topic}{dlq_suffix}`
//!
//! 提交某个 offset 即视为其之前的消息全部完成，因此失败消息写入 DLQ 之前
//! 不会继续消费同一分区

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use commercium_errors::{AppError, AppResult};
use commercium_event_core::{IncomingMessage, MessageHandler};
use futures_util::StreamExt;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Message};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Kafka Consumer 配置
#[derive(Debug, Clone)]
pub struct KafkaConsumerConfig {
    pub brokers: String,
    pub group_id: String,
    /// 首次尝试之后的重试次数
    pub max_retries: u32,
    /// 第一次重试前的等待，之后按 2 倍递增
    pub retry_backoff: Duration,
    pub enable_dlq: bool,
    pub dlq_suffix: String,
}

impl KafkaConsumerConfig {
    pub fn new(brokers: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            group_id: group_id.into(),
            max_retries: 3,
            retry_backoff: Duration::from_millis(100),
            enable_dlq: true,
            dlq_suffix: ".dlq".to_string(),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_dlq_enabled(mut self, enable_dlq: bool) -> Self {
        self.enable_dlq = enable_dlq;
        self
    }

    /// 第 attempt 次失败后的等待
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.retry_backoff.saturating_mul(2_u32.saturating_pow(attempt))
    }

    pub fn dlq_topic(&self, topic: &str) -> String {
        format!("{}{}", topic, self.dlq_suffix)
    }
}

/// DLQ 消息元数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqMetadata {
    pub original_topic: String,
    pub original_partition: i32,
    pub original_offset: i64,
    pub error_message: String,
    pub retry_count: u32,
    pub failed_at: i64,
}

/// DLQ 消息包装
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqMessage {
    pub metadata: DlqMetadata,
    pub payload: String,
}

/// DLQ 写入重试的最大间隔
const DLQ_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// 反复调用 `send` 直到成功；仅在关闭时放弃并返回 false
async fn send_until_delivered<F, Fut>(
    mut send: F,
    backoff: impl Fn(u32) -> Duration,
    shutdown: &CancellationToken,
) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<()>>,
{
    let mut attempt = 0;
    loop {
        match send().await {
            Ok(()) => return true,
            Err(e) => {
                let delay = backoff(attempt).min(DLQ_MAX_BACKOFF);
                error!(
                    attempt = attempt + 1,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "Failed to send to DLQ, retrying"
                );
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => return false,
                    _ = tokio::time::sleep(delay) => {}
                }
                attempt = attempt.saturating_add(1);
            }
        }
    }
}

/// 格式错误与业务规则错误重试无意义
fn is_retryable(err: &AppError) -> bool {
    !matches!(
        err,
        AppError::Validation(_) | AppError::BusinessRule(_) | AppError::NotFound(_)
    )
}

/// Kafka 消费者，按 handler 声明的 topics 订阅
pub struct KafkaEventConsumer {
    consumer: StreamConsumer,
    dlq_producer: Option<FutureProducer>,
    handler: Arc<dyn MessageHandler>,
    config: KafkaConsumerConfig,
}

impl KafkaEventConsumer {
    pub fn new(config: KafkaConsumerConfig, handler: Arc<dyn MessageHandler>) -> AppResult<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .create()
            .map_err(|e| AppError::internal(format!("Failed to create Kafka consumer: {}", e)))?;

        let topics = handler.topics();
        consumer
            .subscribe(&topics)
            .map_err(|e| AppError::internal(format!("Failed to subscribe to topics: {}", e)))?;

        let dlq_producer = if config.enable_dlq {
            let producer: FutureProducer = ClientConfig::new()
                .set("bootstrap.servers", &config.brokers)
                .set("client.id", format!("{}-dlq-producer", config.group_id))
                .create()
                .map_err(|e| AppError::internal(format!("Failed to create DLQ producer: {}", e)))?;
            Some(producer)
        } else {
            None
        };

        info!(
            group_id = %config.group_id,
            topics = ?topics,
            "Kafka consumer created"
        );

        Ok(Self {
            consumer,
            dlq_producer,
            handler,
            config,
        })
    }

    /// 消费直到取消
    pub async fn run(&self, shutdown: CancellationToken) -> AppResult<()> {
        let mut stream = self.consumer.stream();

        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                next = stream.next() => next,
            };

            let Some(result) = next else { break };
            match result {
                Ok(message) => {
                    if !self.process_message(&message, &shutdown).await {
                        // 未提交的消息在重启后从该 offset 重新投递
                        warn!(
                            group_id = %self.config.group_id,
                            topic = %message.topic(),
                            partition = message.partition(),
                            offset = message.offset(),
                            "Stopping before message was dead-lettered"
                        );
                        break;
                    }
                }
                Err(e) => error!(group_id = %self.config.group_id, error = %e, "Kafka error"),
            }
        }

        info!(group_id = %self.config.group_id, "Kafka consumer stopped");
        Ok(())
    }

    /// 返回 false 表示消息未能落定（未提交），消费必须停止
    async fn process_message(
        &self,
        message: &BorrowedMessage<'_>,
        shutdown: &CancellationToken,
    ) -> bool {
        let topic = message.topic().to_string();
        let partition = message.partition();
        let offset = message.offset();

        let payload = match message.payload_view::<str>() {
            Some(Ok(s)) => s.to_string(),
            Some(Err(e)) => {
                let reason = format!("Payload is not UTF-8: {}", e);
                let sent = self
                    .dead_letter(&topic, partition, offset, "", &reason, 0, shutdown)
                    .await;
                if !sent {
                    return false;
                }
                self.commit(message);
                return true;
            }
            None => {
                debug!(topic = %topic, partition, offset, "Empty message, skipping");
                self.commit(message);
                return true;
            }
        };

        let incoming = IncomingMessage {
            topic: topic.clone(),
            key: message
                .key_view::<str>()
                .and_then(|r| r.ok())
                .map(|s| s.to_string()),
            payload,
        };

        let outcome = self.process_with_retry(&incoming).await;
        commercium_telemetry::metrics::record_kafka_message(&topic, "consume", outcome.is_ok());

        if let Err((e, attempts)) = outcome {
            error!(
                topic = %topic,
                partition,
                offset,
                attempts,
                error = %e,
                "Failed to process message"
            );
            let sent = self
                .dead_letter(
                    &topic,
                    partition,
                    offset,
                    &incoming.payload,
                    &e.to_string(),
                    attempts,
                    shutdown,
                )
                .await;
            if !sent {
                return false;
            }
        }

        self.commit(message);
        true
    }

    async fn process_with_retry(&self, message: &IncomingMessage) -> Result<(), (AppError, u32)> {
        let mut attempt = 0;
        loop {
            match self.handler.handle(message).await {
                Ok(()) => {
                    if attempt > 0 {
                        info!(topic = %message.topic, attempt, "Message processed after retry");
                    }
                    return Ok(());
                }
                Err(e) if attempt < self.config.max_retries && is_retryable(&e) => {
                    let backoff = self.config.backoff_for(attempt);
                    warn!(
                        topic = %message.topic,
                        attempt = attempt + 1,
                        max_attempts = self.config.max_retries + 1,
                        error = %e,
                        backoff_ms = backoff.as_millis() as u64,
                        "Failed to process message, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err((e, attempt)),
            }
        }
    }

    fn commit(&self, message: &BorrowedMessage<'_>) {
        if let Err(e) = self.consumer.commit_message(message, CommitMode::Async) {
            error!(error = %e, "Failed to commit offset");
        }
    }

    /// 写入 DLQ（或 DLQ 关闭）后返回 true；写入期间收到关闭信号返回 false
    #[allow(clippy::too_many_arguments)]
    async fn dead_letter(
        &self,
        topic: &str,
        partition: i32,
        offset: i64,
        payload: &str,
        error_message: &str,
        retry_count: u32,
        shutdown: &CancellationToken,
    ) -> bool {
        send_until_delivered(
            || self.send_to_dlq(topic, partition, offset, payload, error_message, retry_count),
            |attempt| self.config.backoff_for(attempt),
            shutdown,
        )
        .await
    }

    async fn send_to_dlq(
        &self,
        original_topic: &str,
        partition: i32,
        offset: i64,
        payload: &str,
        error_message: &str,
        retry_count: u32,
    ) -> AppResult<()> {
        let Some(dlq_producer) = self.dlq_producer.as_ref() else {
            warn!(topic = %original_topic, offset, "DLQ is disabled, dropping message");
            return Ok(());
        };

        let dlq_topic = self.config.dlq_topic(original_topic);
        let dlq_message = DlqMessage {
            metadata: DlqMetadata {
                original_topic: original_topic.to_string(),
                original_partition: partition,
                original_offset: offset,
                error_message: error_message.to_string(),
                retry_count,
                failed_at: chrono::Utc::now().timestamp(),
            },
            payload: payload.to_string(),
        };
        let dlq_payload = serde_json::to_string(&dlq_message)?;

        let record: FutureRecord<'_, str, String> = FutureRecord::to(&dlq_topic)
            .payload(&dlq_payload)
            .key(original_topic);

        dlq_producer
            .send(record, Timeout::After(Duration::from_secs(5)))
            .await
            .map_err(|(e, _)| AppError::external_service(format!("Failed to send to DLQ: {}", e)))?;

        warn!(
            dlq_topic = %dlq_topic,
            original_topic = %original_topic,
            partition,
            offset,
            error = %error_message,
            "Message sent to DLQ"
        );
        Ok(())
    }

    pub fn group_id(&self) -> &str {
        &self.config.group_id
    }
}

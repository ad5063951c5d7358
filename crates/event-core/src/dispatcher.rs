//! 提交后事件分发
//!
//! 聚合保存成功后调用；单条消息按重试策略投递，最终失败只记录日志，不回滚业务操作

use std::sync::Arc;
use std::time::{Duration, Instant};

use commercium_common::{RetryConfig, with_retry};
use commercium_ports::{EventPublisher, OutboundMessage};
use tracing::{debug, error};

/// 分发结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: Vec<String>,
}

impl DispatchReport {
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

/// 事件分发器
#[derive(Clone)]
pub struct EventDispatcher {
    publisher: Arc<dyn EventPublisher>,
    retry: RetryConfig,
}

impl EventDispatcher {
    /// 默认 3 次、间隔 1 秒
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self::with_retry(publisher, RetryConfig::fixed(3, Duration::from_secs(1)))
    }

    pub fn with_retry(publisher: Arc<dyn EventPublisher>, retry: RetryConfig) -> Self {
        Self { publisher, retry }
    }

    pub async fn dispatch(&self, messages: Vec<OutboundMessage>) -> DispatchReport {
        let mut report = DispatchReport::default();

        for message in messages {
            let started = Instant::now();
            let operation = format!("publish:{}", message.topic);
            let result = with_retry(&self.retry, &operation, || self.publisher.publish(&message)).await;
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

            commercium_telemetry::metrics::record_event_publish(
                &message.topic,
                result.is_ok(),
                elapsed_ms,
            );

            match result {
                Ok(()) => {
                    debug!(topic = %message.topic, key = %message.key, "Event delivered");
                    report.delivered += 1;
                }
                Err(e) => {
                    error!(
                        topic = %message.topic,
                        key = %message.key,
                        error = %e,
                        "Event delivery failed after retries"
                    );
                    report.failed.push(message.topic);
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use commercium_errors::{AppError, AppResult};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Flaky {
        failures_before_success: u32,
        calls: AtomicU32,
        delivered: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EventPublisher for Flaky {
        async fn publish(&self, message: &OutboundMessage) -> AppResult<()> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if message.topic == "dead" || n < self.failures_before_success {
                return Err(AppError::external_service("broker unavailable"));
            }
            self.delivered.lock().unwrap().push(message.topic.clone());
            Ok(())
        }
    }

    fn flaky(failures: u32) -> Arc<Flaky> {
        Arc::new(Flaky {
            failures_before_success: failures,
            calls: AtomicU32::new(0),
            delivered: Mutex::new(Vec::new()),
        })
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig::fixed(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_retries_until_delivered() {
        let publisher = flaky(2);
        let dispatcher = EventDispatcher::with_retry(publisher.clone(), fast_retry());

        let report = dispatcher
            .dispatch(vec![OutboundMessage::new("inventory.reserve", "o-1", "{}")])
            .await;

        assert!(report.all_delivered());
        assert_eq!(publisher.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failure_does_not_block_other_messages() {
        let publisher = flaky(0);
        let dispatcher = EventDispatcher::with_retry(publisher.clone(), fast_retry());

        let report = dispatcher
            .dispatch(vec![
                OutboundMessage::new("dead", "k", "{}"),
                OutboundMessage::new("notification.order-created", "k", "{}"),
            ])
            .await;

        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, vec!["dead".to_string()]);
        assert_eq!(
            *publisher.delivered.lock().unwrap(),
            vec!["notification.order-created".to_string()]
        );
    }
}

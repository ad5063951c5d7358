//! Event Publisher trait 定义

use async_trait::async_trait;
use commercium_errors::AppResult;
use serde::Serialize;

/// 待发送的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub topic: String,
    pub key: String,
    pub payload: String,
}

impl OutboundMessage {
    pub fn new(topic: impl Into<String>, key: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            key: key.into(),
            payload: payload.into(),
        }
    }

    /// 序列化为 JSON 负载
    pub fn json<T: Serialize + ?Sized>(
        topic: impl Into<String>,
        key: impl Into<String>,
        value: &T,
    ) -> AppResult<Self> {
        Ok(Self::new(topic, key, serde_json::to_string(value)?))
    }
}

/// 事件发布者
///
/// 负载已序列化为 JSON，保证 trait 可作为 `dyn EventPublisher` 使用
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// 发布单条消息
    async fn publish(&self, message: &OutboundMessage) -> AppResult<()>;

    /// 逐条发布，遇到第一个错误即返回
    async fn publish_batch(&self, messages: &[OutboundMessage]) -> AppResult<()> {
        for message in messages {
            self.publish(message).await?;
        }
        Ok(())
    }
}

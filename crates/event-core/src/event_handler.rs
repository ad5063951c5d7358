//! 消息处理器定义

use async_trait::async_trait;
use commercium_errors::{AppError, AppResult};
use serde::de::DeserializeOwned;

/// 收到的消息
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub topic: String,
    pub key: Option<String>,
    pub payload: String,
}

impl IncomingMessage {
    /// 反序列化 JSON 负载，失败视为校验错误（不重试即进入 DLQ）
    pub fn parse<T: DeserializeOwned>(&self) -> AppResult<T> {
        serde_json::from_str(&self.payload).map_err(|e| {
            AppError::validation(format!("Invalid payload on {}: {}", self.topic, e))
        })
    }
}

/// 按 topic 订阅的消息处理器
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// 订阅的 topics
    fn topics(&self) -> Vec<&'static str>;

    /// 处理一条消息
    async fn handle(&self, message: &IncomingMessage) -> AppResult<()>;
}

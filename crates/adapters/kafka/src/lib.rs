//! commercium-adapter-kafka - Kafka 适配器
//!
//! - 带 key 的消息发布（实现 `EventPublisher`）
//! - 手动提交的消费循环，失败重试后转入 DLQ

mod consumer;
mod producer;

pub use consumer::*;
pub use producer::*;

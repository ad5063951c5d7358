//! 领域事件扇出
//!
//! 聚合保存成功后，把待发布事件按路由表转换为 Kafka 消息并交给分发器

use commercium_event_core::{DomainEvent, EventDispatcher, EventEnvelope};
use commercium_ports::OutboundMessage;
use tracing::{error, info};

/// 一条事件的投递目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub topic: &'static str,
    pub key: String,
}

impl Route {
    pub fn new(topic: &'static str, key: impl ToString) -> Self {
        Self {
            topic,
            key: key.to_string(),
        }
    }
}

/// 按路由生成消息，序列化失败的事件只记录日志
pub fn to_messages<E, F>(envelopes: &[EventEnvelope<E>], routes: F) -> Vec<OutboundMessage>
where
    E: DomainEvent,
    F: Fn(&E) -> Vec<Route>,
{
    let mut messages = Vec::new();
    for envelope in envelopes {
        let payload = match serde_json::to_string(envelope) {
            Ok(payload) => payload,
            Err(e) => {
                error!(
                    event_type = %envelope.event_type,
                    aggregate_id = %envelope.aggregate_id,
                    error = %e,
                    "Failed to serialize domain event"
                );
                continue;
            }
        };

        for route in routes(&envelope.data) {
            messages.push(OutboundMessage::new(route.topic, route.key, payload.clone()));
        }
    }
    messages
}

/// 发布事件；投递失败不影响已提交的业务操作
pub async fn publish_events<E, F>(dispatcher: &EventDispatcher, envelopes: Vec<EventEnvelope<E>>, routes: F)
where
    E: DomainEvent,
    F: Fn(&E) -> Vec<Route>,
{
    if envelopes.is_empty() {
        return;
    }

    let messages = to_messages(&envelopes, routes);
    let report = dispatcher.dispatch(messages).await;

    for envelope in &envelopes {
        info!(
            event_type = %envelope.event_type,
            aggregate_id = %envelope.aggregate_id,
            "Domain event dispatched"
        );
    }
    if !report.all_delivered() {
        error!(failed_topics = ?report.failed, "Some domain events were not delivered");
    }
}

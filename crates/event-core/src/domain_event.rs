//! Domain Event 定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Domain Event trait
pub trait DomainEvent: Send + Sync + Serialize {
    /// 事件类型名称
    fn event_type(&self) -> &'static str;

    /// 聚合类型
    fn aggregate_type(&self) -> &'static str;

    /// 聚合 ID
    fn aggregate_id(&self) -> String;
}

/// 事件信封
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    pub event_id: Uuid,
    pub event_type: String,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub occurred_at: DateTime<Utc>,
    pub data: E,
}

impl<E: DomainEvent> EventEnvelope<E> {
    pub fn wrap(event: E) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: event.event_type().to_string(),
            aggregate_type: event.aggregate_type().to_string(),
            aggregate_id: event.aggregate_id(),
            occurred_at: Utc::now(),
            data: event,
        }
    }
}

/// 聚合内待发布的事件
///
/// 聚合状态变更时记录，仓储保存成功后由应用服务取出并分发
#[derive(Debug, Clone)]
pub struct PendingEvents<E> {
    events: Vec<EventEnvelope<E>>,
}

impl<E> Default for PendingEvents<E> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<E: DomainEvent> PendingEvents<E> {
    pub fn record(&mut self, event: E) {
        self.events.push(EventEnvelope::wrap(event));
    }
}

impl<E> PendingEvents<E> {
    pub fn take(&mut self) -> Vec<EventEnvelope<E>> {
        std::mem::take(&mut self.events)
    }

    pub fn peek(&self) -> &[EventEnvelope<E>] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize)]
    struct Shipped {
        order_id: String,
    }

    impl DomainEvent for Shipped {
        fn event_type(&self) -> &'static str {
            "OrderShipped"
        }

        fn aggregate_type(&self) -> &'static str {
            "Order"
        }

        fn aggregate_id(&self) -> String {
            self.order_id.clone()
        }
    }

    #[test]
    fn test_take_drains_buffer() {
        let mut pending = PendingEvents::default();
        pending.record(Shipped {
            order_id: "o-1".into(),
        });

        assert_eq!(pending.len(), 1);
        let taken = pending.take();
        assert_eq!(taken[0].aggregate_id, "o-1");
        assert_eq!(taken[0].event_type, "OrderShipped");
        assert!(pending.is_empty());
    }
}

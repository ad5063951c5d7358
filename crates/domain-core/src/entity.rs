//! 实体基础 trait

use commercium_event_core::{DomainEvent, EventEnvelope, PendingEvents};

/// 实体 trait
pub trait Entity {
    type Id;

    fn id(&self) -> &Self::Id;
}

/// 聚合根 trait
///
/// 状态变更产生的事件暂存在聚合内，保存后通过 `take_events` 取出
pub trait AggregateRoot: Entity {
    type Event: DomainEvent;

    fn pending_events(&mut self) -> &mut PendingEvents<Self::Event>;

    fn take_events(&mut self) -> Vec<EventEnvelope<Self::Event>> {
        self.pending_events().take()
    }
}

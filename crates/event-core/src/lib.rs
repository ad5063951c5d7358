//! commercium-event-core - 事件核心库
//!
//! 领域事件信封、聚合内待发布事件缓冲、消息处理器与提交后分发

mod dispatcher;
mod domain_event;
mod event_handler;

pub use dispatcher::*;
pub use domain_event::*;
pub use event_handler::*;

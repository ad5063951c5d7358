//! ports - 抽象 trait 层
//!
//! 消息发布与分布式锁的抽象接口，由 adapters 实现

mod event_publisher;
mod lock;

pub use event_publisher::*;
pub use lock::*;

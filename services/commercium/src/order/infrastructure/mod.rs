//! 订单基础设施层

mod memory;
mod payment_events_handler;
mod postgres_order_repository;

pub use memory::*;
pub use payment_events_handler::*;
pub use postgres_order_repository::*;

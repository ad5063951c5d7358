//! 结算基础设施层

mod memory;
mod order_sales_source;
mod payment_events_handler;
mod postgres_settlement_repository;

pub use memory::*;
pub use order_sales_source::*;
pub use payment_events_handler::*;
pub use postgres_settlement_repository::*;

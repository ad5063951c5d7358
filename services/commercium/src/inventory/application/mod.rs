//! 库存应用服务

mod inventory_service;
mod stock_reservation_service;

pub use inventory_service::*;
pub use stock_reservation_service::*;

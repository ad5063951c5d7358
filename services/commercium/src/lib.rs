//! Commercium 电商后端
//!
//! 按限界上下文组织：订单、支付、库存、结算，以及跨上下文共享的 HTTP 与事件设施

pub mod inventory;
pub mod order;
pub mod payment;
pub mod settlement;
pub mod shared;

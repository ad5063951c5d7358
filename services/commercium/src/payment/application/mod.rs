//! 支付应用层

mod payment_service;

pub use payment_service::*;

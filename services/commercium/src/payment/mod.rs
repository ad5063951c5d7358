//! 支付 context：PG 请求、回调、取消

pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;

//! 订单 context：下单、取消、付款确认

pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;

//! 结算 context：按卖家与区间汇总已付款订单，计算佣金并输出报表

pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod jobs;

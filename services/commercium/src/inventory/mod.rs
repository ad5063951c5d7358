//! 库存 context：库存建档、预留/释放/扣减与流水

pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;

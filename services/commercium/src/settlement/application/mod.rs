//! 结算应用层

mod settlement_calculation_service;
mod settlement_report_service;
mod settlement_service;

pub use settlement_calculation_service::*;
pub use settlement_report_service::*;
pub use settlement_service::*;

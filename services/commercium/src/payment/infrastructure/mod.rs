//! 支付基础设施层

mod memory;
mod mock_gateway;
mod postgres_payment_repository;

pub use memory::*;
pub use mock_gateway::*;
pub use postgres_payment_repository::*;

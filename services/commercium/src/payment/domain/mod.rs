//! 支付领域层

mod events;
mod gateway;
mod payment;
mod repository;

pub use events::*;
pub use gateway::*;
pub use payment::*;
pub use repository::*;

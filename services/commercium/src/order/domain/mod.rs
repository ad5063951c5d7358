//! 订单领域层

mod events;
mod order;
mod repository;
mod services;

pub use events::*;
pub use order::*;
pub use repository::*;
pub use services::*;

//! 库存领域层

mod events;
mod inventory;
mod repository;
mod services;

pub use events::*;
pub use inventory::*;
pub use repository::*;
pub use services::*;

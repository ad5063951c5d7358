//! 结算领域层

mod events;
mod repository;
mod services;
mod settlement;
mod values;

pub use events::*;
pub use repository::*;
pub use services::*;
pub use settlement::*;
pub use values::*;

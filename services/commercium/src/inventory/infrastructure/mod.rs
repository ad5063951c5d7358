//! 库存基础设施层

mod memory;
mod order_events_handler;
mod postgres_inventory_repository;

pub use memory::*;
pub use order_events_handler::*;
pub use postgres_inventory_repository::*;

pub(crate) const VERSION_CONFLICT_MESSAGE: &str =
    "재고 정보가 다른 요청에 의해 변경되었습니다. 다시 시도해주세요.";

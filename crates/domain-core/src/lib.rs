//! domain-core - 跨 context 的领域核心类型
//!
//! 聚合根约定与金额计算工具

mod entity;
mod money;

pub use entity::*;
pub use money::*;

pub use rust_decimal::Decimal;

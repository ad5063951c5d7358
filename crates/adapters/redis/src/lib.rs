//! commercium-adapter-redis - Redis 适配器

mod connection;
mod distributed_lock;

pub use connection::*;
pub use distributed_lock::*;

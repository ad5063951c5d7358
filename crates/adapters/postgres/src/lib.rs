//! commercium-adapter-postgres - PostgreSQL 适配器

mod connection;
mod error;
mod migration;
mod timing;

pub use connection::*;
pub use error::*;
pub use migration::*;
pub use timing::*;

//! commercium-common - 通用类型和工具库

pub mod response;
pub mod retry;
pub mod types;

pub use response::*;
pub use retry::*;
pub use types::*;

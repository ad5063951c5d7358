//! commercium-bootstrap - 统一服务启动骨架
//!
//! 配置加载、日志、基础设施、健康检查与优雅关闭

mod health;
mod infrastructure;
mod metrics;
mod runtime;
mod shutdown;
mod starter;

pub use health::*;
pub use infrastructure::*;
pub use metrics::*;
pub use runtime::*;
pub use shutdown::*;
pub use starter::*;

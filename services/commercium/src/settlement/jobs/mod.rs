//! 结算定时任务

mod daily;
mod scheduler;
mod weekly;

pub use daily::*;
pub use scheduler::*;
pub use weekly::*;

/// 一次任务执行的结果统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub created: usize,
    pub completed: usize,
    pub failed: usize,
}

//! 结算调度器（UTC）
//!
//! - 每天 02:00 结算前一天
//! - 每周一 03:00 结算上一周
//! - 每小时整点统计待处理结算

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeDelta, Timelike, Utc};
use commercium_errors::AppResult;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::settlement::application::SettlementService;
use crate::settlement::domain::SettlementStatus;

use super::{DailySettlementJob, JobSummary, WeeklySettlementJob};

const DAILY_RUN_HOUR: u32 = 2;
const WEEKLY_RUN_HOUR: u32 = 3;

/// 到期的任务
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledTask {
    Daily,
    Weekly,
    StatusCheck,
}

fn at_hour(date: NaiveDate, hour: u32) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc() + TimeDelta::hours(i64::from(hour))
}

/// 严格晚于 `now` 的下一次日任务时间
pub fn next_daily_run(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = at_hour(now.date_naive(), DAILY_RUN_HOUR);
    if today > now { today } else { today + TimeDelta::days(1) }
}

pub fn next_weekly_run(now: DateTime<Utc>) -> DateTime<Utc> {
    let days_to_monday = (7 - now.weekday().num_days_from_monday()) % 7;
    let candidate = at_hour(now.date_naive() + Days::new(u64::from(days_to_monday)), WEEKLY_RUN_HOUR);
    if candidate > now { candidate } else { candidate + TimeDelta::days(7) }
}

pub fn next_status_check(now: DateTime<Utc>) -> DateTime<Utc> {
    at_hour(now.date_naive(), now.hour() + 1)
}

/// 日任务处理的日期（前一天）
pub fn daily_target(run_at: DateTime<Utc>) -> NaiveDate {
    run_at.date_naive() - Days::new(1)
}

/// 周任务处理的周一（上一周）
pub fn weekly_target(run_at: DateTime<Utc>) -> NaiveDate {
    let date = run_at.date_naive();
    date - Days::new(7 + u64::from(date.weekday().num_days_from_monday()))
}

/// 下一次触发时间及同时到期的任务
pub fn next_due(now: DateTime<Utc>) -> (DateTime<Utc>, Vec<ScheduledTask>) {
    let candidates = [
        (next_daily_run(now), ScheduledTask::Daily),
        (next_weekly_run(now), ScheduledTask::Weekly),
        (next_status_check(now), ScheduledTask::StatusCheck),
    ];
    let at = candidates
        .iter()
        .map(|(at, _)| *at)
        .min()
        .unwrap_or_else(|| next_status_check(now));
    let tasks = candidates
        .iter()
        .filter(|(time, _)| *time == at)
        .map(|(_, task)| *task)
        .collect();
    (at, tasks)
}

pub struct SettlementScheduler {
    daily: DailySettlementJob,
    weekly: WeeklySettlementJob,
    settlements: Arc<SettlementService>,
}

impl SettlementScheduler {
    pub fn new(
        daily: DailySettlementJob,
        weekly: WeeklySettlementJob,
        settlements: Arc<SettlementService>,
    ) -> Self {
        Self {
            daily,
            weekly,
            settlements,
        }
    }

    /// 循环调度直到取消
    pub async fn run(self, shutdown: CancellationToken) {
        info!("Settlement scheduler started");
        loop {
            let now = Utc::now();
            let (at, tasks) = next_due(now);
            let wait = (at - now).to_std().unwrap_or_default();

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(wait) => {
                    for task in tasks {
                        self.execute(task, at).await;
                    }
                }
            }
        }
        info!("Settlement scheduler stopped");
    }

    pub async fn execute(&self, task: ScheduledTask, run_at: DateTime<Utc>) {
        let started = Instant::now();
        let (job, result) = match task {
            ScheduledTask::Daily => ("daily_settlement", self.daily.run(daily_target(run_at)).await),
            ScheduledTask::Weekly => ("weekly_settlement", self.weekly.run(weekly_target(run_at)).await),
            ScheduledTask::StatusCheck => ("settlement_status_check", self.check_status().await),
        };

        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        commercium_telemetry::metrics::record_job_run(job, result.is_ok(), duration_ms);
        if let Err(e) = result {
            error!(job, error = %e, "Scheduled settlement job failed");
        }
    }

    async fn check_status(&self) -> AppResult<JobSummary> {
        let pending = self.settlements.count_by_status(SettlementStatus::Pending).await?;
        let calculating = self
            .settlements
            .count_by_status(SettlementStatus::Calculating)
            .await?;

        commercium_telemetry::metrics::set_settlement_backlog(SettlementStatus::Pending.as_str(), pending);
        commercium_telemetry::metrics::set_settlement_backlog(
            SettlementStatus::Calculating.as_str(),
            calculating,
        );

        if pending + calculating > 0 {
            warn!(pending, calculating, "Unfinished settlements remain");
        } else {
            info!("No unfinished settlements");
        }
        Ok(JobSummary::default())
    }
}

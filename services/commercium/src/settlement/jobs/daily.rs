//! 日结算任务：生成前一天的结算、逐个完成并输出日报

use std::sync::Arc;

use chrono::NaiveDate;
use commercium_errors::AppResult;
use tracing::{error, info, warn};

use crate::settlement::application::{
    SettlementReportService, SettlementService, daily_report_file_name,
};
use crate::settlement::domain::Settlement;

use super::JobSummary;

pub struct DailySettlementJob {
    settlements: Arc<SettlementService>,
    reports: Arc<SettlementReportService>,
}

impl DailySettlementJob {
    pub fn new(settlements: Arc<SettlementService>, reports: Arc<SettlementReportService>) -> Self {
        Self { settlements, reports }
    }

    pub async fn run(&self, date: NaiveDate) -> AppResult<JobSummary> {
        info!(date = %date, "Daily settlement job started");

        let created = self.settlements.create_daily_settlements(date).await?;
        let mut summary = JobSummary {
            created: created.len(),
            ..JobSummary::default()
        };

        let mut finished: Vec<Settlement> = Vec::with_capacity(created.len());
        for settlement in created {
            match self.settlements.complete_settlement(&settlement.id).await {
                Ok(completed) => {
                    summary.completed += 1;
                    finished.push(completed);
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!(
                        settlement_id = %settlement.id,
                        seller_id = %settlement.seller_id,
                        error = %e,
                        "Failed to complete daily settlement"
                    );
                    finished.push(settlement);
                }
            }
        }

        if !finished.is_empty() {
            self.write_report(date, &finished).await;
        }

        info!(
            date = %date,
            created = summary.created,
            completed = summary.completed,
            failed = summary.failed,
            "Daily settlement job finished"
        );
        Ok(summary)
    }

    /// 报表失败不影响已完成的结算
    async fn write_report(&self, date: NaiveDate, settlements: &[Settlement]) {
        let result = match self.reports.generate_daily_report(date, settlements) {
            Ok(bytes) => self.reports.save_report(&daily_report_file_name(date), &bytes).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            error!(date = %date, error = %e, "Failed to write daily settlement report");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::testing::{StaticSales, settlement_service};
    use crate::settlement::domain::SettlementStatus;
    use chrono::Utc;

    #[tokio::test]
    async fn test_run_completes_settlements_and_writes_report() {
        let (service, publisher) = settlement_service(StaticSales::with(&[
            ("seller-1", &[10_000, 5_000]),
            ("seller-2", &[20_000]),
            ("seller-3", &[]),
        ]));
        let service = Arc::new(service);
        let dir = tempfile::tempdir().unwrap();
        let reports = Arc::new(SettlementReportService::new(dir.path()));
        let job = DailySettlementJob::new(service.clone(), reports);
        let date = Utc::now().date_naive().pred_opt().unwrap();

        let summary = job.run(date).await.unwrap();

        assert_eq!(
            summary,
            JobSummary {
                created: 2,
                completed: 2,
                failed: 0
            }
        );
        assert_eq!(publisher.on_topic("settlement.completed").len(), 2);
        assert_eq!(
            service
                .get_settlements_by_status(SettlementStatus::Completed)
                .await
                .unwrap()
                .len(),
            2
        );
        assert!(dir.path().join(daily_report_file_name(date)).exists());
    }

    #[tokio::test]
    async fn test_run_without_sales_writes_no_report() {
        let (service, _) = settlement_service(StaticSales::default());
        let dir = tempfile::tempdir().unwrap();
        let job = DailySettlementJob::new(
            Arc::new(service),
            Arc::new(SettlementReportService::new(dir.path())),
        );
        let date = Utc::now().date_naive().pred_opt().unwrap();

        assert_eq!(job.run(date).await.unwrap(), JobSummary::default());
        assert!(!dir.path().join(daily_report_file_name(date)).exists());
    }
}

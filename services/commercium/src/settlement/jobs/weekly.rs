//! 周结算任务：为上周有销售但尚未结算的卖家补建周结算

use std::sync::Arc;

use chrono::NaiveDate;
use commercium_errors::AppResult;
use tracing::{error, info, warn};

use crate::settlement::application::{
    SettlementReportService, SettlementService, weekly_report_file_name,
};
use crate::settlement::domain::{SalesSource, Settlement, SettlementPeriod};

use super::JobSummary;

pub struct WeeklySettlementJob {
    settlements: Arc<SettlementService>,
    reports: Arc<SettlementReportService>,
    sales: Arc<dyn SalesSource>,
}

impl WeeklySettlementJob {
    pub fn new(
        settlements: Arc<SettlementService>,
        reports: Arc<SettlementReportService>,
        sales: Arc<dyn SalesSource>,
    ) -> Self {
        Self {
            settlements,
            reports,
            sales,
        }
    }

    pub async fn run(&self, week_start: NaiveDate) -> AppResult<JobSummary> {
        let period = SettlementPeriod::weekly(week_start);
        info!(period = %period, "Weekly settlement job started");

        let (from, to) = period.time_range();
        let sellers = self.sales.active_sellers(from, to).await?;

        let mut summary = JobSummary::default();
        let mut finished: Vec<Settlement> = Vec::new();
        for seller_id in sellers {
            if self.settlements.has_settlement(&seller_id, &period).await? {
                continue;
            }

            let settlement = match self
                .settlements
                .create_settlement(seller_id.clone(), period.start, period.end)
                .await
            {
                Ok(settlement) => settlement,
                Err(e) => {
                    summary.failed += 1;
                    warn!(seller_id = %seller_id, error = %e, "Failed to create weekly settlement");
                    continue;
                }
            };
            summary.created += 1;

            match self.settlements.complete_settlement(&settlement.id).await {
                Ok(completed) => {
                    summary.completed += 1;
                    finished.push(completed);
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!(
                        settlement_id = %settlement.id,
                        seller_id = %seller_id,
                        error = %e,
                        "Failed to complete weekly settlement"
                    );
                    finished.push(settlement);
                }
            }
        }

        if !finished.is_empty() {
            let file_name = weekly_report_file_name(period.start, period.end);
            let result = match self
                .reports
                .generate_weekly_report(period.start, period.end, &finished)
            {
                Ok(bytes) => self.reports.save_report(&file_name, &bytes).await.map(|_| ()),
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                error!(period = %period, error = %e, "Failed to write weekly settlement report");
            }
        }

        info!(
            period = %period,
            created = summary.created,
            completed = summary.completed,
            failed = summary.failed,
            "Weekly settlement job finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::testing::{StaticSales, settlement_service};
    use chrono::{Datelike, Days, Utc};

    fn last_week_start() -> NaiveDate {
        let today = Utc::now().date_naive();
        today - Days::new(7 + u64::from(today.weekday().num_days_from_monday()))
    }

    #[tokio::test]
    async fn test_weekly_run_creates_and_completes_once() {
        let data: &[(&str, &[i64])] = &[("seller-1", &[10_000]), ("seller-2", &[])];
        let (service, _) = settlement_service(StaticSales::with(data));
        let dir = tempfile::tempdir().unwrap();
        let job = WeeklySettlementJob::new(
            Arc::new(service),
            Arc::new(SettlementReportService::new(dir.path())),
            Arc::new(StaticSales::with(data)),
        );
        let start = last_week_start();

        let first = job.run(start).await.unwrap();
        // seller-2 没有明细，完成时失败
        assert_eq!(
            first,
            JobSummary {
                created: 2,
                completed: 1,
                failed: 1
            }
        );
        let end = SettlementPeriod::weekly(start).end;
        assert!(dir.path().join(weekly_report_file_name(start, end)).exists());

        let second = job.run(start).await.unwrap();
        assert_eq!(second, JobSummary::default());
    }
}

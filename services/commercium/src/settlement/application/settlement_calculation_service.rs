//! 结算计算：把区间内的已付款销售转为结算明细

use std::sync::Arc;

use chrono::NaiveDate;
use commercium_errors::AppResult;
use tracing::{error, info};

use crate::settlement::domain::{
    CommissionRate, SalesSource, Settlement, SettlementDomainService, SettlementItem,
    SettlementPeriod, SettlementRepository,
};

pub struct SettlementCalculationService {
    repository: Arc<dyn SettlementRepository>,
    sales: Arc<dyn SalesSource>,
    domain_service: SettlementDomainService,
    commission_rate: CommissionRate,
}

impl SettlementCalculationService {
    pub fn new(
        repository: Arc<dyn SettlementRepository>,
        sales: Arc<dyn SalesSource>,
        domain_service: SettlementDomainService,
        commission_rate: CommissionRate,
    ) -> Self {
        Self {
            repository,
            sales,
            domain_service,
            commission_rate,
        }
    }

    /// 计算失败时结算被标记为 FAILED，错误继续上抛
    pub async fn calculate_and_add_items(&self, settlement: &mut Settlement) -> AppResult<()> {
        if let Err(e) = self.try_calculate(settlement).await {
            error!(
                settlement_id = %settlement.id,
                seller_id = %settlement.seller_id,
                error = %e,
                "Settlement calculation failed"
            );
            settlement.fail(e.to_string());
            return Err(e);
        }

        info!(
            settlement_id = %settlement.id,
            seller_id = %settlement.seller_id,
            item_count = settlement.item_count(),
            net_amount = %settlement.amount.net,
            "Settlement calculated"
        );
        Ok(())
    }

    async fn try_calculate(&self, settlement: &mut Settlement) -> AppResult<()> {
        settlement.start_calculation()?;
        self.domain_service.validate_commission_rate(self.commission_rate)?;

        let (from, to) = settlement.period.time_range();
        let sales = self
            .sales
            .settleable_sales(&settlement.seller_id, from, to)
            .await?;

        let items = sales
            .into_iter()
            .map(|line| {
                SettlementItem::create(
                    line.order_id,
                    line.order_item_id,
                    line.product_id,
                    line.amount,
                    self.commission_rate,
                )
            })
            .collect::<AppResult<Vec<_>>>()?;
        settlement.add_items(items)
    }

    /// 为当天有销售且尚未结算的卖家生成日结算，只保留有明细的结算
    ///
    /// 单个卖家计算失败只记录日志
    pub async fn create_daily_settlements_for_all_sellers(&self, date: NaiveDate) -> AppResult<Vec<Settlement>> {
        let period = SettlementPeriod::daily(date);
        let (from, to) = period.time_range();
        let sellers = self.sales.active_sellers(from, to).await?;
        info!(date = %date, seller_count = sellers.len(), "Creating daily settlements");

        let mut settlements = Vec::new();
        for seller_id in sellers {
            if self
                .repository
                .exists_by_seller_id_and_period(&seller_id, period.start, period.end)
                .await?
            {
                info!(seller_id = %seller_id, date = %date, "Daily settlement already exists, skipping");
                continue;
            }

            let mut settlement = Settlement::create(seller_id, period)?;
            if self.calculate_and_add_items(&mut settlement).await.is_err() {
                continue;
            }
            if settlement.has_items() {
                settlements.push(settlement);
            }
        }

        info!(date = %date, created = settlements.len(), "Daily settlements prepared");
        Ok(settlements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settlement::domain::SettlementStatus;
    use crate::settlement::infrastructure::InMemorySettlementRepository;
    use crate::shared::testing::StaticSales;
    use chrono::Utc;
    use commercium_common::SellerId;
    use commercium_domain_core::Decimal;
    use commercium_errors::AppError;

    fn service(sales: StaticSales) -> (SettlementCalculationService, Arc<InMemorySettlementRepository>) {
        let repository = Arc::new(InMemorySettlementRepository::new());
        let service = SettlementCalculationService::new(
            repository.clone(),
            Arc::new(sales),
            SettlementDomainService::default(),
            CommissionRate::default(),
        );
        (service, repository)
    }

    fn yesterday() -> NaiveDate {
        Utc::now().date_naive().pred_opt().unwrap()
    }

    #[tokio::test]
    async fn test_calculate_adds_one_item_per_sale() {
        let (service, _) = service(StaticSales::with(&[("seller-1", &[10_000, 20_000])]));
        let mut settlement =
            Settlement::create(SellerId::parse("seller-1").unwrap(), SettlementPeriod::daily(yesterday())).unwrap();

        service.calculate_and_add_items(&mut settlement).await.unwrap();

        assert_eq!(settlement.status, SettlementStatus::Calculating);
        assert_eq!(settlement.item_count(), 2);
        assert_eq!(settlement.amount.total_sales, Decimal::from(30_000));
        assert_eq!(settlement.amount.commission, Decimal::from(900));
        assert_eq!(settlement.amount.net, Decimal::from(29_010));
    }

    #[tokio::test]
    async fn test_calculation_failure_marks_settlement_failed() {
        let mut sales = StaticSales::with(&[("seller-1", &[10_000])]);
        sales.failing_seller = Some(SellerId::parse("seller-1").unwrap());
        let (service, _) = service(sales);
        let mut settlement =
            Settlement::create(SellerId::parse("seller-1").unwrap(), SettlementPeriod::daily(yesterday())).unwrap();

        let err = service.calculate_and_add_items(&mut settlement).await.unwrap_err();
        assert!(matches!(err, AppError::ExternalService(_)));
        assert_eq!(settlement.status, SettlementStatus::Failed);
        assert!(settlement.failed_reason.is_some());
    }

    #[tokio::test]
    async fn test_daily_run_keeps_only_sellers_with_items() {
        let mut sales = StaticSales::with(&[
            ("seller-1", &[10_000]),
            ("seller-2", &[]),
            ("seller-3", &[5_000]),
        ]);
        sales.failing_seller = Some(SellerId::parse("seller-3").unwrap());
        let (service, _) = service(sales);

        let settlements = service
            .create_daily_settlements_for_all_sellers(yesterday())
            .await
            .unwrap();

        assert_eq!(settlements.len(), 1);
        assert_eq!(settlements[0].seller_id.as_str(), "seller-1");
    }

    #[tokio::test]
    async fn test_daily_run_skips_existing_settlement() {
        let (service, repository) = service(StaticSales::with(&[("seller-1", &[10_000])]));
        let existing =
            Settlement::create(SellerId::parse("seller-1").unwrap(), SettlementPeriod::daily(yesterday())).unwrap();
        repository.save(&existing).await.unwrap();

        let settlements = service
            .create_daily_settlements_for_all_sellers(yesterday())
            .await
            .unwrap();
        assert!(settlements.is_empty());
    }
}

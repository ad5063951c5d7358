//! 结算应用服务

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use commercium_common::{SellerId, SettlementId};
use commercium_domain_core::AggregateRoot;
use commercium_errors::{AppError, AppResult};
use commercium_event_core::EventDispatcher;
use tracing::{info, warn};

use crate::settlement::domain::{
    Settlement, SettlementDomainService, SettlementEvent, SettlementPeriod, SettlementRepository,
    SettlementStatus,
};
use crate::shared::events::{Route, publish_events};

use super::settlement_calculation_service::SettlementCalculationService;

/// 结算事件路由，key 为卖家 ID
pub fn settlement_event_routes(event: &SettlementEvent) -> Vec<Route> {
    let seller_id = event.seller_id();
    match event {
        SettlementEvent::Created(_) => vec![
            Route::new("settlement.created", seller_id),
            Route::new("notification.settlement-created", seller_id),
            Route::new("analytics.settlement-created", seller_id),
        ],
        SettlementEvent::Completed(_) => vec![
            Route::new("settlement.completed", seller_id),
            Route::new("notification.settlement-completed", seller_id),
            Route::new("analytics.settlement-completed", seller_id),
            Route::new("accounting.settlement-completed", seller_id),
        ],
    }
}

pub struct SettlementService {
    repository: Arc<dyn SettlementRepository>,
    calculation: SettlementCalculationService,
    domain_service: SettlementDomainService,
    dispatcher: EventDispatcher,
}

impl SettlementService {
    pub fn new(
        repository: Arc<dyn SettlementRepository>,
        calculation: SettlementCalculationService,
        domain_service: SettlementDomainService,
        dispatcher: EventDispatcher,
    ) -> Self {
        Self {
            repository,
            calculation,
            domain_service,
            dispatcher,
        }
    }

    pub async fn create_settlement(
        &self,
        seller_id: SellerId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Settlement> {
        info!(seller_id = %seller_id, start = %start, end = %end, "Creating settlement");

        let period = SettlementPeriod::of(start, end)?;
        self.domain_service.validate_period(&period)?;
        if self
            .repository
            .exists_by_seller_id_and_period(&seller_id, start, end)
            .await?
        {
            return Err(AppError::conflict("이미 해당 기간의 정산이 존재합니다"));
        }

        let mut settlement = Settlement::create(seller_id, period)?;
        if let Err(e) = self.calculation.calculate_and_add_items(&mut settlement).await {
            // 失败的结算也要落库以便追查
            self.save_and_publish(&mut settlement).await?;
            return Err(e);
        }
        self.save_and_publish(&mut settlement).await?;

        commercium_telemetry::metrics::record_business_event("settlement", "created");
        info!(
            settlement_id = %settlement.id,
            item_count = settlement.item_count(),
            net_amount = %settlement.amount.net,
            "Settlement created"
        );
        Ok(settlement)
    }

    pub async fn create_daily_settlements(&self, date: NaiveDate) -> AppResult<Vec<Settlement>> {
        let mut settlements = self
            .calculation
            .create_daily_settlements_for_all_sellers(date)
            .await?;
        for settlement in &mut settlements {
            self.save_and_publish(settlement).await?;
        }

        commercium_telemetry::metrics::record_business_event("settlement", "daily_created");
        info!(date = %date, count = settlements.len(), "Daily settlements created");
        Ok(settlements)
    }

    pub async fn complete_settlement(&self, id: &SettlementId) -> AppResult<Settlement> {
        info!(settlement_id = %id, "Completing settlement");

        let mut settlement = self.get_settlement(id).await?;
        if !settlement.has_items() {
            return Err(AppError::business_rule("정산할 항목이 없습니다"));
        }
        if settlement.status.is_completable() && !self.domain_service.can_complete(&settlement) {
            return Err(AppError::business_rule("정산 금액이 0원 이하인 정산은 완료할 수 없습니다"));
        }
        if !self.domain_service.is_amount_valid(&settlement.amount) {
            warn!(
                settlement_id = %id,
                net_amount = %settlement.amount.net,
                "Settlement amount is below the minimum settlement amount"
            );
        }

        settlement.complete()?;
        self.save_and_publish(&mut settlement).await?;

        commercium_telemetry::metrics::record_business_event("settlement", "completed");
        info!(settlement_id = %id, net_amount = %settlement.amount.net, "Settlement completed");
        Ok(settlement)
    }

    pub async fn get_settlement(&self, id: &SettlementId) -> AppResult<Settlement> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("정산 정보를 찾을 수 없습니다"))
    }

    /// 给定区间时按结算日期过滤
    pub async fn get_seller_settlements(
        &self,
        seller_id: &SellerId,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> AppResult<Vec<Settlement>> {
        match range {
            Some((from, to)) => {
                self.repository
                    .find_by_seller_id_and_settlement_date_between(seller_id, from, to)
                    .await
            }
            None => self.repository.find_by_seller_id(seller_id).await,
        }
    }

    pub async fn get_settlements_by_status(&self, status: SettlementStatus) -> AppResult<Vec<Settlement>> {
        self.repository.find_by_status(status).await
    }

    pub async fn get_settlements_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Settlement>> {
        self.repository.find_by_settlement_date_between(from, to).await
    }

    pub async fn count_by_status(&self, status: SettlementStatus) -> AppResult<i64> {
        self.repository.count_by_status(status).await
    }

    pub async fn has_settlement(&self, seller_id: &SellerId, period: &SettlementPeriod) -> AppResult<bool> {
        self.repository
            .exists_by_seller_id_and_period(seller_id, period.start, period.end)
            .await
    }

    pub async fn cancel_settlement(&self, id: &SettlementId, reason: &str) -> AppResult<Settlement> {
        let mut settlement = self.get_settlement(id).await?;
        settlement.cancel(reason)?;
        self.save_and_publish(&mut settlement).await?;

        commercium_telemetry::metrics::record_business_event("settlement", "cancelled");
        info!(settlement_id = %id, reason, "Settlement cancelled");
        Ok(settlement)
    }

    async fn save_and_publish(&self, settlement: &mut Settlement) -> AppResult<()> {
        self.repository.save(settlement).await?;
        publish_events(&self.dispatcher, settlement.take_events(), settlement_event_routes).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::testing::{StaticSales, settlement_service};
    use commercium_domain_core::Decimal;

    fn seller(id: &str) -> SellerId {
        SellerId::parse(id).unwrap()
    }

    fn yesterday() -> NaiveDate {
        Utc::now().date_naive().pred_opt().unwrap()
    }

    #[tokio::test]
    async fn test_create_then_complete_publishes_both_events() {
        let (service, publisher) = settlement_service(StaticSales::with(&[("seller-1", &[10_000])]));

        let created = service
            .create_settlement(seller("seller-1"), yesterday(), yesterday())
            .await
            .unwrap();
        assert_eq!(created.status, SettlementStatus::Calculating);
        assert_eq!(
            publisher.topics(),
            vec![
                "settlement.created",
                "notification.settlement-created",
                "analytics.settlement-created"
            ]
        );
        assert_eq!(publisher.messages()[0].key, "seller-1");
        publisher.clear();

        let completed = service.complete_settlement(&created.id).await.unwrap();
        assert_eq!(completed.status, SettlementStatus::Completed);
        assert_eq!(completed.amount.net, Decimal::from(9_670));
        assert_eq!(publisher.on_topic("accounting.settlement-completed").len(), 1);

        let json: serde_json::Value =
            serde_json::from_str(&publisher.on_topic("settlement.completed")[0].payload).unwrap();
        assert_eq!(json["event_type"], "SettlementCompleted");
        assert_eq!(json["data"]["itemCount"], 1);
    }

    #[tokio::test]
    async fn test_duplicate_period_conflicts() {
        let (service, _) = settlement_service(StaticSales::with(&[("seller-1", &[10_000])]));
        service
            .create_settlement(seller("seller-1"), yesterday(), yesterday())
            .await
            .unwrap();

        let err = service
            .create_settlement(seller("seller-1"), yesterday(), yesterday())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_future_period_is_rejected() {
        let (service, _) = settlement_service(StaticSales::default());
        let tomorrow = Utc::now().date_naive().succ_opt().unwrap();
        let err = service
            .create_settlement(seller("seller-1"), tomorrow, tomorrow)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_failed_calculation_is_persisted() {
        let mut sales = StaticSales::with(&[("seller-1", &[10_000])]);
        sales.failing_seller = Some(seller("seller-1"));
        let (service, _) = settlement_service(sales);

        assert!(service
            .create_settlement(seller("seller-1"), yesterday(), yesterday())
            .await
            .is_err());
        let failed = service.get_settlements_by_status(SettlementStatus::Failed).await.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(service.count_by_status(SettlementStatus::Failed).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_complete_without_items_is_business_rule() {
        let (service, _) = settlement_service(StaticSales::with(&[("seller-1", &[])]));
        let created = service
            .create_settlement(seller("seller-1"), yesterday(), yesterday())
            .await
            .unwrap();

        let err = service.complete_settlement(&created.id).await.unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
    }

    #[tokio::test]
    async fn test_completed_settlement_cannot_be_cancelled() {
        let (service, _) = settlement_service(StaticSales::with(&[("seller-1", &[10_000])]));
        let created = service
            .create_settlement(seller("seller-1"), yesterday(), yesterday())
            .await
            .unwrap();
        service.complete_settlement(&created.id).await.unwrap();

        let err = service.cancel_settlement(&created.id, "관리자 취소").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_seller_settlements_with_and_without_range() {
        let (service, _) = settlement_service(StaticSales::with(&[("seller-1", &[10_000])]));
        service
            .create_settlement(seller("seller-1"), yesterday(), yesterday())
            .await
            .unwrap();

        let all = service.get_seller_settlements(&seller("seller-1"), None).await.unwrap();
        assert_eq!(all.len(), 1);

        let past = Utc::now() - chrono::Duration::days(30);
        let none = service
            .get_seller_settlements(&seller("seller-1"), Some((past, past)))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_settlement_is_not_found() {
        let (service, _) = settlement_service(StaticSales::default());
        let err = service.get_settlement(&SettlementId::new()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}

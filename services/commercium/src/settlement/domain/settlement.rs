//! 结算聚合

use chrono::{DateTime, Utc};
use commercium_common::{OrderId, OrderItemId, ProductId, SellerId, SettlementId, SettlementItemId};
use commercium_domain_core::{AggregateRoot, Decimal, Entity};
use commercium_errors::{AppError, AppResult};
use commercium_event_core::PendingEvents;
use serde::{Deserialize, Serialize};

use super::events::{SettlementCompleted, SettlementCreated, SettlementEvent};
use super::values::{CommissionRate, SettlementAmount, SettlementPeriod, SettlementStatus};

/// 结算明细，对应卖家的一个订单明细
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementItem {
    pub id: SettlementItemId,
    pub order_id: OrderId,
    pub order_item_id: OrderItemId,
    pub product_id: ProductId,
    pub sale_amount: Decimal,
    pub commission_rate: CommissionRate,
    pub amount: SettlementAmount,
    pub created_at: DateTime<Utc>,
}

impl SettlementItem {
    pub fn create(
        order_id: OrderId,
        order_item_id: OrderItemId,
        product_id: ProductId,
        sale_amount: Decimal,
        commission_rate: CommissionRate,
    ) -> AppResult<Self> {
        Ok(Self {
            id: SettlementItemId::new(),
            order_id,
            order_item_id,
            product_id,
            sale_amount,
            commission_rate,
            amount: SettlementAmount::calculate(sale_amount, commission_rate)?,
            created_at: Utc::now(),
        })
    }
}

/// 结算聚合根
#[derive(Debug, Clone)]
pub struct Settlement {
    pub id: SettlementId,
    pub seller_id: SellerId,
    pub period: SettlementPeriod,
    pub settlement_date: DateTime<Utc>,
    pub amount: SettlementAmount,
    pub status: SettlementStatus,
    pub items: Vec<SettlementItem>,
    pub failed_reason: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    events: PendingEvents<SettlementEvent>,
}

impl Settlement {
    pub fn create(seller_id: SellerId, period: SettlementPeriod) -> AppResult<Self> {
        if seller_id.as_str().trim().is_empty() {
            return Err(AppError::validation("판매자 ID는 필수입니다"));
        }

        let now = Utc::now();
        let mut settlement = Self {
            id: SettlementId::new(),
            seller_id,
            period,
            settlement_date: now,
            amount: SettlementAmount::zero(),
            status: SettlementStatus::Pending,
            items: Vec::new(),
            failed_reason: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
            events: PendingEvents::default(),
        };
        settlement.events.record(SettlementEvent::Created(SettlementCreated {
            settlement_id: settlement.id,
            seller_id: settlement.seller_id.clone(),
            period,
        }));
        Ok(settlement)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: SettlementId,
        seller_id: SellerId,
        period: SettlementPeriod,
        settlement_date: DateTime<Utc>,
        status: SettlementStatus,
        items: Vec<SettlementItem>,
        failed_reason: Option<String>,
        completed_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let amount = sum_amounts(&items);
        Self {
            id,
            seller_id,
            period,
            settlement_date,
            amount,
            status,
            items,
            failed_reason,
            completed_at,
            created_at,
            updated_at,
            events: PendingEvents::default(),
        }
    }

    pub fn add_item(&mut self, item: SettlementItem) -> AppResult<()> {
        if self.status.is_final() {
            return Err(self.invalid_state("항목을 추가할"));
        }
        self.items.push(item);
        self.amount = sum_amounts(&self.items);
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn add_items(&mut self, items: Vec<SettlementItem>) -> AppResult<()> {
        for item in items {
            self.add_item(item)?;
        }
        Ok(())
    }

    pub fn start_calculation(&mut self) -> AppResult<()> {
        if !self.status.is_completable() {
            return Err(self.invalid_state("계산을 시작할"));
        }
        self.status = SettlementStatus::Calculating;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn complete(&mut self) -> AppResult<()> {
        if !self.status.is_completable() {
            return Err(self.invalid_state("완료할"));
        }
        let now = Utc::now();
        self.status = SettlementStatus::Completed;
        self.completed_at = Some(now);
        self.updated_at = now;
        self.events.record(SettlementEvent::Completed(SettlementCompleted {
            settlement_id: self.id,
            seller_id: self.seller_id.clone(),
            net_amount: self.amount.net,
            item_count: self.items.len(),
        }));
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        self.status = SettlementStatus::Failed;
        self.failed_reason = Some(reason.into());
        self.updated_at = Utc::now();
    }

    pub fn cancel(&mut self, reason: &str) -> AppResult<()> {
        if self.status == SettlementStatus::Completed {
            return Err(AppError::invalid_state("완료된 정산은 취소할 수 없습니다"));
        }
        self.status = SettlementStatus::Cancelled;
        self.failed_reason = Some(reason.to_string());
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn has_items(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    fn invalid_state(&self, action: &str) -> AppError {
        AppError::invalid_state(format!(
            "정산 상태가 {}인 경우 {} 수 없습니다",
            self.status.description(),
            action
        ))
    }
}

fn sum_amounts(items: &[SettlementItem]) -> SettlementAmount {
    items
        .iter()
        .fold(SettlementAmount::zero(), |acc, item| acc.add(&item.amount))
}

impl Entity for Settlement {
    type Id = SettlementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl AggregateRoot for Settlement {
    type Event = SettlementEvent;

    fn pending_events(&mut self) -> &mut PendingEvents<Self::Event> {
        &mut self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use commercium_event_core::DomainEvent;

    fn settlement() -> Settlement {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        Settlement::create(SellerId::parse("seller-1").unwrap(), SettlementPeriod::daily(date)).unwrap()
    }

    fn item(amount: i64) -> SettlementItem {
        SettlementItem::create(
            OrderId::new(),
            OrderItemId::new(),
            ProductId::parse("P-1").unwrap(),
            Decimal::from(amount),
            CommissionRate::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_create_records_event() {
        let mut s = settlement();
        assert_eq!(s.status, SettlementStatus::Pending);
        let events = s.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data.event_type(), "SettlementCreated");
        assert_eq!(events[0].aggregate_id, s.id.to_string());
    }

    #[test]
    fn test_items_recalculate_amount() {
        let mut s = settlement();
        s.start_calculation().unwrap();
        s.add_items(vec![item(10_000), item(20_000)]).unwrap();

        assert_eq!(s.amount.total_sales, Decimal::from(30_000));
        assert_eq!(s.amount.commission, Decimal::from(900));
        assert_eq!(s.amount.vat, Decimal::from(90));
        assert_eq!(s.amount.net, Decimal::from(29_010));
    }

    #[test]
    fn test_complete_records_net_and_blocks_further_items() {
        let mut s = settlement();
        s.add_item(item(10_000)).unwrap();
        s.take_events();
        s.complete().unwrap();

        assert!(s.completed_at.is_some());
        let events = s.take_events();
        match &events[0].data {
            SettlementEvent::Completed(e) => {
                assert_eq!(e.net_amount, Decimal::from(9_670));
                assert_eq!(e.item_count, 1);
            }
            other => panic!("unexpected event: {:?}", other),
        }

        let err = s.add_item(item(1_000)).unwrap_err();
        assert!(err.to_string().contains("정산완료인 경우 항목을 추가할 수 없습니다"));
        assert!(s.cancel("관리자 취소").is_err());
    }

    #[test]
    fn test_failed_settlement_cannot_restart() {
        let mut s = settlement();
        s.fail("정산 계산 중 오류 발생");
        assert!(matches!(s.start_calculation(), Err(AppError::InvalidState(_))));
        s.cancel("관리자 취소").unwrap();
        assert_eq!(s.status, SettlementStatus::Cancelled);
    }
}

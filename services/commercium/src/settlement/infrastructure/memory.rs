//! 内存结算 Repository，用于本地开发与测试

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use commercium_common::{SellerId, SettlementId};
use commercium_domain_core::AggregateRoot;
use commercium_errors::{AppError, AppResult};
use parking_lot::RwLock;

use crate::settlement::domain::{Settlement, SettlementRepository, SettlementStatus};

#[derive(Default)]
pub struct InMemorySettlementRepository {
    settlements: RwLock<HashMap<SettlementId, Settlement>>,
}

impl InMemorySettlementRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn select<F>(&self, predicate: F) -> Vec<Settlement>
    where
        F: Fn(&Settlement) -> bool,
    {
        let mut found: Vec<Settlement> = self
            .settlements
            .read()
            .values()
            .filter(|s| predicate(s))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.settlement_date.cmp(&a.settlement_date));
        found
    }
}

#[async_trait]
impl SettlementRepository for InMemorySettlementRepository {
    async fn save(&self, settlement: &Settlement) -> AppResult<()> {
        let mut settlements = self.settlements.write();
        let duplicate = settlements.values().any(|s| {
            s.id != settlement.id && s.seller_id == settlement.seller_id && s.period == settlement.period
        });
        if duplicate {
            return Err(AppError::conflict("이미 해당 기간의 정산이 존재합니다"));
        }

        let mut stored = settlement.clone();
        stored.take_events();
        settlements.insert(settlement.id, stored);
        Ok(())
    }

    async fn find_by_id(&self, id: &SettlementId) -> AppResult<Option<Settlement>> {
        Ok(self.settlements.read().get(id).cloned())
    }

    async fn find_by_seller_id(&self, seller_id: &SellerId) -> AppResult<Vec<Settlement>> {
        Ok(self.select(|s| &s.seller_id == seller_id))
    }

    async fn find_by_seller_id_and_settlement_date_between(
        &self,
        seller_id: &SellerId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Settlement>> {
        Ok(self.select(|s| {
            &s.seller_id == seller_id && s.settlement_date >= from && s.settlement_date <= to
        }))
    }

    async fn find_by_settlement_date_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Settlement>> {
        Ok(self.select(|s| s.settlement_date >= from && s.settlement_date <= to))
    }

    async fn find_by_status(&self, status: SettlementStatus) -> AppResult<Vec<Settlement>> {
        Ok(self.select(|s| s.status == status))
    }

    async fn count_by_status(&self, status: SettlementStatus) -> AppResult<i64> {
        Ok(self.select(|s| s.status == status).len() as i64)
    }

    async fn exists_by_seller_id_and_period(
        &self,
        seller_id: &SellerId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<bool> {
        Ok(self
            .settlements
            .read()
            .values()
            .any(|s| &s.seller_id == seller_id && s.period.start == start && s.period.end == end))
    }
}

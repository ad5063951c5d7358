//! 结算领域服务

use chrono::{NaiveDate, Utc};
use commercium_config::SettlementConfig;
use commercium_domain_core::Decimal;
use commercium_errors::{AppError, AppResult};

use super::settlement::Settlement;
use super::values::{CommissionRate, SettlementAmount, SettlementPeriod};

/// 佣金率上限 10%
const MAX_COMMISSION_PERCENTAGE: i64 = 10;

#[derive(Debug, Clone)]
pub struct SettlementDomainService {
    max_period_days: i64,
    min_settlement_amount: Decimal,
}

impl SettlementDomainService {
    pub fn new(config: &SettlementConfig) -> Self {
        Self {
            max_period_days: config.max_period_days,
            min_settlement_amount: config.min_settlement_amount,
        }
    }

    pub fn validate_period(&self, period: &SettlementPeriod) -> AppResult<()> {
        self.validate_period_at(period, Utc::now().date_naive())
    }

    fn validate_period_at(&self, period: &SettlementPeriod, today: NaiveDate) -> AppResult<()> {
        if period.end > today {
            return Err(AppError::validation("미래 날짜에 대한 정산은 생성할 수 없습니다"));
        }
        if period.days() > self.max_period_days {
            return Err(AppError::validation(format!(
                "정산 기간은 최대 {}일까지 가능합니다",
                self.max_period_days
            )));
        }
        Ok(())
    }

    pub fn validate_commission_rate(&self, rate: CommissionRate) -> AppResult<()> {
        if rate.percentage() > Decimal::from(MAX_COMMISSION_PERCENTAGE) {
            return Err(AppError::validation("수수료율은 10%를 초과할 수 없습니다"));
        }
        Ok(())
    }

    pub fn is_amount_valid(&self, amount: &SettlementAmount) -> bool {
        amount.net >= self.min_settlement_amount
    }

    pub fn can_complete(&self, settlement: &Settlement) -> bool {
        settlement.has_items()
            && settlement.status.is_completable()
            && settlement.amount.net > Decimal::ZERO
    }
}

impl Default for SettlementDomainService {
    fn default() -> Self {
        Self::new(&SettlementConfig::default())
    }
}

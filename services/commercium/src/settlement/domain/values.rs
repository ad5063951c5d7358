//! 结算值对象

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeDelta, Utc};
use commercium_domain_core::{Decimal, round_half_up};
use commercium_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// 佣金率，0.03 表示 3%
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommissionRate(Decimal);

impl CommissionRate {
    pub fn of(rate: Decimal) -> AppResult<Self> {
        if rate < Decimal::ZERO || rate > Decimal::ONE {
            return Err(AppError::validation("수수료율은 0~100% 사이여야 합니다"));
        }
        Ok(Self(rate))
    }

    pub fn rate(&self) -> Decimal {
        self.0
    }

    pub fn commission(&self, amount: Decimal) -> Decimal {
        round_half_up(amount * self.0, 0)
    }

    pub fn percentage(&self) -> Decimal {
        self.0 * Decimal::ONE_HUNDRED
    }
}

impl Default for CommissionRate {
    fn default() -> Self {
        Self(Decimal::new(3, 2))
    }
}

/// 结算金额：销售额、佣金、佣金增值税与实付
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SettlementAmount {
    pub total_sales: Decimal,
    pub commission: Decimal,
    pub vat: Decimal,
    pub net: Decimal,
}

impl SettlementAmount {
    pub fn calculate(total_sales: Decimal, rate: CommissionRate) -> AppResult<Self> {
        if total_sales < Decimal::ZERO {
            return Err(AppError::validation("매출 금액은 0 이상이어야 합니다"));
        }
        let commission = rate.commission(total_sales);
        // 佣金的 10%
        let vat = round_half_up(commission * Decimal::new(1, 1), 0);
        Ok(Self {
            total_sales,
            commission,
            vat,
            net: total_sales - commission - vat,
        })
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn add(&self, other: &Self) -> Self {
        Self {
            total_sales: self.total_sales + other.total_sales,
            commission: self.commission + other.commission,
            vat: self.vat + other.vat,
            net: self.net + other.net,
        }
    }

    /// 实际佣金率，保留 4 位
    pub fn commission_rate(&self) -> Decimal {
        if self.total_sales.is_zero() {
            return Decimal::ZERO;
        }
        round_half_up(self.commission / self.total_sales, 4)
    }
}

/// 结算区间（含首尾）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SettlementPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SettlementPeriod {
    pub fn of(start: NaiveDate, end: NaiveDate) -> AppResult<Self> {
        if start > end {
            return Err(AppError::validation("정산 시작일은 종료일보다 이후일 수 없습니다"));
        }
        Ok(Self { start, end })
    }

    pub fn daily(date: NaiveDate) -> Self {
        Self { start: date, end: date }
    }

    pub fn weekly(start: NaiveDate) -> Self {
        Self {
            start,
            end: start + Days::new(6),
        }
    }

    pub fn monthly(year: i32, month: u32) -> AppResult<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| AppError::validation("잘못된 정산 월입니다"))?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(|| AppError::validation("잘못된 정산 월입니다"))?;
        let end = next
            .pred_opt()
            .ok_or_else(|| AppError::validation("잘못된 정산 월입니다"))?;
        Ok(Self { start, end })
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// 对应的 UTC 时间区间（首日零点至末日最后一刻）
    pub fn time_range(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            self.start.and_time(NaiveTime::MIN).and_utc(),
            (self.end + Days::new(1)).and_time(NaiveTime::MIN).and_utc() - TimeDelta::nanoseconds(1),
        )
    }

    pub fn description(&self) -> String {
        if self.start == self.end {
            self.start.to_string()
        } else {
            format!("{} ~ {}", self.start, self.end)
        }
    }
}

impl fmt::Display for SettlementPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// 结算状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementStatus {
    Pending,
    Calculating,
    Completed,
    Failed,
    Cancelled,
}

impl SettlementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Calculating => "CALCULATING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Pending => "정산대기",
            Self::Calculating => "정산계산중",
            Self::Completed => "정산완료",
            Self::Failed => "정산실패",
            Self::Cancelled => "정산취소",
        }
    }

    pub fn is_completable(&self) -> bool {
        matches!(self, Self::Pending | Self::Calculating)
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettlementStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "CALCULATING" => Ok(Self::Calculating),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(AppError::validation(format!("Unknown settlement status: {}", other))),
        }
    }
}

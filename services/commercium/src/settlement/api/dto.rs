//! 结算 API 请求/响应体

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use commercium_domain_core::Decimal;
use commercium_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::settlement::domain::{Settlement, SettlementItem, SettlementPeriod};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSettlementParams {
    pub seller_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// 按结算日期过滤，时间按 UTC 解释，首尾需同时给出
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRangeParams {
    pub start_date_time: Option<NaiveDateTime>,
    pub end_date_time: Option<NaiveDateTime>,
}

impl SettlementRangeParams {
    pub fn range(&self) -> AppResult<Option<(DateTime<Utc>, DateTime<Utc>)>> {
        match (self.start_date_time, self.end_date_time) {
            (Some(start), Some(end)) if start <= end => Ok(Some((start.and_utc(), end.and_utc()))),
            (Some(_), Some(_)) => Err(AppError::validation("조회 시작일시는 종료일시보다 이후일 수 없습니다")),
            (None, None) => Ok(None),
            _ => Err(AppError::validation("조회 시작일시와 종료일시를 모두 입력해주세요")),
        }
    }
}

fn default_cancel_reason() -> String {
    "관리자 취소".to_string()
}

#[derive(Debug, Deserialize)]
pub struct CancelSettlementParams {
    #[serde(default = "default_cancel_reason")]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportParams {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ReportParams {
    pub fn period(&self) -> AppResult<SettlementPeriod> {
        SettlementPeriod::of(self.start_date, self.end_date)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementItemResponse {
    pub id: String,
    pub order_id: String,
    pub order_item_id: String,
    pub product_id: String,
    pub sale_amount: Decimal,
    pub commission_rate: Decimal,
    pub commission_amount: Decimal,
    pub vat_amount: Decimal,
    pub net_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<&SettlementItem> for SettlementItemResponse {
    fn from(item: &SettlementItem) -> Self {
        Self {
            id: item.id.to_string(),
            order_id: item.order_id.to_string(),
            order_item_id: item.order_item_id.to_string(),
            product_id: item.product_id.to_string(),
            sale_amount: item.sale_amount,
            commission_rate: item.commission_rate.rate(),
            commission_amount: item.amount.commission,
            vat_amount: item.amount.vat,
            net_amount: item.amount.net,
            created_at: item.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResponse {
    pub id: String,
    pub seller_id: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub period_description: String,
    pub settlement_date: DateTime<Utc>,
    pub total_sales: Decimal,
    pub commission_amount: Decimal,
    pub vat_amount: Decimal,
    pub net_amount: Decimal,
    pub commission_rate: Decimal,
    pub status: String,
    pub status_description: String,
    pub failed_reason: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub item_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<SettlementItemResponse>>,
}

impl SettlementResponse {
    /// 含明细
    pub fn detail(settlement: &Settlement) -> Self {
        let mut response = Self::summary(settlement);
        response.items = Some(settlement.items.iter().map(Into::into).collect());
        response
    }

    /// 列表用，不含明细
    pub fn summary(settlement: &Settlement) -> Self {
        Self {
            id: settlement.id.to_string(),
            seller_id: settlement.seller_id.to_string(),
            period_start: settlement.period.start,
            period_end: settlement.period.end,
            period_description: settlement.period.description(),
            settlement_date: settlement.settlement_date,
            total_sales: settlement.amount.total_sales,
            commission_amount: settlement.amount.commission,
            vat_amount: settlement.amount.vat,
            net_amount: settlement.amount.net,
            commission_rate: settlement.amount.commission_rate(),
            status: settlement.status.to_string(),
            status_description: settlement.status.description().to_string(),
            failed_reason: settlement.failed_reason.clone(),
            completed_at: settlement.completed_at,
            created_at: settlement.created_at,
            item_count: settlement.item_count(),
            items: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_requires_both_ends() {
        let params: SettlementRangeParams = serde_json::from_value(serde_json::json!({
            "startDateTime": "2024-01-01T00:00:00"
        }))
        .unwrap();
        assert!(matches!(params.range(), Err(AppError::Validation(_))));

        let params: SettlementRangeParams = serde_json::from_value(serde_json::json!({
            "startDateTime": "2024-01-01T00:00:00",
            "endDateTime": "2024-01-31T23:59:59"
        }))
        .unwrap();
        let (from, to) = params.range().unwrap().unwrap();
        assert!(from < to);

        assert!(SettlementRangeParams::default().range().unwrap().is_none());
    }

    #[test]
    fn test_cancel_reason_default() {
        let params: CancelSettlementParams = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(params.reason, "관리자 취소");
    }

    #[test]
    fn test_summary_omits_items() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let settlement = Settlement::create(
            commercium_common::SellerId::parse("seller-1").unwrap(),
            SettlementPeriod::daily(date),
        )
        .unwrap();

        let summary = serde_json::to_value(SettlementResponse::summary(&settlement)).unwrap();
        assert!(summary.get("items").is_none());
        assert_eq!(summary["statusDescription"], "정산대기");

        let detail = serde_json::to_value(SettlementResponse::detail(&settlement)).unwrap();
        assert_eq!(detail["items"], serde_json::json!([]));
    }
}

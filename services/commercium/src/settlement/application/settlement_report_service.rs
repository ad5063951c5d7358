//! 结算 Excel 报表
//!
//! 日报与周报共用同一表格布局；卖家报表额外带汇总行

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use commercium_common::SellerId;
use commercium_domain_core::Decimal;
use commercium_errors::{AppError, AppResult};
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, Worksheet, XlsxError};
use tracing::info;

use crate::settlement::domain::{Settlement, SettlementAmount};

const DAILY_SHEET: &str = "일일 정산 리포트";
const WEEKLY_SHEET: &str = "주간 정산 리포트";
const SELLER_SHEET: &str = "판매자 정산 리포트";

const SUMMARY_HEADERS: [&str; 9] = [
    "정산ID", "판매자ID", "기간", "총매출", "수수료", "VAT", "정산금액", "상태", "생성일시",
];
const SELLER_HEADERS: [&str; 8] = [
    "정산ID", "기간", "총매출", "수수료", "VAT", "정산금액", "상태", "완료일시",
];

const CURRENCY_FORMAT: &str = "#,##0";
const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn daily_report_file_name(date: NaiveDate) -> String {
    format!("daily_settlement_{}.xlsx", date)
}

pub fn weekly_report_file_name(start: NaiveDate, end: NaiveDate) -> String {
    format!("weekly_settlement_{}_{}.xlsx", start, end)
}

pub fn seller_report_file_name(seller_id: &SellerId, start: NaiveDate, end: NaiveDate) -> String {
    format!("settlement_report_{}_{}_{}.xlsx", seller_id, start, end)
}

pub fn my_report_file_name(start: NaiveDate, end: NaiveDate) -> String {
    format!("my_settlement_report_{}_{}.xlsx", start, end)
}

struct Formats {
    title: Format,
    header: Format,
    currency: Format,
}

impl Formats {
    fn new() -> Self {
        Self {
            title: Format::new().set_bold().set_font_size(14),
            header: Format::new()
                .set_bold()
                .set_background_color(Color::RGB(0xD9D9D9))
                .set_align(FormatAlign::Center),
            currency: Format::new().set_num_format(CURRENCY_FORMAT),
        }
    }
}

pub struct SettlementReportService {
    report_dir: PathBuf,
}

impl SettlementReportService {
    pub fn new(report_dir: impl Into<PathBuf>) -> Self {
        Self {
            report_dir: report_dir.into(),
        }
    }

    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    pub fn generate_daily_report(&self, date: NaiveDate, settlements: &[Settlement]) -> AppResult<Vec<u8>> {
        let title = format!("{} - {}", DAILY_SHEET, date.format("%Y년 %m월 %d일"));
        let bytes = summary_workbook(DAILY_SHEET, &title, settlements).map_err(xlsx_error)?;
        info!(date = %date, settlement_count = settlements.len(), "Daily settlement report generated");
        Ok(bytes)
    }

    pub fn generate_weekly_report(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        settlements: &[Settlement],
    ) -> AppResult<Vec<u8>> {
        let title = format!("{} - {} ~ {}", WEEKLY_SHEET, start, end);
        let bytes = summary_workbook(WEEKLY_SHEET, &title, settlements).map_err(xlsx_error)?;
        info!(start = %start, end = %end, settlement_count = settlements.len(), "Weekly settlement report generated");
        Ok(bytes)
    }

    pub fn generate_seller_report(
        &self,
        seller_id: &SellerId,
        start: NaiveDate,
        end: NaiveDate,
        settlements: &[Settlement],
    ) -> AppResult<Vec<u8>> {
        let bytes = seller_workbook(seller_id, start, end, settlements).map_err(xlsx_error)?;
        info!(
            seller_id = %seller_id,
            start = %start,
            end = %end,
            settlement_count = settlements.len(),
            "Seller settlement report generated"
        );
        Ok(bytes)
    }

    /// 写入报表目录，目录不存在时创建
    pub async fn save_report(&self, file_name: &str, bytes: &[u8]) -> AppResult<PathBuf> {
        tokio::fs::create_dir_all(&self.report_dir)
            .await
            .map_err(|e| AppError::internal(format!("리포트 디렉터리를 만들 수 없습니다: {}", e)))?;

        let path = self.report_dir.join(file_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::internal(format!("리포트 파일을 저장할 수 없습니다: {}", e)))?;

        info!(path = %path.display(), size_bytes = bytes.len(), "Settlement report saved");
        Ok(path)
    }
}

fn xlsx_error(e: XlsxError) -> AppError {
    AppError::internal(format!("엑셀 파일 생성에 실패했습니다: {}", e))
}

fn money(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

fn date_time(value: DateTime<Utc>) -> String {
    value.format(DATE_TIME_FORMAT).to_string()
}

fn write_headers(sheet: &mut Worksheet, row: u32, headers: &[&str], format: &Format) -> Result<(), XlsxError> {
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(row, col as u16, *header, format)?;
    }
    Ok(())
}

fn write_amounts(
    sheet: &mut Worksheet,
    row: u32,
    first_col: u16,
    amount: &SettlementAmount,
    format: &Format,
) -> Result<(), XlsxError> {
    let values = [amount.total_sales, amount.commission, amount.vat, amount.net];
    for (offset, value) in values.into_iter().enumerate() {
        sheet.write_number_with_format(row, first_col + offset as u16, money(value), format)?;
    }
    Ok(())
}

/// 标题、空行、表头、数据
fn summary_workbook(sheet_name: &str, title: &str, settlements: &[Settlement]) -> Result<Vec<u8>, XlsxError> {
    let formats = Formats::new();
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name)?;

    sheet.write_string_with_format(0, 0, title, &formats.title)?;
    write_headers(sheet, 2, &SUMMARY_HEADERS, &formats.header)?;

    for (i, settlement) in settlements.iter().enumerate() {
        let row = 3 + i as u32;
        sheet.write_string(row, 0, settlement.id.to_string())?;
        sheet.write_string(row, 1, settlement.seller_id.as_str())?;
        sheet.write_string(row, 2, settlement.period.description())?;
        write_amounts(sheet, row, 3, &settlement.amount, &formats.currency)?;
        sheet.write_string(row, 7, settlement.status.description())?;
        sheet.write_string(row, 8, date_time(settlement.created_at))?;
    }

    sheet.autofit();
    workbook.save_to_buffer()
}

fn seller_workbook(
    seller_id: &SellerId,
    start: NaiveDate,
    end: NaiveDate,
    settlements: &[Settlement],
) -> Result<Vec<u8>, XlsxError> {
    let formats = Formats::new();
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SELLER_SHEET)?;

    let title = format!("{} - {} ({} ~ {})", SELLER_SHEET, seller_id, start, end);
    sheet.write_string_with_format(0, 0, &title, &formats.title)?;

    let total = settlements
        .iter()
        .fold(SettlementAmount::zero(), |acc, s| acc.add(&s.amount));
    sheet.write_string(2, 0, "총 정산 건수:")?;
    sheet.write_number(2, 1, settlements.len() as f64)?;
    sheet.write_string(3, 0, "총 매출액:")?;
    sheet.write_number_with_format(3, 1, money(total.total_sales), &formats.currency)?;
    sheet.write_string(4, 0, "총 정산액:")?;
    sheet.write_number_with_format(4, 1, money(total.net), &formats.currency)?;

    write_headers(sheet, 6, &SELLER_HEADERS, &formats.header)?;
    for (i, settlement) in settlements.iter().enumerate() {
        let row = 7 + i as u32;
        sheet.write_string(row, 0, settlement.id.to_string())?;
        sheet.write_string(row, 1, settlement.period.description())?;
        write_amounts(sheet, row, 2, &settlement.amount, &formats.currency)?;
        sheet.write_string(row, 6, settlement.status.description())?;
        let completed = settlement
            .completed_at
            .map(date_time)
            .unwrap_or_else(|| "-".to_string());
        sheet.write_string(row, 7, completed)?;
    }

    sheet.autofit();
    workbook.save_to_buffer()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settlement::domain::{CommissionRate, SettlementItem, SettlementPeriod};
    use commercium_common::{OrderId, OrderItemId, ProductId};

    fn settlement(seller: &str, sales: i64) -> Settlement {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let mut settlement =
            Settlement::create(SellerId::parse(seller).unwrap(), SettlementPeriod::daily(date)).unwrap();
        settlement
            .add_item(
                SettlementItem::create(
                    OrderId::new(),
                    OrderItemId::new(),
                    ProductId::parse("P-1").unwrap(),
                    Decimal::from(sales),
                    CommissionRate::default(),
                )
                .unwrap(),
            )
            .unwrap();
        settlement
    }

    fn is_xlsx(bytes: &[u8]) -> bool {
        bytes.starts_with(b"PK")
    }

    #[test]
    fn test_file_names() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        assert_eq!(daily_report_file_name(start), "daily_settlement_2024-01-01.xlsx");
        assert_eq!(
            weekly_report_file_name(start, end),
            "weekly_settlement_2024-01-01_2024-01-07.xlsx"
        );
        assert_eq!(
            seller_report_file_name(&SellerId::parse("seller-1").unwrap(), start, end),
            "settlement_report_seller-1_2024-01-01_2024-01-07.xlsx"
        );
        assert_eq!(my_report_file_name(start, end), "my_settlement_report_2024-01-01_2024-01-07.xlsx");
    }

    #[test]
    fn test_reports_are_valid_workbooks() {
        let service = SettlementReportService::new("reports");
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let settlements = vec![settlement("seller-1", 10_000), settlement("seller-2", 25_000)];

        assert!(is_xlsx(&service.generate_daily_report(date, &settlements).unwrap()));
        assert!(is_xlsx(&service.generate_weekly_report(date, date, &settlements).unwrap()));

        let mut completed = settlement("seller-1", 10_000);
        completed.complete().unwrap();
        let seller = SellerId::parse("seller-1").unwrap();
        let bytes = service
            .generate_seller_report(&seller, date, date, &[completed, settlement("seller-1", 5_000)])
            .unwrap();
        assert!(is_xlsx(&bytes));
    }

    #[test]
    fn test_empty_report_still_has_headers() {
        let service = SettlementReportService::new("reports");
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert!(is_xlsx(&service.generate_daily_report(date, &[]).unwrap()));
    }

    #[tokio::test]
    async fn test_save_report_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let service = SettlementReportService::new(dir.path().join("nested"));

        let path = service.save_report("daily_settlement_2024-01-15.xlsx", b"PK-data").await.unwrap();
        assert!(path.starts_with(service.report_dir()));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"PK-data");
    }
}

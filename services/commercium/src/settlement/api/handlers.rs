//! 结算 HTTP handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use commercium_auth_core::Role;
use commercium_common::{ApiResponse, SellerId, SettlementId};
use commercium_errors::{AppError, AppResult};
use tracing::info;

use super::dto::{
    CancelSettlementParams, CreateSettlementParams, ReportParams, SettlementRangeParams,
    SettlementResponse,
};
use crate::settlement::application::{my_report_file_name, seller_report_file_name};
use crate::settlement::domain::{Settlement, SettlementStatus};
use crate::shared::{AppState, auth::AuthUser};

const SETTLEMENT_VIEWERS: &[Role] = &[Role::Admin, Role::Seller];

fn parse_settlement_id(raw: &str) -> AppResult<SettlementId> {
    SettlementId::from_string(raw).map_err(|_| AppError::validation("잘못된 정산 ID 형식입니다"))
}

fn parse_seller_id(raw: String) -> AppResult<SellerId> {
    SellerId::parse(raw).map_err(AppError::validation)
}

/// ADMIN 可访问任意卖家，SELLER 只能访问自己
fn ensure_seller_access(user: &AuthUser, seller_id: &SellerId) -> AppResult<()> {
    if user.has_role(Role::Admin) {
        return Ok(());
    }
    if user.has_role(Role::Seller) && &user.seller_id()? == seller_id {
        return Ok(());
    }
    Err(AppError::forbidden("다른 판매자의 정산 정보에 접근할 수 없습니다"))
}

fn list_response(settlements: &[Settlement]) -> ApiResponse<Vec<SettlementResponse>> {
    let body: Vec<SettlementResponse> = settlements.iter().map(SettlementResponse::summary).collect();
    let message = format!("총 {}건의 정산 정보를 조회했습니다", body.len());
    ApiResponse::success_with(body, message)
}

fn attachment(file_name: String, bytes: Vec<u8>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
}

pub async fn create_settlement(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<CreateSettlementParams>,
) -> AppResult<(StatusCode, Json<ApiResponse<SettlementResponse>>)> {
    user.require_any_role(&[Role::Admin])?;
    info!(
        user_id = %user.0.sub,
        seller_id = %params.seller_id,
        start = %params.start_date,
        end = %params.end_date,
        "Manual settlement requested"
    );

    let settlement = state
        .settlements
        .create_settlement(parse_seller_id(params.seller_id)?, params.start_date, params.end_date)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with(
            SettlementResponse::detail(&settlement),
            "정산이 성공적으로 생성되었습니다",
        )),
    ))
}

pub async fn get_settlement(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<SettlementResponse>>> {
    user.require_any_role(SETTLEMENT_VIEWERS)?;
    let settlement = state
        .settlements
        .get_settlement(&parse_settlement_id(&id)?)
        .await?;
    ensure_seller_access(&user, &settlement.seller_id)?;

    Ok(Json(ApiResponse::success_with(
        SettlementResponse::detail(&settlement),
        "정산 정보를 성공적으로 조회했습니다",
    )))
}

pub async fn get_seller_settlements(
    State(state): State<AppState>,
    user: AuthUser,
    Path(seller_id): Path<String>,
    Query(params): Query<SettlementRangeParams>,
) -> AppResult<Json<ApiResponse<Vec<SettlementResponse>>>> {
    let seller_id = parse_seller_id(seller_id)?;
    ensure_seller_access(&user, &seller_id)?;

    let settlements = state
        .settlements
        .get_seller_settlements(&seller_id, params.range()?)
        .await?;
    Ok(Json(list_response(&settlements)))
}

pub async fn get_my_settlements(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<SettlementResponse>>>> {
    user.require_any_role(&[Role::Seller])?;
    let settlements = state
        .settlements
        .get_seller_settlements(&user.seller_id()?, None)
        .await?;
    Ok(Json(list_response(&settlements)))
}

pub async fn get_settlements_by_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(status): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<SettlementResponse>>>> {
    user.require_any_role(&[Role::Admin])?;
    let status: SettlementStatus = status.to_uppercase().parse()?;
    let settlements = state.settlements.get_settlements_by_status(status).await?;
    Ok(Json(list_response(&settlements)))
}

pub async fn complete_settlement(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<SettlementResponse>>> {
    user.require_any_role(&[Role::Admin])?;
    let settlement = state
        .settlements
        .complete_settlement(&parse_settlement_id(&id)?)
        .await?;
    Ok(Json(ApiResponse::success_with(
        SettlementResponse::detail(&settlement),
        "정산이 완료되었습니다",
    )))
}

pub async fn cancel_settlement(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Query(params): Query<CancelSettlementParams>,
) -> AppResult<Json<ApiResponse<SettlementResponse>>> {
    user.require_any_role(&[Role::Admin])?;
    let settlement = state
        .settlements
        .cancel_settlement(&parse_settlement_id(&id)?, &params.reason)
        .await?;
    Ok(Json(ApiResponse::success_with(
        SettlementResponse::detail(&settlement),
        "정산이 취소되었습니다",
    )))
}

pub async fn download_seller_report(
    State(state): State<AppState>,
    user: AuthUser,
    Path(seller_id): Path<String>,
    Query(params): Query<ReportParams>,
) -> AppResult<impl IntoResponse> {
    let seller_id = parse_seller_id(seller_id)?;
    ensure_seller_access(&user, &seller_id)?;

    let bytes = seller_report(&state, &seller_id, &params).await?;
    Ok(attachment(
        seller_report_file_name(&seller_id, params.start_date, params.end_date),
        bytes,
    ))
}

pub async fn download_my_report(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ReportParams>,
) -> AppResult<impl IntoResponse> {
    user.require_any_role(&[Role::Seller])?;
    let bytes = seller_report(&state, &user.seller_id()?, &params).await?;
    Ok(attachment(my_report_file_name(params.start_date, params.end_date), bytes))
}

async fn seller_report(state: &AppState, seller_id: &SellerId, params: &ReportParams) -> AppResult<Vec<u8>> {
    let period = params.period()?;
    let settlements = state
        .settlements
        .get_seller_settlements(seller_id, Some(period.time_range()))
        .await?;
    state
        .reports
        .generate_seller_report(seller_id, period.start, period.end, &settlements)
}

//! 支付 HTTP handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use commercium_common::{ApiResponse, PaymentId};
use commercium_errors::{AppError, AppResult};
use tracing::info;
use validator::Validate;

use super::dto::{
    CancelPaymentParams, CompleteCallbackParams, CreatePaymentRequest, FailCallbackParams,
    PaymentResponse,
};
use crate::order::api::parse_order_id;
use crate::shared::{AppState, auth::AuthUser};

fn parse_payment_id(raw: &str) -> AppResult<PaymentId> {
    PaymentId::from_string(raw).map_err(|_| AppError::validation("잘못된 결제 ID 형식입니다"))
}

pub async fn create_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreatePaymentRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<PaymentResponse>>)> {
    request.validate()?;
    info!(user_id = %user.0.sub, order_id = %request.order_id, amount = %request.amount, "Payment requested");

    let payment = state.payments.create_payment(request.into_command()?).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with(
            PaymentResponse::from(&payment),
            "결제 요청이 완료되었습니다",
        )),
    ))
}

pub async fn get_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> AppResult<Json<ApiResponse<PaymentResponse>>> {
    let payment = state.payments.get_payment(&parse_payment_id(&payment_id)?).await?;
    Ok(Json(ApiResponse::success_with(
        PaymentResponse::from(&payment),
        "결제 정보를 조회했습니다",
    )))
}

pub async fn get_payment_by_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> AppResult<Json<ApiResponse<PaymentResponse>>> {
    let payment = state
        .payments
        .get_payment_by_order(&parse_order_id(&order_id)?)
        .await?;
    Ok(Json(ApiResponse::success_with(
        PaymentResponse::from(&payment),
        "결제 정보를 조회했습니다",
    )))
}

pub async fn cancel_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
    Query(params): Query<CancelPaymentParams>,
) -> AppResult<Json<ApiResponse<PaymentResponse>>> {
    let amount = params.validated_amount()?;
    let payment = state
        .payments
        .cancel_payment(&parse_payment_id(&payment_id)?, amount, &params.reason)
        .await?;
    Ok(Json(ApiResponse::success_with(
        PaymentResponse::from(&payment),
        "결제 취소가 완료되었습니다",
    )))
}

pub async fn complete_callback(
    State(state): State<AppState>,
    Query(params): Query<CompleteCallbackParams>,
) -> AppResult<Json<ApiResponse<()>>> {
    info!(payment_key = %params.payment_key, amount = %params.amount, "Payment complete callback");
    state
        .payments
        .complete_payment(&params.payment_key, params.amount)
        .await?;
    Ok(Json(ApiResponse::success_with((), "결제 완료 처리되었습니다")))
}

pub async fn fail_callback(
    State(state): State<AppState>,
    Query(params): Query<FailCallbackParams>,
) -> AppResult<Json<ApiResponse<()>>> {
    let reason = params.formatted_error();
    info!(payment_key = %params.payment_key, reason = %reason, "Payment fail callback");
    state.payments.fail_payment(&params.payment_key, &reason).await?;
    Ok(Json(ApiResponse::success_with((), "결제 실패 처리되었습니다")))
}
